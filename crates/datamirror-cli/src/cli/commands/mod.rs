//! CLI command handlers, one file per command.

mod checksum;
mod completions;
mod fetch;
mod list;

pub use checksum::run_checksum;
pub use completions::{run_completions, run_man};
pub use fetch::{run_fetch, FetchArgs};
pub use list::run_list;
