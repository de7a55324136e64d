mod cli;

use crate::cli::CliCommand;

fn main() {
    if let Err(err) = CliCommand::run_from_args() {
        eprintln!("datamirror error: {:#}", err);
        std::process::exit(1);
    }
}
