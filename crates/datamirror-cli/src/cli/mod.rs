//! CLI for the datamirror dataset fetcher.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use datamirror_core::checksum::{Checksum, ChecksumAlgorithm};
use datamirror_core::{config, logging, pipeline};
use datamirror_core::DatasetRegistry;
use std::path::PathBuf;

use commands::{run_checksum, run_completions, run_fetch, run_list, run_man, FetchArgs};

/// Top-level CLI for datamirror.
#[derive(Debug, Parser)]
#[command(name = "datamirror", version)]
#[command(about = "datamirror: fetch, verify and unpack benchmark datasets", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download, verify and extract a dataset into the download directory.
    Fetch {
        /// Registered dataset name (see `datamirror list`).
        dataset: String,

        /// Directory the dataset folder is placed in (default: config `download_dir`).
        #[arg(long, value_name = "DIR")]
        download_dir: Option<PathBuf>,

        /// Extraction cache shared between download directories (default: config `cache_dir`).
        #[arg(long, value_name = "DIR")]
        cache_dir: Option<PathBuf>,

        /// Ignore any configured cache and extract straight into the download directory.
        #[arg(long, conflicts_with = "cache_dir")]
        no_cache: bool,
    },

    /// List registered datasets.
    List,

    /// Compute the digest of a file, optionally checking it against an expected value.
    Checksum {
        /// Path to the file.
        path: PathBuf,

        #[arg(long, default_value = "sha256", value_name = "ALGO")]
        algorithm: ChecksumAlgorithm,

        /// Expected digest (`sha256:<hex>` or bare hex); exits non-zero on mismatch.
        #[arg(long, value_name = "CHECKSUM")]
        expect: Option<Checksum>,
    },

    /// Print a shell completion script.
    Completions {
        shell: Shell,
    },

    /// Print the man page in roff format.
    Man,
}

fn load_registry(cfg: &config::DatamirrorConfig) -> Result<DatasetRegistry> {
    Ok(DatasetRegistry::builtin().with_specs(cfg.datasets.iter().cloned())?)
}

/// Registry for a fetch of `dataset`, or the unknown-dataset error.
fn registry_for_fetch(cfg: &config::DatamirrorConfig, dataset: &str) -> Result<DatasetRegistry> {
    let registry = load_registry(cfg)?;
    pipeline::lookup(&registry, dataset)?;
    Ok(registry)
}

/// File logging under the XDG state dir; a read-only state dir should not stop a fetch.
fn init_logging() {
    if let Err(e) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("file logging unavailable, using stderr: {:#}", e);
    }
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Fetch {
                dataset,
                download_dir,
                cache_dir,
                no_cache,
            } => {
                // Unknown names are rejected before the config file or log is created.
                let cfg = config::load()?;
                let registry = registry_for_fetch(&cfg, &dataset)?;

                init_logging();
                tracing::debug!("loaded config: {:?}", cfg);
                let args = FetchArgs {
                    dataset,
                    download_dir,
                    cache_dir,
                    no_cache,
                };
                run_fetch(&cfg, registry, &args)?;
            }
            CliCommand::List => {
                init_logging();
                let cfg = config::load_or_init()?;
                run_list(&load_registry(&cfg)?);
            }
            CliCommand::Checksum {
                path,
                algorithm,
                expect,
            } => {
                init_logging();
                run_checksum(&path, algorithm, expect.as_ref())?
            }
            CliCommand::Completions { shell } => run_completions(shell),
            CliCommand::Man => run_man()?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
