//! Tests for `fetch` argument parsing.

use super::parse;
use crate::cli::{registry_for_fetch, Cli, CliCommand};
use datamirror_core::config::DatamirrorConfig;
use clap::Parser;
use std::path::PathBuf;

#[test]
fn cli_parse_fetch_defaults() {
    match parse(&["datamirror", "fetch", "nerf_synthetic"]) {
        CliCommand::Fetch {
            dataset,
            download_dir,
            cache_dir,
            no_cache,
        } => {
            assert_eq!(dataset, "nerf_synthetic");
            assert!(download_dir.is_none());
            assert!(cache_dir.is_none());
            assert!(!no_cache);
        }
        _ => panic!("expected Fetch"),
    }
}

#[test]
fn cli_parse_fetch_with_dirs() {
    match parse(&[
        "datamirror",
        "fetch",
        "nerf_llff",
        "--download-dir",
        "/srv/data",
        "--cache-dir",
        "/var/cache/datamirror",
    ]) {
        CliCommand::Fetch {
            dataset,
            download_dir,
            cache_dir,
            ..
        } => {
            assert_eq!(dataset, "nerf_llff");
            assert_eq!(download_dir, Some(PathBuf::from("/srv/data")));
            assert_eq!(cache_dir, Some(PathBuf::from("/var/cache/datamirror")));
        }
        _ => panic!("expected Fetch with dirs"),
    }
}

#[test]
fn cli_fetch_requires_dataset() {
    assert!(Cli::try_parse_from(["datamirror", "fetch"]).is_err());
}

#[test]
fn cli_no_cache_conflicts_with_cache_dir() {
    assert!(Cli::try_parse_from(["datamirror", "fetch", "x", "--no-cache", "--cache-dir", "/c"]).is_err());
    match parse(&["datamirror", "fetch", "x", "--no-cache"]) {
        CliCommand::Fetch { no_cache, .. } => assert!(no_cache),
        _ => panic!("expected Fetch --no-cache"),
    }
}

#[test]
fn unknown_dataset_rejected_with_available_names() {
    let cfg = DatamirrorConfig::default();
    let err = registry_for_fetch(&cfg, "not_a_real_dataset").unwrap_err();
    let msg = format!("{:#}", err);
    assert!(msg.contains("failed at stage 'start'"), "{msg}");
    assert!(msg.contains("unknown dataset 'not_a_real_dataset'"), "{msg}");
    assert!(msg.contains("nerf_llff"), "{msg}");

    let registry = registry_for_fetch(&cfg, "nerf_synthetic").unwrap();
    assert!(registry.get("nerf_synthetic").is_some());
}
