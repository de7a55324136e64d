//! Tests for list, checksum, completions and man.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use datamirror_core::checksum::ChecksumAlgorithm;

#[test]
fn cli_parse_list() {
    match parse(&["datamirror", "list"]) {
        CliCommand::List => {}
        _ => panic!("expected List"),
    }
}

#[test]
fn cli_parse_checksum_default_algorithm() {
    match parse(&["datamirror", "checksum", "nerf_synthetic.zip"]) {
        CliCommand::Checksum {
            path,
            algorithm,
            expect,
        } => {
            assert_eq!(path.to_string_lossy(), "nerf_synthetic.zip");
            assert_eq!(algorithm, ChecksumAlgorithm::Sha256);
            assert!(expect.is_none());
        }
        _ => panic!("expected Checksum"),
    }
}

#[test]
fn cli_parse_checksum_sha512_and_expect() {
    let hex = "ab".repeat(32);
    match parse(&[
        "datamirror",
        "checksum",
        "a.zip",
        "--algorithm",
        "sha512",
        "--expect",
        &format!("sha256:{hex}"),
    ]) {
        CliCommand::Checksum {
            algorithm, expect, ..
        } => {
            assert_eq!(algorithm, ChecksumAlgorithm::Sha512);
            assert_eq!(expect.unwrap().hex(), hex);
        }
        _ => panic!("expected Checksum with options"),
    }
}

#[test]
fn cli_rejects_bad_checksum_values() {
    assert!(Cli::try_parse_from(["datamirror", "checksum", "a", "--algorithm", "md5"]).is_err());
    assert!(Cli::try_parse_from(["datamirror", "checksum", "a", "--expect", "sha256:xyz"]).is_err());
}

#[test]
fn cli_parse_completions() {
    match parse(&["datamirror", "completions", "bash"]) {
        CliCommand::Completions { shell } => assert_eq!(shell, Shell::Bash),
        _ => panic!("expected Completions"),
    }
}

#[test]
fn cli_parse_man() {
    assert!(matches!(parse(&["datamirror", "man"]), CliCommand::Man));
}

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}
