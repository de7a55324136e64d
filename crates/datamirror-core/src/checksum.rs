//! Archive checksum verification.
//!
//! Digests are computed over the whole file in fixed-size chunks so memory use
//! stays bounded for multi-gigabyte archives.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

const BUF_SIZE: usize = 64 * 1024;

/// Digest algorithms a dataset checksum may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    #[default]
    Sha256,
    Sha512,
}

impl ChecksumAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::Sha256 => "sha256",
            ChecksumAlgorithm::Sha512 => "sha512",
        }
    }

    /// Length of a hex-encoded digest for this algorithm.
    pub fn hex_len(&self) -> usize {
        match self {
            ChecksumAlgorithm::Sha256 => 64,
            ChecksumAlgorithm::Sha512 => 128,
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = ChecksumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" => Ok(ChecksumAlgorithm::Sha256),
            "sha512" => Ok(ChecksumAlgorithm::Sha512),
            other => Err(ChecksumParseError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Error parsing a `<algorithm>:<hex>` checksum string.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChecksumParseError {
    #[error("unknown checksum algorithm '{0}'")]
    UnknownAlgorithm(String),
    #[error("{algorithm} digest must be {expected} hex characters, got '{digest}'")]
    BadDigest {
        algorithm: ChecksumAlgorithm,
        expected: usize,
        digest: String,
    },
}

/// Expected digest of an archive: algorithm plus lowercase hex.
///
/// Parses from `sha256:<hex>`, `sha512:<hex>` or a bare 64-character hex string
/// (treated as SHA-256). Displays as `<algorithm>:<hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Checksum {
    algorithm: ChecksumAlgorithm,
    hex: String,
}

impl Checksum {
    pub fn new(algorithm: ChecksumAlgorithm, hex: &str) -> Result<Self, ChecksumParseError> {
        let hex = hex.trim().to_ascii_lowercase();
        if hex.len() != algorithm.hex_len() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ChecksumParseError::BadDigest {
                algorithm,
                expected: algorithm.hex_len(),
                digest: hex,
            });
        }
        Ok(Self { algorithm, hex })
    }

    /// For digests compiled into the binary; skips validation.
    pub(crate) fn from_trusted(algorithm: ChecksumAlgorithm, hex: &str) -> Self {
        Self {
            algorithm,
            hex: hex.to_ascii_lowercase(),
        }
    }

    pub fn sha256(hex: &str) -> Result<Self, ChecksumParseError> {
        Self::new(ChecksumAlgorithm::Sha256, hex)
    }

    pub fn algorithm(&self) -> ChecksumAlgorithm {
        self.algorithm
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// Case-insensitive comparison against a hex digest of the same algorithm.
    pub fn matches_hex(&self, digest: &str) -> bool {
        self.hex.eq_ignore_ascii_case(digest.trim())
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

impl FromStr for Checksum {
    type Err = ChecksumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once(':') {
            Some((algo, hex)) => Checksum::new(algo.parse()?, hex),
            None => Checksum::sha256(s),
        }
    }
}

impl TryFrom<String> for Checksum {
    type Error = ChecksumParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Checksum> for String {
    fn from(value: Checksum) -> Self {
        value.to_string()
    }
}

fn hash_reader<D: Digest, R: Read>(mut reader: R, path: &Path) -> Result<String> {
    let mut hasher = D::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = reader
            .read(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Compute the digest of a file and return it as lowercase hex.
pub fn digest_path(path: &Path, algorithm: ChecksumAlgorithm) -> Result<String> {
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    match algorithm {
        ChecksumAlgorithm::Sha256 => hash_reader::<Sha256, _>(f, path),
        ChecksumAlgorithm::Sha512 => hash_reader::<Sha512, _>(f, path),
    }
}

/// Compute SHA-256 of a file and return the digest as lowercase hex.
pub fn sha256_path(path: &Path) -> Result<String> {
    digest_path(path, ChecksumAlgorithm::Sha256)
}

/// Result of checking a file against an expected digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Match,
    Mismatch { actual: String },
    /// The file is missing or could not be read.
    Unreadable { reason: String },
}

/// Hash the file at `path` and compare with `expected`, reporting what was found.
pub fn check(path: &Path, expected: &Checksum) -> Verdict {
    match digest_path(path, expected.algorithm()) {
        Ok(actual) if expected.matches_hex(&actual) => Verdict::Match,
        Ok(actual) => {
            tracing::debug!(path = %path.display(), %expected, actual, "checksum mismatch");
            Verdict::Mismatch { actual }
        }
        Err(e) => {
            tracing::debug!(path = %path.display(), "checksum not computed: {:#}", e);
            Verdict::Unreadable {
                reason: format!("{:#}", e),
            }
        }
    }
}

/// Returns true when the file at `path` hashes to `expected`.
///
/// A missing or unreadable file is `false`, same as a mismatch: callers decide
/// whether that means "not downloaded yet" or "corrupt".
pub fn verify(path: &Path, expected: &Checksum) -> bool {
    check(path, expected) == Verdict::Match
}
