//! Checksum command: compute the digest of a file.

use anyhow::{bail, Result};
use datamirror_core::checksum::{self, Checksum, ChecksumAlgorithm};
use std::path::Path;

/// Print the digest of `path` in `sha256sum` style. With `expect`, the
/// expected algorithm wins and a mismatch is an error.
pub fn run_checksum(path: &Path, algorithm: ChecksumAlgorithm, expect: Option<&Checksum>) -> Result<()> {
    let algorithm = expect.map(Checksum::algorithm).unwrap_or(algorithm);
    let digest = checksum::digest_path(path, algorithm)?;
    println!("{}  {}", digest, path.display());
    if let Some(expected) = expect {
        if !expected.matches_hex(&digest) {
            bail!("checksum mismatch for {}: expected {}, got {}:{}", path.display(), expected, algorithm, digest);
        }
        println!("OK");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn expect_mismatch_is_an_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello\n").unwrap();
        f.flush().unwrap();
        let good: Checksum = "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
            .parse()
            .unwrap();
        run_checksum(f.path(), ChecksumAlgorithm::Sha256, Some(&good)).unwrap();

        let bad: Checksum = format!("sha256:{}", "0".repeat(64)).parse().unwrap();
        let err = run_checksum(f.path(), ChecksumAlgorithm::Sha256, Some(&bad)).unwrap_err();
        assert!(err.to_string().contains("checksum mismatch"));
    }
}
