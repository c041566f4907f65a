//! Checksum verification for retrieved manifests.

use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use super::FetchError;

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl ChecksumAlgorithm {
    fn hex_len(&self) -> usize {
        match self {
            ChecksumAlgorithm::Md5 => 32,
            ChecksumAlgorithm::Sha1 => 40,
            ChecksumAlgorithm::Sha256 => 64,
            ChecksumAlgorithm::Sha512 => 128,
        }
    }

    /// Hex digest of `bytes`.
    pub fn digest(&self, bytes: &[u8]) -> String {
        match self {
            ChecksumAlgorithm::Md5 => format!("{:x}", md5::compute(bytes)),
            ChecksumAlgorithm::Sha1 => format!("{:x}", sha1::Sha1::digest(bytes)),
            ChecksumAlgorithm::Sha256 => format!("{:x}", Sha256::digest(bytes)),
            ChecksumAlgorithm::Sha512 => format!("{:x}", Sha512::digest(bytes)),
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChecksumAlgorithm::Md5 => "md5",
            ChecksumAlgorithm::Sha1 => "sha1",
            ChecksumAlgorithm::Sha256 => "sha256",
            ChecksumAlgorithm::Sha512 => "sha512",
        })
    }
}

/// Expected digest of a retrieved file, written `<algorithm>:<hex>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    algorithm: ChecksumAlgorithm,
    expected: String,
}

impl Checksum {
    /// Digest algorithm.
    pub fn algorithm(&self) -> ChecksumAlgorithm {
        self.algorithm
    }

    /// Expected lowercase hex digest.
    pub fn expected(&self) -> &str {
        &self.expected
    }

    /// Compare the digest of the file at `path` with the expected one.
    pub async fn verify(&self, path: &Path) -> Result<(), FetchError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| FetchError::io(path, e))?;

        let actual = self.algorithm.digest(&bytes);
        if actual != self.expected {
            return Err(FetchError::ChecksumMismatch {
                path: path.to_path_buf(),
                algorithm: self.algorithm,
                expected: self.expected.clone(),
                actual,
            });
        }

        Ok(())
    }
}

impl FromStr for Checksum {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FetchError::InvalidChecksum(s.to_string());
        let (algorithm, hex) = s.split_once(':').ok_or_else(invalid)?;

        let algorithm = match algorithm.to_lowercase().as_str() {
            "md5" => ChecksumAlgorithm::Md5,
            "sha1" => ChecksumAlgorithm::Sha1,
            "sha256" => ChecksumAlgorithm::Sha256,
            "sha512" => ChecksumAlgorithm::Sha512,
            _ => return Err(invalid()),
        };

        if hex.len() != algorithm.hex_len() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        Ok(Self {
            algorithm,
            expected: hex.to_lowercase(),
        })
    }
}
