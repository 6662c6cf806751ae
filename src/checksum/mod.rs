// src/checksum/mod.rs

//! Multi-algorithm checksumming for repository metadata
//!
//! APT repository metadata references every file by size plus a set of
//! digests (MD5, SHA-1, SHA-256, SHA-512). This module computes those
//! digests by streaming files in fixed-size blocks; a file is never loaded
//! into memory as a whole.

use crate::error::{Error, Result};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Block size for streamed digest computation
const READ_BLOCK: usize = 8192;

/// Checksum algorithms used in APT repository metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChecksumKind {
    /// MD5 (128-bit), kept for legacy `MD5Sum` fields
    Md5,
    /// SHA-1 (160-bit)
    Sha1,
    /// SHA-256 (256-bit)
    Sha256,
    /// SHA-512 (512-bit)
    Sha512,
}

impl ChecksumKind {
    /// All algorithms a full digest set covers, in metadata order
    pub const ALL: [ChecksumKind; 4] = [
        ChecksumKind::Md5,
        ChecksumKind::Sha1,
        ChecksumKind::Sha256,
        ChecksumKind::Sha512,
    ];

    /// Digest output length in bytes
    #[inline]
    pub const fn output_len(&self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha512 => 64,
        }
    }

    /// Digest output length as a hex string
    #[inline]
    pub const fn hex_len(&self) -> usize {
        self.output_len() * 2
    }

    /// Section header used in the release descriptor (`MD5Sum:`, `SHA256:`, ...)
    #[inline]
    pub const fn field_name(&self) -> &'static str {
        match self {
            Self::Md5 => "MD5Sum",
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
            Self::Sha512 => "SHA512",
        }
    }

    /// Field name inside a package-listing stanza. Differs from the release
    /// section header only for MD5 (`MD5sum:` vs `MD5Sum:`).
    #[inline]
    pub const fn stanza_field(&self) -> &'static str {
        match self {
            Self::Md5 => "MD5sum",
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
            Self::Sha512 => "SHA512",
        }
    }
}

impl fmt::Display for ChecksumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.field_name())
    }
}

impl FromStr for ChecksumKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "md5" | "md5sum" => Ok(Self::Md5),
            "sha1" | "sha-1" => Ok(Self::Sha1),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "sha512" | "sha-512" => Ok(Self::Sha512),
            _ => Err(Error::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Mapping from algorithm to hex-encoded digest
pub type DigestSet = BTreeMap<ChecksumKind, String>;

/// Size and full digest set for one file
#[derive(Debug, Clone)]
pub struct FileDigests {
    /// File size in bytes
    pub size: u64,
    /// Hex digests keyed by algorithm
    pub checksums: DigestSet,
}

enum HasherState {
    Md5(Md5),
    Sha1(Sha1),
    Sha256(Sha256),
    Sha512(Sha512),
}

/// Incremental hasher dispatching over the supported algorithms
pub struct StreamingHasher {
    kind: ChecksumKind,
    state: HasherState,
}

impl StreamingHasher {
    /// Create a hasher for the given algorithm
    pub fn new(kind: ChecksumKind) -> Self {
        let state = match kind {
            ChecksumKind::Md5 => HasherState::Md5(Md5::new()),
            ChecksumKind::Sha1 => HasherState::Sha1(Sha1::new()),
            ChecksumKind::Sha256 => HasherState::Sha256(Sha256::new()),
            ChecksumKind::Sha512 => HasherState::Sha512(Sha512::new()),
        };
        Self { kind, state }
    }

    /// Feed more data into the hasher
    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            HasherState::Md5(h) => h.update(data),
            HasherState::Sha1(h) => h.update(data),
            HasherState::Sha256(h) => h.update(data),
            HasherState::Sha512(h) => h.update(data),
        }
    }

    /// Finalize and return the hex digest
    pub fn finalize(self) -> String {
        match self.state {
            HasherState::Md5(h) => format!("{:x}", h.finalize()),
            HasherState::Sha1(h) => format!("{:x}", h.finalize()),
            HasherState::Sha256(h) => format!("{:x}", h.finalize()),
            HasherState::Sha512(h) => format!("{:x}", h.finalize()),
        }
    }

    /// The algorithm this hasher computes
    #[inline]
    pub fn kind(&self) -> ChecksumKind {
        self.kind
    }
}

/// Compute the hex digest of a byte slice
pub fn checksum_bytes(kind: ChecksumKind, data: &[u8]) -> String {
    let mut hasher = StreamingHasher::new(kind);
    hasher.update(data);
    hasher.finalize()
}

/// Compute the hex digest of a file, streamed in fixed-size blocks
///
/// Failures are attributable to exactly one (file, algorithm) pair so a
/// caller can keep computing the remaining algorithms for remaining files.
pub fn checksum_file(path: &Path, kind: ChecksumKind) -> Result<String> {
    if !path.is_file() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let mut file = File::open(path).map_err(|e| Error::Checksum {
        path: path.to_path_buf(),
        algorithm: kind.field_name(),
        source: e,
    })?;

    let mut hasher = StreamingHasher::new(kind);
    let mut buffer = [0u8; READ_BLOCK];

    loop {
        let n = file.read(&mut buffer).map_err(|e| Error::Checksum {
            path: path.to_path_buf(),
            algorithm: kind.field_name(),
            source: e,
        })?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finalize())
}

/// Compute the size and full digest set for a file
pub fn digest_file(path: &Path) -> Result<FileDigests> {
    if !path.is_file() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let size = std::fs::metadata(path)
        .map_err(|e| Error::io(format!("reading size of '{}'", path.display()), e))?
        .len();

    let mut checksums = DigestSet::new();
    for kind in ChecksumKind::ALL {
        let digest = checksum_file(path, kind)?;
        checksums.insert(kind, digest);
    }

    debug!("Computed {} digests for {}", checksums.len(), path.display());
    Ok(FileDigests { size, checksums })
}
