// src/lib.rs

//! Aptpress
//!
//! Publishes a Debian package into a structurally valid, signed APT
//! repository tree.
//!
//! # Pipeline
//!
//! - Checksums: every published file is referenced by size plus MD5,
//!   SHA-1, SHA-256, and SHA-512 digests
//! - Index files: `Packages` listings rendered from templates or scanned
//!   from the pool, each with a `.gz` sibling
//! - Release descriptor: enumerates every index file by checksum and size,
//!   with `Suite`/`Codename` defaulting
//! - Signing: clearsigned `InRelease` plus detached `Release.gpg`
//! - Publishing: copy into the destination tree and reassign ownership
//!
//! External tools (package build, pool scan, signing) are reached through
//! the narrow [`exec::ToolRunner`] seam so the pipeline logic is testable
//! without spawning processes.

pub mod checksum;
pub mod cli;
pub mod compress;
mod error;
pub mod exec;
pub mod index;
pub mod publish;
pub mod release;
pub mod sign;
pub mod template;

pub use checksum::{ChecksumKind, DigestSet, FileDigests, StreamingHasher};
pub use error::{Error, Result};
pub use exec::{ScriptedRunner, SystemRunner, ToolOutput, ToolRunner};
pub use index::{ArtifactMeta, IndexFile, PackageIndexBuilder};
pub use publish::{PublishConfig, PublishCoordinator, Stage};
pub use release::ReleaseDescriptorBuilder;
pub use sign::{SignatureBundle, SigningService};
pub use template::{Bindings, RenderReport};
