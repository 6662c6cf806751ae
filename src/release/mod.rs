// src/release/mod.rs

//! Release descriptor generation
//!
//! The release descriptor (`dists/stable/Release`) enumerates every index
//! file of the distribution by checksum and size. The header comes from the
//! `Release` template; the per-algorithm checksum sections are synthesized
//! here because they enumerate files and architectures, which is builder
//! logic rather than template logic. Missing `Suite:`/`Codename:` fields are
//! defaulted to `stable`, defaults first, then the body, and the defaulting
//! pass is idempotent.

use crate::checksum::{ChecksumKind, FileDigests, digest_file};
use crate::error::{Error, Result};
use crate::exec::ToolRunner;
use crate::index::IndexFile;
use crate::template::{Bindings, render_template};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default value for absent `Suite:` and `Codename:` fields
pub const DEFAULT_SUITE: &str = "stable";

/// Builds and writes the release descriptor
pub struct ReleaseDescriptorBuilder<'a, R: ToolRunner> {
    runner: &'a R,
    output_root: &'a Path,
    templates: &'a Path,
    architectures: &'a [String],
    origin: &'a str,
    release_tool: Option<&'a str>,
}

impl<'a, R: ToolRunner> ReleaseDescriptorBuilder<'a, R> {
    pub fn new(
        runner: &'a R,
        output_root: &'a Path,
        templates: &'a Path,
        architectures: &'a [String],
        origin: &'a str,
        release_tool: Option<&'a str>,
    ) -> Self {
        Self {
            runner,
            output_root,
            templates,
            architectures,
            origin,
            release_tool,
        }
    }

    /// Generate `dists/stable/Release` covering the given index files.
    ///
    /// The descriptor must be in its final byte-for-byte form when this
    /// returns: signing happens over the written file, and any later change
    /// to it would invalidate the signatures.
    pub fn build(&self, index_files: &[IndexFile]) -> Result<PathBuf> {
        let mut entries = Vec::with_capacity(index_files.len());
        for file in index_files {
            let digests = digest_file(&file.path)?;
            entries.push((file.dists_relative.clone(), digests));
        }

        let body = match self.release_tool {
            Some(tool) => self.assemble_with_tool(tool)?,
            None => {
                let header = self.render_header(&entries)?;
                format!("{header}{}", checksum_sections(&entries))
            }
        };

        let finalized = ensure_defaults(&body);

        let descriptor = self.output_root.join("dists/stable/Release");
        fs::write(&descriptor, &finalized)
            .map_err(|e| Error::io(format!("writing '{}'", descriptor.display()), e))?;

        info!(
            "Wrote release descriptor covering {} index file(s)",
            entries.len()
        );
        Ok(descriptor)
    }

    /// Render the descriptor header from the template
    fn render_header(&self, entries: &[(String, FileDigests)]) -> Result<String> {
        let mut bindings = Bindings::new();
        bindings.set_scalar("origin", self.origin);
        bindings.set_scalar("package.name", self.origin);
        bindings.set_scalar("architectures", self.architectures.join(" "));
        bindings.set_scalar(
            "date",
            Utc::now().format("%a, %d %b %Y %H:%M:%S UTC").to_string(),
        );
        // Covered files are reachable by basename so a site-specific
        // template can reference their checksums and sizes directly.
        for (relative, digests) in entries {
            let basename = relative.rsplit('/').next().unwrap_or(relative);
            bindings.set_file(basename.to_string(), digests.clone());
        }

        let template = self.templates.join("Release");
        let (header, report) = render_template(&template, &bindings)?;
        if !report.failures.is_empty() {
            warn!(
                "Release header rendered with {} skipped line(s)",
                report.failures.len()
            );
        }
        Ok(header)
    }

    /// Use the external release assembly tool's output as the body
    fn assemble_with_tool(&self, tool: &str) -> Result<String> {
        let dists = self.output_root.join("dists/stable");
        let dists_arg = dists.to_string_lossy();
        let output = self.runner.run(tool, &["release", dists_arg.as_ref()])?;

        if !output.success() {
            return Err(Error::ToolFailed {
                tool: tool.to_string(),
                code: output.code,
                stderr: output.stderr,
            });
        }
        if output.stdout.trim().is_empty() {
            // An empty descriptor would claim a repository with no indexes;
            // this is never "no packages", it is a failed scan.
            return Err(Error::ScanEmpty {
                tool: tool.to_string(),
            });
        }

        Ok(output.stdout)
    }
}

/// Synthesize the `MD5Sum:`/`SHA1:`/`SHA256:`/`SHA512:` sections listing
/// every covered index file
pub fn checksum_sections(entries: &[(String, FileDigests)]) -> String {
    let mut out = String::new();
    for kind in ChecksumKind::ALL {
        out.push_str(kind.field_name());
        out.push_str(":\n");
        for (relative, digests) in entries {
            if let Some(digest) = digests.checksums.get(&kind) {
                out.push_str(&format!(" {digest} {:>16} {relative}\n", digests.size));
            }
        }
    }
    out
}

/// Prepend `Suite:`/`Codename:` defaults when the body lacks them
///
/// Appended defaults come first, then the body, so the output order is
/// deterministic. Running this on an already-defaulted descriptor changes
/// nothing.
pub fn ensure_defaults(body: &str) -> String {
    let has_suite = body.lines().any(|line| line.starts_with("Suite:"));
    let has_codename = body.lines().any(|line| line.starts_with("Codename:"));

    let mut out = String::new();
    if !has_suite {
        out.push_str(&format!("Suite: {DEFAULT_SUITE}\n"));
    }
    if !has_codename {
        out.push_str(&format!("Codename: {DEFAULT_SUITE}\n"));
    }
    out.push_str(body);
    out
}
