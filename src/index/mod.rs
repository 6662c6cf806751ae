// src/index/mod.rs

//! Package listing generation
//!
//! Produces `dists/stable/main/binary-<arch>/Packages` plus its `.gz`
//! sibling. For a single target architecture the listing is rendered from
//! the `Packages` template with the artifact's checksum bindings; with
//! multiple architectures each listing is produced by the repository scan
//! tool run against the package pool. Either way, every `Filename:` field
//! refers to the artifact by its repository-relative pool path so the
//! metadata stays portable.

use crate::checksum::FileDigests;
use crate::compress::gzip_sibling;
use crate::error::{Error, Result};
use crate::exec::ToolRunner;
use crate::template::{Bindings, render_template};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Pool directory for the `main` component, relative to the output root
pub const POOL_COMPONENT: &str = "pool/main";

/// A staged package artifact with its computed metadata
#[derive(Debug, Clone)]
pub struct ArtifactMeta {
    /// File name of the package (`sample-1.0.0.deb`)
    pub basename: String,
    /// Absolute path of the staged copy inside the pool
    pub path: PathBuf,
    /// Size and digest set of the staged bytes
    pub digests: FileDigests,
}

impl ArtifactMeta {
    /// Repository-relative path used in `Filename:` fields
    pub fn pool_path(&self) -> String {
        format!("{POOL_COMPONENT}/{}", self.basename)
    }
}

/// A generated index file, tracked by its path relative to the
/// distribution root (`dists/stable`) as the release descriptor will
/// reference it
#[derive(Debug, Clone)]
pub struct IndexFile {
    /// Path relative to `dists/stable`, e.g. `main/binary-amd64/Packages`
    pub dists_relative: String,
    /// Absolute on-disk path
    pub path: PathBuf,
}

/// Builds the per-architecture package listings
pub struct PackageIndexBuilder<'a, R: ToolRunner> {
    runner: &'a R,
    output_root: &'a Path,
    templates: &'a Path,
    architectures: &'a [String],
    scan_tool: &'a str,
    package: &'a str,
    version: &'a str,
}

impl<'a, R: ToolRunner> PackageIndexBuilder<'a, R> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        runner: &'a R,
        output_root: &'a Path,
        templates: &'a Path,
        architectures: &'a [String],
        scan_tool: &'a str,
        package: &'a str,
        version: &'a str,
    ) -> Self {
        Self {
            runner,
            output_root,
            templates,
            architectures,
            scan_tool,
            package,
            version,
        }
    }

    /// Generate the listing and its `.gz` sibling for every architecture
    pub fn build(&self, artifact: &ArtifactMeta) -> Result<Vec<IndexFile>> {
        let mut index_files = Vec::new();

        for arch in self.architectures {
            let body = if self.architectures.len() == 1 {
                self.render_listing(artifact, arch)?
            } else {
                self.scan_listing(arch)?
            };

            let arch_dir = self
                .output_root
                .join("dists/stable/main")
                .join(format!("binary-{arch}"));
            fs::create_dir_all(&arch_dir)
                .map_err(|e| Error::io(format!("creating '{}'", arch_dir.display()), e))?;

            let listing = arch_dir.join("Packages");
            fs::write(&listing, &body)
                .map_err(|e| Error::io(format!("writing '{}'", listing.display()), e))?;
            let compressed = gzip_sibling(&listing)?;

            info!(
                "Wrote package listing for {} ({} bytes)",
                arch,
                body.len()
            );

            index_files.push(IndexFile {
                dists_relative: format!("main/binary-{arch}/Packages"),
                path: listing,
            });
            index_files.push(IndexFile {
                dists_relative: format!("main/binary-{arch}/Packages.gz"),
                path: compressed,
            });
        }

        Ok(index_files)
    }

    /// Render the listing stanza for the artifact from the template
    fn render_listing(&self, artifact: &ArtifactMeta, arch: &str) -> Result<String> {
        let mut bindings = Bindings::new();
        bindings.set_scalar("package.name", self.package);
        bindings.set_scalar("package.version", self.version);
        bindings.set_scalar("arch", arch);
        bindings.set_scalar("filename", artifact.pool_path());
        // The record is reachable under its basename and under the stable
        // alias the shipped template uses.
        bindings.set_file(artifact.basename.clone(), artifact.digests.clone());
        bindings.set_file("artifact", artifact.digests.clone());

        let template = self.templates.join("Packages");
        let (body, report) = render_template(&template, &bindings)?;
        if !report.failures.is_empty() {
            warn!(
                "Package listing rendered with {} skipped line(s)",
                report.failures.len()
            );
        }
        Ok(body)
    }

    /// Produce the listing for one architecture by scanning the pool
    fn scan_listing(&self, arch: &str) -> Result<String> {
        let pool = self.output_root.join(POOL_COMPONENT);
        let pool_arg = pool.to_string_lossy();
        let output = self
            .runner
            .run(self.scan_tool, &["--arch", arch, pool_arg.as_ref()])?;

        if !output.success() {
            return Err(Error::ToolFailed {
                tool: self.scan_tool.to_string(),
                code: output.code,
                stderr: output.stderr,
            });
        }
        if output.stdout.trim().is_empty() {
            return Err(Error::ScanEmpty {
                tool: self.scan_tool.to_string(),
            });
        }

        Ok(rewrite_filename_lines(&output.stdout))
    }
}

/// Rewrite every `Filename:` line so the referenced package path is
/// repository-relative (`pool/main/<basename>`), whatever path the scan
/// tool printed
pub fn rewrite_filename_lines(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    for line in body.lines() {
        if let Some(value) = line.strip_prefix("Filename:") {
            let basename = value.trim().rsplit('/').next().unwrap_or("").to_string();
            out.push_str(&format!("Filename: {POOL_COMPONENT}/{basename}"));
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}

/// Write the empty translation stub and its `.gz` sibling
///
/// The file is always empty; it exists because APT clients request it and
/// treat its absence as an error on some configurations.
pub fn write_translation_stub(output_root: &Path) -> Result<IndexFile> {
    let i18n_dir = output_root.join("dists/stable/i18n");
    fs::create_dir_all(&i18n_dir)
        .map_err(|e| Error::io(format!("creating '{}'", i18n_dir.display()), e))?;

    let stub = i18n_dir.join("Translation-en");
    fs::write(&stub, b"").map_err(|e| Error::io(format!("writing '{}'", stub.display()), e))?;
    let compressed = gzip_sibling(&stub)?;

    Ok(IndexFile {
        dists_relative: "i18n/Translation-en.gz".to_string(),
        path: compressed,
    })
}
