// src/cli.rs

//! CLI definitions for aptpress
//!
//! All command-line surface is defined here with clap; `main` turns the
//! parsed arguments into a [`PublishConfig`] and hands it to the
//! coordinator.

use crate::publish::PublishConfig;
use clap::Parser;
use std::path::PathBuf;

/// Environment variable consulted when `--signing-key` is not given
pub const SIGNING_KEY_ENV: &str = "APTPRESS_SIGNING_KEY";

#[derive(Parser)]
#[command(name = "aptpress")]
#[command(author = "Aptpress Project")]
#[command(about = "Publish a Debian package into a signed APT repository", long_about = None)]
pub struct Cli {
    /// Package name
    #[arg(short, long, default_value = "jump-start-website")]
    pub package: String,

    /// Package version
    #[arg(short, long, default_value = "1.0.0")]
    pub version: String,

    /// Package filename (default: <package>-<version>.deb)
    #[arg(short, long)]
    pub filename: Option<String>,

    /// Distribution destination directory
    #[arg(short, long, default_value = "/var/www/html/distributions/debian")]
    pub dir: PathBuf,

    /// Output directory the repository tree is generated under
    #[arg(short, long, default_value = "output")]
    pub output: PathBuf,

    /// Templates directory
    #[arg(short, long, default_value = "templates")]
    pub templates: PathBuf,

    /// Staged build tree handed to the package build tool
    #[arg(long, default_value = "distribution")]
    pub source_dir: PathBuf,

    /// Target architecture (repeatable)
    #[arg(short = 'a', long = "arch", default_value = "amd64")]
    pub architectures: Vec<String>,

    /// Signing key identity (falls back to APTPRESS_SIGNING_KEY)
    #[arg(short = 'k', long)]
    pub signing_key: Option<String>,

    /// Owner the destination tree is reassigned to
    #[arg(long, default_value = "www-data:www-data")]
    pub owner: String,

    /// Don't build the package (artifact assumed already present)
    #[arg(short = 'n', long = "no-build")]
    pub no_build: bool,

    /// Don't install the package (stop after signing)
    #[arg(short = 'N', long = "no-install")]
    pub no_install: bool,

    /// Don't copy into the destination (build locally only)
    #[arg(short = 's', long = "skip-copy")]
    pub skip_copy: bool,

    /// Publish without asking for confirmation
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,

    /// Pool scan tool used for multi-architecture listings
    #[arg(long, default_value = "dpkg-scanpackages")]
    pub scan_tool: String,

    /// External release assembly tool (default: render from the template)
    #[arg(long)]
    pub release_tool: Option<String>,
}

impl Cli {
    /// Resolve the parsed arguments into a pipeline configuration
    pub fn into_config(self) -> PublishConfig {
        let filename = self
            .filename
            .unwrap_or_else(|| format!("{}-{}.deb", self.package, self.version));
        let signing_key = self
            .signing_key
            .or_else(|| std::env::var(SIGNING_KEY_ENV).ok())
            .unwrap_or_default();

        PublishConfig {
            package: self.package,
            version: self.version,
            filename,
            source_dir: self.source_dir,
            output_root: self.output,
            templates: self.templates,
            destination: self.dir,
            architectures: self.architectures,
            signing_key,
            serving_identity: self.owner,
            build: !self.no_build,
            install: !self.no_install,
            copy: !self.skip_copy,
            auto_confirm: self.yes,
            scan_tool: self.scan_tool,
            release_tool: self.release_tool,
            ..PublishConfig::default()
        }
    }
}
