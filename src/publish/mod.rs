// src/publish/mod.rs

//! Pipeline orchestration
//!
//! Drives the publish run through its stages in dependency order:
//!
//! `Idle -> Building -> IndexGenerating -> ReleaseGenerating -> Signing ->
//! Publishing -> Done`, with `Failed` reachable from every non-terminal
//! stage. Each stage consumes byte-exact output of its predecessor, so the
//! pipeline is strictly sequential; nothing runs concurrently within one
//! invocation.
//!
//! Publishing copies the local output tree into the destination and
//! reassigns ownership. That step mutates state outside the output tree and
//! is not transactional: a failure partway through leaves the destination
//! mixed. The run stops immediately and reports precisely instead of
//! attempting rollback.

use crate::checksum::digest_file;
use crate::error::{Error, Result};
use crate::exec::ToolRunner;
use crate::index::{ArtifactMeta, PackageIndexBuilder, POOL_COMPONENT, write_translation_stub};
use crate::release::ReleaseDescriptorBuilder;
use crate::sign::SigningService;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Building,
    IndexGenerating,
    ReleaseGenerating,
    Signing,
    Publishing,
    Done,
    Failed,
}

/// Everything a publish run needs to know. One field per knob; each toggle
/// has exactly one effect.
#[derive(Debug, Clone)]
pub struct PublishConfig {
    /// Package name (`Origin:` of the repository)
    pub package: String,
    /// Package version
    pub version: String,
    /// Artifact file name, `<package>-<version>.deb` by default
    pub filename: String,
    /// Staged build tree handed to the build tool
    pub source_dir: PathBuf,
    /// Local output root the repository tree is generated under
    pub output_root: PathBuf,
    /// Directory holding the `Packages` and `Release` templates
    pub templates: PathBuf,
    /// Destination distribution tree for the final copy
    pub destination: PathBuf,
    /// Target architectures
    pub architectures: Vec<String>,
    /// Signing key identity; empty means unconfigured
    pub signing_key: String,
    /// `user:group` the destination tree is reassigned to
    pub serving_identity: String,
    /// Run the package build (false: artifact assumed already present)
    pub build: bool,
    /// Run the publish stage at all (false: stop after signing)
    pub install: bool,
    /// Copy into the destination (false: build locally only)
    pub copy: bool,
    /// Skip the interactive confirmation prompt
    pub auto_confirm: bool,
    /// External packaging tool
    pub build_tool: String,
    /// External pool scan tool
    pub scan_tool: String,
    /// External release assembly tool; `None` renders from the template
    pub release_tool: Option<String>,
    /// External signing tool
    pub sign_tool: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        let package = "jump-start-website".to_string();
        let version = "1.0.0".to_string();
        let filename = format!("{package}-{version}.deb");
        Self {
            package,
            version,
            filename,
            source_dir: PathBuf::from("distribution"),
            output_root: PathBuf::from("output"),
            templates: PathBuf::from("templates"),
            destination: PathBuf::from("/var/www/html/distributions/debian"),
            architectures: vec!["amd64".to_string()],
            signing_key: String::new(),
            serving_identity: "www-data:www-data".to_string(),
            build: true,
            install: true,
            copy: true,
            auto_confirm: false,
            build_tool: "dpkg-deb".to_string(),
            scan_tool: "dpkg-scanpackages".to_string(),
            release_tool: None,
            sign_tool: "gpg".to_string(),
        }
    }
}

/// Runs the pipeline end to end against one configuration
pub struct PublishCoordinator<R: ToolRunner> {
    config: PublishConfig,
    runner: R,
    stage: Stage,
}

impl<R: ToolRunner> PublishCoordinator<R> {
    pub fn new(config: PublishConfig, runner: R) -> Self {
        Self {
            config,
            runner,
            stage: Stage::Idle,
        }
    }

    /// Current pipeline stage
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// The tool runner this coordinator drives external commands through
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Drive the pipeline to completion or to the first fatal error
    pub fn run(&mut self) -> Result<()> {
        match self.run_inner() {
            Ok(()) => {
                self.enter(Stage::Done);
                info!("Publish run complete");
                Ok(())
            }
            Err(e) => {
                self.stage = Stage::Failed;
                Err(e)
            }
        }
    }

    fn run_inner(&mut self) -> Result<()> {
        if self.config.build {
            self.enter(Stage::Building);
            self.build_artifact()?;
        } else {
            info!("Skipping package build");
        }

        self.enter(Stage::IndexGenerating);
        let artifact = self.stage_artifact()?;
        let index_builder = PackageIndexBuilder::new(
            &self.runner,
            &self.config.output_root,
            &self.config.templates,
            &self.config.architectures,
            &self.config.scan_tool,
            &self.config.package,
            &self.config.version,
        );
        let mut index_files = index_builder.build(&artifact)?;
        index_files.push(write_translation_stub(&self.config.output_root)?);

        self.enter(Stage::ReleaseGenerating);
        let release_builder = ReleaseDescriptorBuilder::new(
            &self.runner,
            &self.config.output_root,
            &self.config.templates,
            &self.config.architectures,
            &self.config.package,
            self.config.release_tool.as_deref(),
        );
        let descriptor = release_builder.build(&index_files)?;

        self.enter(Stage::Signing);
        let signer = SigningService::new(&self.runner, &self.config.sign_tool, &self.config.signing_key);
        signer.sign(&descriptor)?;

        if !self.config.install {
            info!("Publish stage skipped; repository left in {}", self.config.output_root.display());
            return Ok(());
        }
        if !self.config.auto_confirm && !self.confirm_publish()? {
            info!("Publish declined; repository left in {}", self.config.output_root.display());
            return Ok(());
        }

        self.enter(Stage::Publishing);
        if self.config.copy {
            self.copy_tree()?;
            self.reassign_ownership()?;
            info!(
                "Published repository to {}",
                self.config.destination.display()
            );
        } else {
            info!("Destination copy skipped");
        }

        Ok(())
    }

    fn enter(&mut self, stage: Stage) {
        debug!("Pipeline stage: {:?} -> {:?}", self.stage, stage);
        self.stage = stage;
    }

    /// Invoke the external packaging tool to produce the artifact
    fn build_artifact(&self) -> Result<()> {
        let artifact = Path::new(&self.config.filename);
        if artifact.is_file() {
            fs::remove_file(artifact)
                .map_err(|e| Error::io(format!("removing existing '{}'", artifact.display()), e))?;
            info!("Removed existing package: {}", artifact.display());
        }

        info!("Building: {}", self.config.filename);
        let source = self.config.source_dir.to_string_lossy();
        let output = self.runner.run(
            &self.config.build_tool,
            &["--build", source.as_ref(), &self.config.filename],
        )?;

        if !output.success() {
            return Err(Error::ToolFailed {
                tool: self.config.build_tool.clone(),
                code: output.code,
                stderr: output.stderr,
            });
        }
        Ok(())
    }

    /// Copy the artifact into the pool and compute its digest set
    fn stage_artifact(&self) -> Result<ArtifactMeta> {
        let source = Path::new(&self.config.filename);
        if !source.is_file() {
            return Err(Error::FileNotFound(source.to_path_buf()));
        }

        let basename = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::FileNotFound(source.to_path_buf()))?;

        let pool = self.config.output_root.join(POOL_COMPONENT);
        fs::create_dir_all(&pool)
            .map_err(|e| Error::io(format!("creating '{}'", pool.display()), e))?;

        let staged = pool.join(&basename);
        fs::copy(source, &staged)
            .map_err(|e| Error::io(format!("staging '{}' into the pool", basename), e))?;

        let digests = digest_file(&staged)?;
        info!("Staged {} into the pool ({} bytes)", basename, digests.size);

        Ok(ArtifactMeta {
            basename,
            path: staged,
            digests,
        })
    }

    /// Ask the operator whether to go ahead with the publish
    fn confirm_publish(&self) -> Result<bool> {
        print!("Do you wish to install the package [y/N]: ");
        io::stdout()
            .flush()
            .map_err(|e| Error::io("flushing the confirmation prompt", e))?;

        let mut answer = String::new();
        io::stdin()
            .read_line(&mut answer)
            .map_err(|e| Error::io("reading the confirmation answer", e))?;
        Ok(answer.trim().eq_ignore_ascii_case("y"))
    }

    /// Mirror the output tree into the destination. Not transactional: a
    /// failure here leaves the destination in a mixed state and the run
    /// stops with the precise error.
    fn copy_tree(&self) -> Result<()> {
        for entry in WalkDir::new(&self.config.output_root) {
            let entry =
                entry.map_err(|e| Error::io("walking the output tree", io::Error::from(e)))?;
            let Ok(relative) = entry.path().strip_prefix(&self.config.output_root) else {
                continue;
            };
            if relative.as_os_str().is_empty() {
                continue;
            }

            let target = self.config.destination.join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)
                    .map_err(|e| Error::io(format!("creating '{}'", target.display()), e))?;
            } else {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)
                        .map_err(|e| Error::io(format!("creating '{}'", parent.display()), e))?;
                }
                fs::copy(entry.path(), &target)
                    .map_err(|e| Error::io(format!("copying to '{}'", target.display()), e))?;
            }
        }
        Ok(())
    }

    /// Recursively reassign the destination tree to the serving identity
    fn reassign_ownership(&self) -> Result<()> {
        let destination = self.config.destination.to_string_lossy();
        let output = self.runner.run(
            "chown",
            &["-R", &self.config.serving_identity, destination.as_ref()],
        )?;

        if !output.success() {
            return Err(Error::ToolFailed {
                tool: "chown".to_string(),
                code: output.code,
                stderr: output.stderr,
            });
        }
        Ok(())
    }
}
