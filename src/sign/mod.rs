// src/sign/mod.rs

//! Release descriptor signing
//!
//! Produces the two signature forms APT clients look for: `InRelease`
//! (clearsigned descriptor with an inline signature block) and
//! `Release.gpg` (armored detached signature verified against the
//! descriptor file itself). Signing is delegated to the external signing
//! tool through the command seam; this module only constructs arguments and
//! translates failures.
//!
//! Signing must run after the descriptor has reached its final on-disk
//! bytes. Regenerating the descriptor invalidates both signature files.

use crate::error::{Error, Result};
use crate::exec::ToolRunner;
use std::path::{Path, PathBuf};
use tracing::info;

/// Clearsigned descriptor file name
pub const INLINE_NAME: &str = "InRelease";
/// Detached signature file name
pub const DETACHED_NAME: &str = "Release.gpg";

/// The two signature files produced for one release descriptor
#[derive(Debug, Clone)]
pub struct SignatureBundle {
    /// Clearsigned combined file (`InRelease`)
    pub clearsigned: PathBuf,
    /// Armored detached signature (`Release.gpg`)
    pub detached: PathBuf,
}

/// Signs release descriptors with an external signing tool
pub struct SigningService<'a, R: ToolRunner> {
    runner: &'a R,
    sign_tool: &'a str,
    key_id: &'a str,
}

impl<'a, R: ToolRunner> SigningService<'a, R> {
    pub fn new(runner: &'a R, sign_tool: &'a str, key_id: &'a str) -> Self {
        Self {
            runner,
            sign_tool,
            key_id,
        }
    }

    /// Produce the clearsigned and detached signatures for `descriptor`
    ///
    /// An empty signing key is a configuration error raised before any
    /// subprocess is spawned: an unsigned repository is not installable by
    /// strict clients, so there is nothing useful to continue with.
    pub fn sign(&self, descriptor: &Path) -> Result<SignatureBundle> {
        if self.key_id.trim().is_empty() {
            return Err(Error::MissingSigningKey);
        }
        if !descriptor.is_file() {
            return Err(Error::FileNotFound(descriptor.to_path_buf()));
        }

        let dists = descriptor.parent().unwrap_or(Path::new("."));
        let clearsigned = dists.join(INLINE_NAME);
        let detached = dists.join(DETACHED_NAME);

        self.invoke(
            "clearsign",
            &["--clearsign", "--output"],
            &clearsigned,
            descriptor,
        )?;
        self.invoke(
            "detach-sign",
            &["--armor", "--detach-sign", "--output"],
            &detached,
            descriptor,
        )?;

        info!(
            "Signed release descriptor as {} and {}",
            clearsigned.display(),
            detached.display()
        );
        Ok(SignatureBundle {
            clearsigned,
            detached,
        })
    }

    /// Run one signing invocation, mapping a non-zero exit to a structured
    /// error. No retry: a signing failure is fatal to the publish run.
    fn invoke(&self, mode: &str, mode_args: &[&str], output: &Path, input: &Path) -> Result<()> {
        let output_arg = output.to_string_lossy();
        let input_arg = input.to_string_lossy();

        let mut args: Vec<&str> = vec!["--batch", "--yes", "--local-user", self.key_id];
        args.extend_from_slice(mode_args);
        args.push(output_arg.as_ref());
        args.push(input_arg.as_ref());

        let result = self.runner.run(self.sign_tool, &args)?;
        if !result.success() {
            return Err(Error::ToolFailed {
                tool: format!("{} ({mode})", self.sign_tool),
                code: result.code,
                stderr: result.stderr,
            });
        }
        Ok(())
    }
}
