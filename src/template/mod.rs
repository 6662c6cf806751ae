// src/template/mod.rs

//! Plain-text template rendering for index files
//!
//! Templates are rendered line by line: one input line produces exactly one
//! output line, in input order. A line may reference bindings through
//! `${dotted.path}` placeholders. The substitution language is deliberately
//! constrained to dotted-path lookups (no expressions, loops, or
//! conditionals); structural logic such as architecture enumeration belongs
//! in the builders, not the templates.
//!
//! A failing line (unknown binding, malformed placeholder) is reported and
//! skipped; the remaining lines still render. A missing template file fails
//! the render wholesale.

use crate::checksum::{ChecksumKind, FileDigests};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::warn;

/// A single render-time value
#[derive(Debug, Clone)]
pub enum Binding {
    /// Plain string value
    Scalar(String),
    /// Per-file record exposing `size` and `checksums.<algorithm>`
    File(FileDigests),
}

/// Variable bindings handed to the renderer. Built up by the pipeline
/// stages, read-only during rendering.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    entries: BTreeMap<String, Binding>,
}

impl Bindings {
    /// Create an empty bindings table
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a scalar value
    pub fn set_scalar(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), Binding::Scalar(value.into()));
    }

    /// Bind a per-file checksum/size record, keyed by file basename
    pub fn set_file(&mut self, basename: impl Into<String>, digests: FileDigests) {
        self.entries.insert(basename.into(), Binding::File(digests));
    }

    /// Resolve a dotted path to a string value
    ///
    /// Binding names may themselves contain dots (file basenames such as
    /// `Packages.gz`), so the longest binding name that prefixes the path
    /// wins. Within a file record the remaining path selects `size` (or
    /// `file_size`) or `checksums.<algorithm>`.
    pub fn resolve(&self, path: &str) -> Option<String> {
        let mut best: Option<(&str, &Binding)> = None;
        for (name, binding) in &self.entries {
            let matches = path == name
                || (path.starts_with(name) && path.as_bytes().get(name.len()) == Some(&b'.'));
            if matches && best.is_none_or(|(b, _)| name.len() > b.len()) {
                best = Some((name, binding));
            }
        }

        let (name, binding) = best?;
        let rest = path[name.len()..].strip_prefix('.').unwrap_or("");

        match binding {
            Binding::Scalar(value) => {
                if rest.is_empty() {
                    Some(value.clone())
                } else {
                    None
                }
            }
            Binding::File(digests) => match rest {
                "size" | "file_size" => Some(digests.size.to_string()),
                _ => {
                    let algorithm = rest.strip_prefix("checksums.")?;
                    let kind: ChecksumKind = algorithm.parse().ok()?;
                    digests.checksums.get(&kind).cloned()
                }
            },
        }
    }
}

/// One skipped line from a render pass
#[derive(Debug)]
pub struct RenderFailure {
    /// 1-based line number within the template
    pub line_number: usize,
    /// What went wrong on that line
    pub reason: String,
}

/// Outcome of a render pass: how many lines made it to the output and
/// which ones did not
#[derive(Debug, Default)]
pub struct RenderReport {
    /// Number of lines written to the output
    pub lines_rendered: usize,
    /// Lines that failed to substitute and were skipped
    pub failures: Vec<RenderFailure>,
}

/// Substitute every `${...}` placeholder in one line
fn render_line(line: &str, bindings: &Bindings) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| format!("unterminated placeholder in '{}'", line.trim_end()))?;
        let path = &after[..end];
        let value = bindings
            .resolve(path)
            .ok_or_else(|| format!("undefined binding '{path}'"))?;
        out.push_str(&value);
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Render template text against bindings, line by line
///
/// Returns the rendered text and a report of skipped lines. Line order is
/// preserved; a failing line is omitted from the output but never aborts the
/// remaining lines.
pub fn render_str(template: &str, bindings: &Bindings) -> (String, RenderReport) {
    let mut output = String::new();
    let mut report = RenderReport::default();

    for (index, line) in template.lines().enumerate() {
        match render_line(line, bindings) {
            Ok(rendered) => {
                output.push_str(&rendered);
                output.push('\n');
                report.lines_rendered += 1;
            }
            Err(reason) => {
                warn!("Skipping template line {}: {}", index + 1, reason);
                report.failures.push(RenderFailure {
                    line_number: index + 1,
                    reason,
                });
            }
        }
    }

    (output, report)
}

/// Render a template file against bindings
pub fn render_template(template_path: &Path, bindings: &Bindings) -> Result<(String, RenderReport)> {
    if !template_path.is_file() {
        return Err(Error::TemplateNotFound(template_path.to_path_buf()));
    }

    let template = fs::read_to_string(template_path)
        .map_err(|e| Error::io(format!("reading template '{}'", template_path.display()), e))?;

    let (output, report) = render_str(&template, bindings);
    if !report.failures.is_empty() {
        warn!(
            "{} of {} template lines failed to render from {}",
            report.failures.len(),
            report.failures.len() + report.lines_rendered,
            template_path.display()
        );
    }

    Ok((output, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::{ChecksumKind, DigestSet};

    fn sample_file_record() -> FileDigests {
        let mut checksums = DigestSet::new();
        checksums.insert(ChecksumKind::Md5, "d41d8cd98f00b204e9800998ecf8427e".to_string());
        checksums.insert(
            ChecksumKind::Sha256,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855".to_string(),
        );
        FileDigests {
            size: 1234,
            checksums,
        }
    }

    #[test]
    fn test_scalar_substitution() {
        let mut bindings = Bindings::new();
        bindings.set_scalar("package.name", "sample");
        bindings.set_scalar("package.version", "1.0.0");

        let (out, report) = render_str("Package: ${package.name}\nVersion: ${package.version}", &bindings);
        assert_eq!(out, "Package: sample\nVersion: 1.0.0\n");
        assert_eq!(report.lines_rendered, 2);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_file_record_lookups() {
        let mut bindings = Bindings::new();
        bindings.set_file("sample-1.0.0.deb", sample_file_record());

        assert_eq!(
            bindings.resolve("sample-1.0.0.deb.size").as_deref(),
            Some("1234")
        );
        assert_eq!(
            bindings.resolve("sample-1.0.0.deb.file_size").as_deref(),
            Some("1234")
        );
        assert_eq!(
            bindings
                .resolve("sample-1.0.0.deb.checksums.MD5Sum")
                .as_deref(),
            Some("d41d8cd98f00b204e9800998ecf8427e")
        );
        // SHA-1 was never computed for this record
        assert_eq!(bindings.resolve("sample-1.0.0.deb.checksums.SHA1"), None);
    }

    #[test]
    fn test_longest_binding_name_wins() {
        // "Packages" and "Packages.gz" are both valid basename keys; a path
        // into the latter must not resolve against the former.
        let mut bindings = Bindings::new();
        let mut small = sample_file_record();
        small.size = 1;
        bindings.set_file("Packages", small);
        let mut big = sample_file_record();
        big.size = 2;
        bindings.set_file("Packages.gz", big);

        assert_eq!(bindings.resolve("Packages.size").as_deref(), Some("1"));
        assert_eq!(bindings.resolve("Packages.gz.size").as_deref(), Some("2"));
    }

    #[test]
    fn test_failing_line_is_skipped_not_fatal() {
        let mut bindings = Bindings::new();
        bindings.set_scalar("good", "value");

        let template = "line one ${good}\nline two ${missing}\nline three ${good}";
        let (out, report) = render_str(template, &bindings);

        assert_eq!(out, "line one value\nline three value\n");
        assert_eq!(report.lines_rendered, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].line_number, 2);
        assert!(report.failures[0].reason.contains("missing"));
    }

    #[test]
    fn test_malformed_placeholder_is_a_line_failure() {
        let bindings = Bindings::new();
        let (out, report) = render_str("broken ${never closed\nplain line", &bindings);
        assert_eq!(out, "plain line\n");
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].reason.contains("unterminated"));
    }

    #[test]
    fn test_line_without_placeholders_passes_through() {
        let bindings = Bindings::new();
        let (out, report) = render_str("Components: main", &bindings);
        assert_eq!(out, "Components: main\n");
        assert_eq!(report.lines_rendered, 1);
    }

    #[test]
    fn test_missing_template_file_is_wholesale_failure() {
        let bindings = Bindings::new();
        let err = render_template(Path::new("/no/such/template"), &bindings).unwrap_err();
        assert!(matches!(err, Error::TemplateNotFound(_)));
    }

    #[test]
    fn test_multiple_placeholders_on_one_line() {
        let mut bindings = Bindings::new();
        bindings.set_scalar("a", "1");
        bindings.set_scalar("b", "2");
        let (out, _) = render_str("${a} and ${b} and ${a}", &bindings);
        assert_eq!(out, "1 and 2 and 1\n");
    }
}
