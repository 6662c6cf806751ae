// tests/publish_pipeline.rs

//! End-to-end pipeline tests
//!
//! These drive the coordinator against a scratch tree with a scripted tool
//! runner, and verify the published repository layout, the consistency
//! between artifact bytes and the generated metadata, and the signing
//! invocation contract.

use aptpress::checksum::{ChecksumKind, checksum_bytes, digest_file};
use aptpress::compress::gunzip_file;
use aptpress::exec::ScriptedRunner;
use aptpress::publish::{PublishConfig, PublishCoordinator, Stage};
use std::fs;
use std::path::Path;

const PACKAGES_TEMPLATE: &str = "\
Package: ${package.name}
Version: ${package.version}
Architecture: ${arch}
Filename: ${filename}
Size: ${artifact.size}
MD5sum: ${artifact.checksums.MD5Sum}
SHA256: ${artifact.checksums.SHA256}
";

const RELEASE_TEMPLATE: &str = "\
Origin: ${origin}
Label: ${origin}
Architectures: ${architectures}
Components: main
Date: ${date}
";

const ARTIFACT_CONTENT: &[u8] = b"hello world";

fn config_for(dir: &Path) -> PublishConfig {
    let templates = dir.join("templates");
    fs::create_dir_all(&templates).unwrap();
    fs::write(templates.join("Packages"), PACKAGES_TEMPLATE).unwrap();
    fs::write(templates.join("Release"), RELEASE_TEMPLATE).unwrap();

    let artifact = dir.join("sample-1.0.0.deb");
    fs::write(&artifact, ARTIFACT_CONTENT).unwrap();

    PublishConfig {
        package: "sample".to_string(),
        version: "1.0.0".to_string(),
        filename: artifact.to_string_lossy().into_owned(),
        output_root: dir.join("output"),
        templates,
        destination: dir.join("public"),
        signing_key: "archive@example.org".to_string(),
        build: false,
        auto_confirm: true,
        ..PublishConfig::default()
    }
}

#[test]
fn test_published_tree_layout_and_metadata_consistency() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    let output_root = config.output_root.clone();

    let runner = ScriptedRunner::new();
    runner.push_ok(""); // gpg clearsign
    runner.push_ok(""); // gpg detach-sign
    runner.push_ok(""); // chown

    let mut coordinator = PublishCoordinator::new(config, runner);
    coordinator.run().unwrap();
    assert_eq!(coordinator.stage(), Stage::Done);

    // Layout
    let pool_copy = output_root.join("pool/main/sample-1.0.0.deb");
    let listing = output_root.join("dists/stable/main/binary-amd64/Packages");
    let listing_gz = output_root.join("dists/stable/main/binary-amd64/Packages.gz");
    let stub = output_root.join("dists/stable/i18n/Translation-en");
    let stub_gz = output_root.join("dists/stable/i18n/Translation-en.gz");
    let descriptor = output_root.join("dists/stable/Release");
    for path in [&pool_copy, &listing, &listing_gz, &stub, &stub_gz, &descriptor] {
        assert!(path.is_file(), "missing {}", path.display());
    }

    // The staged artifact is byte-identical to the input
    assert_eq!(fs::read(&pool_copy).unwrap(), ARTIFACT_CONTENT);

    // The listing references the artifact by pool path, with the exact
    // digests and byte count of the staged bytes
    let body = fs::read_to_string(&listing).unwrap();
    assert!(body.contains("Filename: pool/main/sample-1.0.0.deb"));
    assert!(body.contains(&format!("Size: {}", ARTIFACT_CONTENT.len())));
    assert!(body.contains(&format!(
        "MD5sum: {}",
        checksum_bytes(ChecksumKind::Md5, ARTIFACT_CONTENT)
    )));
    assert!(body.contains(&format!(
        "SHA256: {}",
        checksum_bytes(ChecksumKind::Sha256, ARTIFACT_CONTENT)
    )));

    // The compressed listing decompresses to the same bytes
    assert_eq!(gunzip_file(&listing_gz).unwrap(), body.as_bytes());

    // The translation stub is present and empty
    assert_eq!(fs::read(&stub).unwrap(), b"");
    assert!(gunzip_file(&stub_gz).unwrap().is_empty());

    // The descriptor defaults Suite/Codename ahead of the body and covers
    // every index file with its current checksum and size
    let release = fs::read_to_string(&descriptor).unwrap();
    assert!(release.starts_with("Suite: stable\nCodename: stable\nOrigin: sample\n"));
    for (covered, relative) in [
        (&listing, "main/binary-amd64/Packages"),
        (&listing_gz, "main/binary-amd64/Packages.gz"),
        (&stub_gz, "i18n/Translation-en.gz"),
    ] {
        let digests = digest_file(covered).unwrap();
        let sha256 = &digests.checksums[&ChecksumKind::Sha256];
        let line = format!(" {sha256} {:>16} {relative}", digests.size);
        assert!(release.contains(&line), "descriptor must list {relative}");
    }

    // The destination mirrors the output tree
    let published_release = dir.path().join("public/dists/stable/Release");
    assert_eq!(fs::read(&published_release).unwrap(), release.as_bytes());
}

#[test]
fn test_signing_happens_over_final_descriptor_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    let descriptor = config.output_root.join("dists/stable/Release");

    let runner = ScriptedRunner::new();
    runner.push_ok(""); // gpg clearsign
    runner.push_ok(""); // gpg detach-sign
    runner.push_ok(""); // chown

    let mut coordinator = PublishCoordinator::new(config, runner);
    coordinator.run().unwrap();

    // Both gpg invocations target the descriptor file itself; the clearsign
    // output goes to InRelease, the detached signature to Release.gpg
    let descriptor_arg = descriptor.to_string_lossy().into_owned();
    // The chown call comes last; the two before it are the signing calls
    // (digest of the descriptor is taken after it was written, so the
    // signature covers the file as published)
    let mut gpg_calls = 0;
    let mut saw_chown = false;
    // Re-run over the recorded invocations
    for call in coordinator_calls(&coordinator) {
        match call[0].as_str() {
            "gpg" => {
                gpg_calls += 1;
                assert_eq!(call.last().unwrap(), &descriptor_arg);
                assert!(call.contains(&"--local-user".to_string()));
                assert!(call.contains(&"archive@example.org".to_string()));
                assert!(!saw_chown, "signing must precede publishing");
            }
            "chown" => {
                saw_chown = true;
                assert_eq!(call[1], "-R");
                assert_eq!(call[2], "www-data:www-data");
            }
            other => panic!("unexpected tool invocation: {other}"),
        }
    }
    assert_eq!(gpg_calls, 2);
    assert!(saw_chown);
}

#[test]
fn test_missing_signing_key_stops_before_any_tool_runs() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_for(dir.path());
    config.signing_key = String::new();

    let runner = ScriptedRunner::new();
    let mut coordinator = PublishCoordinator::new(config, runner);
    let err = coordinator.run().unwrap_err();

    assert_eq!(err.exit_code(), 9);
    assert_eq!(coordinator.stage(), Stage::Failed);
    assert!(coordinator_calls(&coordinator).is_empty());
}

/// The coordinator owns its runner; reach the recorded calls through a
/// fresh borrow of the scripted runner inside it
fn coordinator_calls(coordinator: &PublishCoordinator<ScriptedRunner>) -> Vec<Vec<String>> {
    coordinator.runner().calls()
}
