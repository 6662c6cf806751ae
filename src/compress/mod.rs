// src/compress/mod.rs

//! Gzip companions for generated index files
//!
//! APT clients fetch `Packages.gz` and `Translation-en.gz` next to their
//! uncompressed forms, so every generated index gets a `.gz` sibling with
//! byte-identical decompressed content.

use crate::error::{Error, Result};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Compress `source` into `output` with gzip
pub fn gzip_file(source: &Path, output: &Path) -> Result<()> {
    let mut input = File::open(source)
        .map_err(|e| Error::io(format!("opening '{}' for compression", source.display()), e))?;
    let out = File::create(output)
        .map_err(|e| Error::io(format!("creating '{}'", output.display()), e))?;

    let mut encoder = GzEncoder::new(out, Compression::default());
    io::copy(&mut input, &mut encoder)
        .map_err(|e| Error::io(format!("compressing '{}'", source.display()), e))?;
    encoder
        .finish()
        .map_err(|e| Error::io(format!("finishing '{}'", output.display()), e))?
        .flush()
        .map_err(|e| Error::io(format!("flushing '{}'", output.display()), e))?;

    debug!("Compressed {} -> {}", source.display(), output.display());
    Ok(())
}

/// Compress `source` to a `.gz` sibling and return the sibling path
pub fn gzip_sibling(source: &Path) -> Result<PathBuf> {
    let mut name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::FileNotFound(source.to_path_buf()))?;
    name.push_str(".gz");
    let output = source.with_file_name(name);
    gzip_file(source, &output)?;
    Ok(output)
}

/// Decompress gzip data to a byte vector
pub fn gunzip_bytes(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut output = Vec::new();
    decoder
        .read_to_end(&mut output)
        .map_err(|e| Error::io("decompressing gzip data".to_string(), e))?;
    Ok(output)
}

/// Decompress a gzip file to a byte vector
pub fn gunzip_file(path: &Path) -> Result<Vec<u8>> {
    let data = std::fs::read(path)
        .map_err(|e| Error::io(format!("reading '{}'", path.display()), e))?;
    gunzip_bytes(&data)
}
