//! Chunked checksum computation for model files.
//!
//! Verification is advisory: a mismatch is reported to the caller as
//! `false`, logged there as a warning, and the load proceeds anyway.
//! A corrupted-but-loadable model is still worth attempting.

use md5::{Digest, Md5};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Chunk size for reading model files
const CHUNK_SIZE: usize = 8192;

/// Compute the MD5 digest of a file as a lowercase hex string
pub fn checksum(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Md5::new();
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compare a file's digest to an expected value.
///
/// Returns `false` on mismatch, never an error for that reason; only
/// I/O failures while reading the file surface as errors.
pub fn verify(path: &Path, expected: &str) -> std::io::Result<bool> {
    let digest = checksum(path)?;
    Ok(digest.eq_ignore_ascii_case(expected))
}
