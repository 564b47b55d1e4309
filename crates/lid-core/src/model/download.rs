//! Model artifact download with bounded retries.
//!
//! Downloads are idempotent (an existing destination is a no-op) and
//! atomic: the body is written to a `.part` sibling and renamed into
//! place only on success, so a killed process never leaves a truncated
//! artifact under the well-known model name.

use std::fs;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use crate::config::DownloadOptions;
use crate::error::{DetectError, Result};

/// Bytes between progress callbacks when the total size is unknown
const PROGRESS_STEP: u64 = 500_000;

/// Ensure the directory that will hold a model artifact exists.
///
/// The default cache root may be created on demand. A caller-supplied
/// directory must already exist: silently creating directory trees at
/// arbitrary caller paths is a surprising filesystem write, so that
/// case fails fast instead.
pub fn ensure_cache_dir(dir: &Path, is_default: bool) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    if is_default {
        fs::create_dir_all(dir)?;
        return Ok(());
    }
    Err(DetectError::CacheDirNotFound {
        path: dir.to_path_buf(),
    })
}

/// Download `url` to `dest`, skipping if `dest` already exists.
pub fn fetch(
    url: &str,
    dest: &Path,
    proxy: Option<&str>,
    options: &DownloadOptions,
) -> Result<()> {
    fetch_with_progress(url, dest, proxy, options, |_, _| {})
}

/// Download with a progress callback receiving `(downloaded, total)`
/// bytes; `total` is 0 when the server does not report a length.
pub fn fetch_with_progress<F>(
    url: &str,
    dest: &Path,
    proxy: Option<&str>,
    options: &DownloadOptions,
    on_progress: F,
) -> Result<()>
where
    F: Fn(u64, u64),
{
    if dest.exists() {
        crate::verbose!("Model already present at {}, skipping download", dest.display());
        return Ok(());
    }

    let client = build_client(proxy, options)?;

    let attempts = options.retries + 1;
    let mut last_error = String::new();
    for attempt in 0..attempts {
        if attempt > 0 {
            // Short linear backoff between attempts
            std::thread::sleep(Duration::from_secs(attempt as u64));
            crate::verbose!("Retrying download ({}/{})", attempt + 1, attempts);
        }

        match fetch_once(&client, url, dest, &on_progress) {
            Ok(()) => return Ok(()),
            Err(reason) => {
                crate::verbose!("Download attempt {} failed: {}", attempt + 1, reason);
                last_error = reason;
            }
        }
    }

    Err(DetectError::DownloadFailed {
        url: url.to_string(),
        reason: format!("{} attempts exhausted, last error: {}", attempts, last_error),
    })
}

fn build_client(
    proxy: Option<&str>,
    options: &DownloadOptions,
) -> Result<reqwest::blocking::Client> {
    let mut builder = reqwest::blocking::Client::builder()
        .connect_timeout(options.connect_timeout)
        .read_timeout(options.read_timeout)
        // The read timeout bounds stalls; the request itself must be
        // allowed to outlive the blocking client's 30s default total.
        .timeout(None);

    if let Some(proxy_url) = proxy {
        let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| DetectError::DownloadFailed {
            url: proxy_url.to_string(),
            reason: format!("invalid proxy: {}", e),
        })?;
        builder = builder.proxy(proxy);
    }

    builder.build().map_err(|e| DetectError::DownloadFailed {
        url: String::new(),
        reason: format!("failed to build HTTP client: {}", e),
    })
}

/// Single download attempt. Returns a plain reason string so the retry
/// loop can accumulate it without nesting error types.
fn fetch_once<F>(
    client: &reqwest::blocking::Client,
    url: &str,
    dest: &Path,
    on_progress: &F,
) -> std::result::Result<(), String>
where
    F: Fn(u64, u64),
{
    let mut response = client
        .get(url)
        .send()
        .map_err(|e| format!("request failed: {}", e))?;

    if !response.status().is_success() {
        return Err(format!("HTTP {}", response.status()));
    }

    let total_size = response.content_length().unwrap_or(0);

    // Write to a temp sibling first, rename on success
    let part_path = dest.with_extension("bin.part");
    let result = write_body(&mut response, &part_path, total_size, on_progress);

    match result {
        Ok(downloaded) => {
            fs::rename(&part_path, dest).map_err(|e| format!("failed to finalize: {}", e))?;
            crate::verbose!(
                "Download complete: {:.1} MB at {}",
                downloaded as f64 / 1_000_000.0,
                dest.display()
            );
            Ok(())
        }
        Err(reason) => {
            // Best effort; a stale .part is overwritten on the next attempt
            let _ = fs::remove_file(&part_path);
            Err(reason)
        }
    }
}

fn write_body<F>(
    response: &mut reqwest::blocking::Response,
    part_path: &Path,
    total_size: u64,
    on_progress: &F,
) -> std::result::Result<u64, String>
where
    F: Fn(u64, u64),
{
    use std::io::Write;

    let mut file =
        fs::File::create(part_path).map_err(|e| format!("failed to create temp file: {}", e))?;

    let mut downloaded: u64 = 0;
    let mut last_callback_bytes: u64 = 0;
    let mut buffer = [0u8; 8192];

    on_progress(0, total_size);

    loop {
        let bytes_read = response
            .read(&mut buffer)
            .map_err(|e| format!("download interrupted: {}", e))?;
        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read])
            .map_err(|e| format!("failed to write to file: {}", e))?;
        downloaded += bytes_read as u64;

        // Report every ~1% or 500KB, whichever is more frequent
        let threshold = if total_size > 0 {
            (total_size / 100).min(PROGRESS_STEP)
        } else {
            PROGRESS_STEP
        };
        if downloaded - last_callback_bytes >= threshold {
            on_progress(downloaded, total_size);
            last_callback_bytes = downloaded;
        }
    }

    on_progress(downloaded, total_size);
    Ok(downloaded)
}
