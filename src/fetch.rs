//! Archive fetcher
//!
//! Downloads a versioned source archive into the cache, keyed by
//! filename. Presence of the cached file is treated as validity; the
//! upstream mirrors publish no usable integrity signature for the
//! historical releases this tool targets.

use crate::error::{MultisslError, MultisslResult};
use crate::layout::CacheLayout;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io::Read;
use std::path::PathBuf;
use tracing::{debug, info};

/// Ensure the source archive for this layout exists in the cache and
/// return its path. No-op if already cached; otherwise a single
/// blocking HTTP GET with no retry.
pub fn ensure_source(layout: &CacheLayout) -> MultisslResult<PathBuf> {
    let archive = layout.archive_path().to_path_buf();

    if archive.is_file() {
        debug!("Archive already cached at {}", archive.display());
        return Ok(archive);
    }

    if let Some(parent) = archive.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| MultisslError::io(format!("creating {}", parent.display()), e))?;
    }

    let url = layout.url();
    info!("Downloading {}", url);
    let pb = download_spinner(url);

    let body = fetch_body(url);
    pb.finish_and_clear();
    let body = body?;

    // Write to a sibling temp file first so a failed download never
    // leaves a half-written archive that a later run would cache-skip.
    let mut partial = archive.clone().into_os_string();
    partial.push(".part");
    let partial = PathBuf::from(partial);
    fs::write(&partial, &body)
        .map_err(|e| MultisslError::io(format!("writing {}", partial.display()), e))?;
    fs::rename(&partial, &archive)
        .map_err(|e| MultisslError::io(format!("renaming {}", partial.display()), e))?;

    info!("Stored {} ({} bytes)", archive.display(), body.len());
    Ok(archive)
}

fn fetch_body(url: &str) -> MultisslResult<Vec<u8>> {
    let response = ureq::get(url).call().map_err(|e| MultisslError::Fetch {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let mut body = Vec::new();
    response
        .into_body()
        .into_reader()
        .read_to_end(&mut body)
        .map_err(|e| MultisslError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    Ok(body)
}

fn download_spinner(url: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(format!("Downloading {url}"));
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
