use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Attempts per URL before moving on to the next one.
const DOWNLOAD_ATTEMPTS: u32 = 3;

/// First retry delay; doubles on each subsequent attempt.
const BACKOFF_BASE: Duration = Duration::from_millis(500);

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error(
        "all model hosts failed for {name} (last: {url}): {source}\n\
         Check your internet connection, or place {name} in a local models \
         directory and pass it via --models-dir."
    )]
    AllHostsFailed {
        name: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Resolve a model file by name, checking local locations before the network.
///
/// Resolution order:
/// 1. User cache directory (platform-specific)
/// 2. Bundled directory (development / pre-packaged installs)
/// 3. Download: each URL in `urls` is tried in order, with exponential
///    backoff between attempts on the same URL. Only when every host is
///    exhausted does the error surface; it is terminal for the session.
pub fn resolve(
    name: &str,
    urls: &[&str],
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let cache_dir = model_cache_dir()?;
    let cached_path = cache_dir.join(name);
    if cached_path.exists() {
        return Ok(cached_path);
    }

    if let Some(dir) = bundled_dir {
        let bundled_path = dir.join(name);
        if bundled_path.exists() {
            return Ok(bundled_path);
        }
    }

    fs::create_dir_all(&cache_dir).map_err(ModelResolveError::CacheDir)?;
    download_any(name, urls, &cached_path, progress)?;
    Ok(cached_path)
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/Facelens/models/`
/// - Linux: `$XDG_CACHE_HOME/Facelens/models/` or `~/.cache/Facelens/models/`
/// - Windows: `%LOCALAPPDATA%/Facelens/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join("Facelens").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join("Facelens").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

fn download_any(
    name: &str,
    urls: &[&str],
    dest: &Path,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let mut last: Option<(String, reqwest::Error)> = None;

    for url in urls {
        let mut delay = BACKOFF_BASE;
        for attempt in 1..=DOWNLOAD_ATTEMPTS {
            match download(url, dest, progress.as_ref()) {
                Ok(()) => return Ok(()),
                Err(DownloadError::Http(e)) => {
                    log::warn!(
                        "model download failed ({name}, attempt {attempt}/{DOWNLOAD_ATTEMPTS}, {url}): {e}"
                    );
                    last = Some((url.to_string(), e));
                    if attempt < DOWNLOAD_ATTEMPTS {
                        std::thread::sleep(delay);
                        delay *= 2;
                    }
                }
                // Local write failures won't improve with retries
                Err(DownloadError::Write { path, source }) => {
                    return Err(ModelResolveError::Write { path, source });
                }
            }
        }
    }

    let (url, source) = last.expect("download_any called with at least one URL");
    Err(ModelResolveError::AllHostsFailed {
        name: name.to_string(),
        url,
        source,
    })
}

enum DownloadError {
    Http(reqwest::Error),
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn download(
    url: &str,
    dest: &Path,
    progress: Option<&ProgressFn>,
) -> Result<(), DownloadError> {
    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(DownloadError::Http)?;

    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;

    // Write to a temp file first, then rename for atomicity
    let temp_path = dest.with_extension("part");
    let mut file = fs::File::create(&temp_path).map_err(|e| DownloadError::Write {
        path: temp_path.clone(),
        source: e,
    })?;

    let bytes = response.bytes().map_err(DownloadError::Http)?;

    // Report progress in chunks to avoid excessive callbacks
    let chunk_size = 1024 * 1024; // 1MB
    for chunk in bytes.chunks(chunk_size) {
        file.write_all(chunk).map_err(|e| DownloadError::Write {
            path: temp_path.clone(),
            source: e,
        })?;
        downloaded += chunk.len() as u64;
        if let Some(cb) = progress {
            cb(downloaded, total);
        }
    }

    file.flush().map_err(|e| DownloadError::Write {
        path: temp_path.clone(),
        source: e,
    })?;
    drop(file);

    fs::rename(&temp_path, dest).map_err(|e| DownloadError::Write {
        path: dest.to_path_buf(),
        source: e,
    })?;

    Ok(())
}
