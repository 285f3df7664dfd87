//! Fetching the stdlib archive.

use crate::error::FetchError;
use futures::future::{FutureExt, LocalBoxFuture};
use std::io::Read;
use std::path::Path;

/// Source of archive bytes for `load-classlib`.
///
/// Returns a boxed local future so the fetch can suspend the single
/// pipeline without requiring `Send`.
pub trait Fetcher {
    /// Fetches the full contents at `url`.
    fn fetch<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, Result<Vec<u8>, FetchError>>;
}

/// Fetches `http://` and `https://` URLs over the network and `file://`
/// URLs or bare paths from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct UrlFetcher;

impl Fetcher for UrlFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, Result<Vec<u8>, FetchError>> {
        fetch_url(url).boxed_local()
    }
}

/// Fetches `url` according to its scheme.
pub async fn fetch_url(url: &str) -> Result<Vec<u8>, FetchError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        let owned = url.to_string();
        tokio::task::spawn_blocking(move || http_get(&owned))
            .await
            .map_err(|e| FetchError::Http {
                url: url.to_string(),
                reason: e.to_string(),
            })?
    } else if let Some(path) = url.strip_prefix("file://") {
        read_file(Path::new(path)).await
    } else if url.contains("://") {
        Err(FetchError::UnsupportedScheme(url.to_string()))
    } else {
        read_file(Path::new(url)).await
    }
}

fn http_get(url: &str) -> Result<Vec<u8>, FetchError> {
    let http_error = |reason: String| FetchError::Http {
        url: url.to_string(),
        reason,
    };
    let resp = ureq::get(url).call().map_err(|e| http_error(e.to_string()))?;
    let mut reader = resp.into_body().into_reader();
    let mut buf = Vec::new();
    reader
        .read_to_end(&mut buf)
        .map_err(|e| http_error(e.to_string()))?;
    log::debug!("fetched {} bytes from {url}", buf.len());
    Ok(buf)
}

async fn read_file(path: &Path) -> Result<Vec<u8>, FetchError> {
    tokio::fs::read(path).await.map_err(|source| FetchError::File {
        path: path.to_path_buf(),
        source,
    })
}
