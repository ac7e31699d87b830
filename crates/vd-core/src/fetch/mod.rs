//! Directory listing fetch.
//!
//! Uses the curl crate (libcurl) for a plain GET of the listing page. The
//! request runs on a blocking thread; `bounded_fetch` races it against a
//! timer. On timeout the request is not aborted, only its result is dropped.

use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use url::Url;

use crate::error::{Result, VdError};

/// Listing pages larger than this are refused.
const MAX_LISTING_BYTES: usize = 8 * 1024 * 1024;

/// Fetches the text of a directory listing page.
#[async_trait]
pub trait DirectoryFetcher: Send + Sync {
    async fn get_text(&self, url: &Url) -> Result<String>;
}

/// `DirectoryFetcher` over libcurl.
#[derive(Debug, Clone, Default)]
pub struct CurlFetcher;

impl CurlFetcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DirectoryFetcher for CurlFetcher {
    async fn get_text(&self, url: &Url) -> Result<String> {
        let target = url.to_string();
        let outcome = tokio::task::spawn_blocking(move || get(&target)).await;
        match outcome {
            Ok(Ok(body)) => Ok(body),
            Ok(Err(e)) => Err(VdError::Fetch {
                url: url.to_string(),
                reason: format!("{e:#}"),
            }),
            Err(join) => Err(VdError::Fetch {
                url: url.to_string(),
                reason: join.to_string(),
            }),
        }
    }
}

/// Runs `fetch` for at most `timeout`; a late result is ignored.
pub async fn bounded_fetch<F>(url: &Url, timeout: Duration, fetch: F) -> Result<String>
where
    F: Future<Output = Result<String>>,
{
    match tokio::time::timeout(timeout, fetch).await {
        Ok(result) => result,
        Err(_) => Err(VdError::FetchTimeout {
            url: url.to_string(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

/// Blocking GET of `url`; returns the body as (lossy) UTF-8.
/// Call from `spawn_blocking` when used from async code.
pub fn get(url: &str) -> AnyResult<String> {
    let mut body: Vec<u8> = Vec::new();
    let mut too_large = false;

    let mut easy = curl::easy::Easy::new();
    easy.url(url).context("invalid URL")?;
    easy.get(true)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(Duration::from_secs(15))?;
    easy.timeout(Duration::from_secs(30))?;

    let performed = {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            if body.len() + data.len() > MAX_LISTING_BYTES {
                too_large = true;
                return Ok(0);
            }
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()
    };
    if too_large {
        anyhow::bail!("listing larger than {} bytes", MAX_LISTING_BYTES);
    }
    performed.context("GET request failed")?;

    let code = easy.response_code().context("no response code")?;
    if !(200..300).contains(&code) {
        anyhow::bail!("GET {} returned HTTP {}", url, code);
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://host.io/path/").unwrap()
    }

    #[tokio::test]
    async fn slow_fetch_times_out() {
        let err = bounded_fetch(
            &url(),
            Duration::from_millis(20),
            std::future::pending::<Result<String>>(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, VdError::FetchTimeout { timeout_ms: 20, .. }));
        assert!(!err.notify_user());
    }

    #[tokio::test]
    async fn fast_fetch_passes_through() {
        let body = bounded_fetch(&url(), Duration::from_secs(1), async {
            Ok("<a href=\"f\">f</a>".to_string())
        })
        .await
        .unwrap();
        assert!(body.contains("href"));

        let err = bounded_fetch(&url(), Duration::from_secs(1), async {
            Err(VdError::Fetch {
                url: "https://host.io/path/".to_string(),
                reason: "HTTP 404".to_string(),
            })
        })
        .await
        .unwrap_err();
        assert!(matches!(err, VdError::Fetch { .. }));
    }

    #[tokio::test]
    async fn refused_connection_is_fetch_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let target = Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap();
        let err = CurlFetcher::new().get_text(&target).await.unwrap_err();
        assert!(matches!(err, VdError::Fetch { .. }));
    }
}
