//! Plain-HTTP [`RenderSession`] backed by reqwest.
//!
//! Does not execute scripts, so it cannot clear challenges by itself; it
//! relies on the cookie store to carry clearance cookies between requests and
//! returns block pages as content so the fetcher can classify them.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, DNT, HeaderMap, HeaderValue, REFERER, UPGRADE_INSECURE_REQUESTS,
};
use tracing::{debug, instrument};

use super::block::looks_blocked;
use super::session::{RenderError, RenderSession, RenderedPage};
use crate::download::constants::{
    ACCEPT_LANGUAGE as ACCEPT_LANGUAGE_VALUE, CONNECT_TIMEOUT_SECS, PAGE_ACCEPT,
    RENDER_TIMEOUT_SECS,
};
use crate::user_agent::{self, SEARCH_REFERER};

/// Page loader that issues one GET per render.
#[derive(Debug, Clone)]
pub struct HttpRenderSession {
    client: Client,
}

impl HttpRenderSession {
    /// Creates a session with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns the builder error if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeouts(CONNECT_TIMEOUT_SECS, RENDER_TIMEOUT_SECS)
    }

    /// Creates a session with explicit timeouts.
    ///
    /// # Errors
    ///
    /// Returns the builder error if the TLS backend cannot be initialized.
    #[instrument(level = "debug")]
    pub fn with_timeouts(connect_timeout_secs: u64, read_timeout_secs: u64) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .cookie_store(true)
            .user_agent(user_agent::browser_user_agent())
            .default_headers(page_headers())
            .build()?;
        Ok(Self { client })
    }
}

fn page_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(PAGE_ACCEPT));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));
    headers.insert(REFERER, HeaderValue::from_static(SEARCH_REFERER));
    headers.insert(DNT, HeaderValue::from_static("1"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers
}

fn map_reqwest_error(url: &str, error: &reqwest::Error) -> RenderError {
    if error.is_timeout() {
        RenderError::timeout(url)
    } else {
        RenderError::transport(url, error.to_string())
    }
}

#[async_trait]
impl RenderSession for HttpRenderSession {
    #[instrument(skip(self))]
    async fn render(&self, url: &str) -> Result<RenderedPage, RenderError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, &e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(url, &e))?;

        // Cloudflare serves its block pages with 403/503; those still need classifying.
        if status.is_success() || looks_blocked(&body) {
            debug!(status = status.as_u16(), bytes = body.len(), "page loaded");
            Ok(RenderedPage::content(body))
        } else {
            Err(RenderError::status(url, status.as_u16()))
        }
    }
}
