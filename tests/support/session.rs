//! Scripted render sessions and page builders.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use v2dl_core::fetch::{RenderError, RenderSession, RenderedPage};

pub const BASE: &str = "https://www.v2ph.com";

/// Serves fixed pages by URL and logs every render.
///
/// URLs without a page are answered with a 404 status error.
#[derive(Default)]
pub struct SiteSession {
    pages: HashMap<String, RenderedPage>,
    rendered: Mutex<Vec<String>>,
}

impl SiteSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn page(mut self, url: impl Into<String>, content: impl Into<String>) -> Self {
        self.pages
            .insert(url.into(), RenderedPage::content(content));
        self
    }

    #[must_use]
    pub fn hard_block(mut self, url: impl Into<String>) -> Self {
        self.pages.insert(
            url.into(),
            RenderedPage {
                content: "<html><head><title>Attention Required! | Cloudflare</title></head></html>"
                    .to_string(),
                blocked_simple: false,
                blocked_hard: false,
            },
        );
        self
    }

    #[must_use]
    pub fn challenge(mut self, url: impl Into<String>) -> Self {
        self.pages.insert(
            url.into(),
            RenderedPage::content("<html><head><title>Just a moment...</title></head></html>"),
        );
        self
    }

    pub fn rendered(&self) -> Vec<String> {
        self.rendered.lock().unwrap().clone()
    }

    pub fn render_count(&self) -> usize {
        self.rendered.lock().unwrap().len()
    }
}

#[async_trait]
impl RenderSession for SiteSession {
    async fn render(&self, url: &str) -> Result<RenderedPage, RenderError> {
        self.rendered.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| RenderError::status(url, 404))
    }
}

/// Album page markup: `(data-src, alt)` pairs plus pagination up to `last_page`.
#[must_use]
pub fn album_page(images: &[(&str, Option<&str>)], last_page: u32) -> String {
    let imgs: String = images
        .iter()
        .map(|(src, alt)| match alt {
            Some(alt) => {
                format!(r#"<div class="album-photo my-2"><img data-src="{src}" alt="{alt}"></div>"#)
            }
            None => format!(r#"<div class="album-photo my-2"><img data-src="{src}"></div>"#),
        })
        .collect();
    format!(
        "<html><head><title>Album</title></head><body>{imgs}{}</body></html>",
        pagination(last_page)
    )
}

/// Listing page markup with one cover link per album href.
#[must_use]
pub fn listing_page(albums: &[&str], last_page: u32) -> String {
    let links: String = albums
        .iter()
        .map(|href| format!(r#"<a class="media-cover" href="{href}"><img></a>"#))
        .collect();
    format!(
        "<html><head><title>Listing</title></head><body>{links}{}</body></html>",
        pagination(last_page)
    )
}

fn pagination(last_page: u32) -> String {
    let items: String = (1..=last_page)
        .map(|p| format!(r#"<li class="page-item"><a class="page-link" href="?page={p}">{p}</a></li>"#))
        .collect();
    format!(
        r#"<ul class="pagination">{items}<li class="page-item"><a class="page-link" href="?page={last_page}">Last</a></li></ul>"#
    )
}
