
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use url::Url;

use crate::metadata::{FetchError, PageSource};

/// In-memory page source: canned responses keyed by exact URL, anything
/// else fails with a network error. Records every URL it was asked for.
#[derive(Default)]
pub struct ScriptedSource {
    pages: HashMap<String, Result<String, FetchError>>,
    calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), Ok(html.to_string()));
        self
    }

    pub fn failing(mut self, url: &str, err: FetchError) -> Self {
        self.pages.insert(url.to_string(), Err(err));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageSource for ScriptedSource {
    async fn fetch_html(&self, url: &Url) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(url.to_string());

        self.pages
            .get(url.as_str())
            .cloned()
            .unwrap_or_else(|| Err(FetchError::Network("connection refused".into())))
    }
}

pub fn og_page(title: &str, description: &str) -> String {
    format!(
        r#"<html><head>
            <meta property="og:title" content="{title}">
            <meta property="og:description" content="{description}">
            <meta property="og:type" content="article">
        </head><body></body></html>"#
    )
}
