use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use url::Url;

use crate::metadata::extract::parse_page;
use crate::metadata::fallback;
use crate::metadata::normalize::{domain_of, favicon_of, url_variants};
use crate::metadata::types::{
    AttemptReport, AttemptStatus, Extraction, MetadataReport, PageMetadata, UrlMetadata,
};

/// Why a single variant produced no HTML. All of these are recovered by
/// moving on to the next variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("blocked by url policy: {0}")]
    Blocked(String),

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("empty response body")]
    EmptyBody,

    #[error("not an html document: {0}")]
    NotHtml(String),
}

/// Where page HTML comes from. The live implementation lives in `scrape`.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// GET `url` and return the body of a successful response. Implementations
    /// must bound the time spent on one call.
    async fn fetch_html(&self, url: &Url) -> Result<String, FetchError>;
}

/// Parse a requested URL. Addresses without a host (`mailto:`, `data:`,
/// `javascript:`) are rejected like unparsable input.
pub fn parse_requested(requested: &str) -> Result<Url, url::ParseError> {
    let parsed = Url::parse(requested)?;
    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(parsed),
        _ => Err(url::ParseError::EmptyHost),
    }
}

/// Tries each URL variant in order and stops at the first one that parses
/// into usable data; otherwise builds a fallback record.
#[derive(Clone)]
pub struct MetadataFetcher {
    source: Arc<dyn PageSource>,
}

impl MetadataFetcher {
    pub fn new(source: Arc<dyn PageSource>) -> Self {
        Self { source }
    }

    /// Never fails: transient errors are recorded in the report and the
    /// knowledge base answers when nothing else does.
    pub async fn fetch(&self, requested: &str) -> Extraction {
        let parsed = match parse_requested(requested) {
            Ok(u) => u,
            Err(error) => {
                return Extraction::InvalidUrl {
                    metadata: fallback::invalid_record(requested),
                    error,
                }
            }
        };

        let started = Instant::now();
        let mut report = MetadataReport::default();

        // variants are tried one after another, never in parallel
        for variant in url_variants(requested) {
            let attempt_started = Instant::now();
            let result = self.try_variant(&variant).await;
            let duration_ms = elapsed_ms(attempt_started);

            match result {
                Ok(page) => {
                    report.attempts.push(AttemptReport {
                        url: variant.clone(),
                        status: AttemptStatus::Success,
                        duration_ms,
                    });
                    report.duration_ms = elapsed_ms(started);

                    return Extraction::Live {
                        metadata: live_record(&parsed, requested, page),
                        variant,
                        report,
                    };
                }
                Err(status) => report.attempts.push(AttemptReport {
                    url: variant,
                    status,
                    duration_ms,
                }),
            }
        }

        report.duration_ms = elapsed_ms(started);
        Extraction::Fallback {
            metadata: fallback::fallback_record(&parsed, requested),
            report,
        }
    }

    async fn try_variant(&self, variant: &str) -> Result<PageMetadata, AttemptStatus> {
        let url = Url::parse(variant).map_err(|e| AttemptStatus::Error(e.to_string()))?;

        let html = self
            .source
            .fetch_html(&url)
            .await
            .map_err(|e| AttemptStatus::Error(e.to_string()))?;

        match parse_page(&html, &url) {
            Some(page) => Ok(page),
            None => Err(AttemptStatus::NoData),
        }
    }
}

/// Combine parsed page data with the fields derived from the requested URL.
fn live_record(parsed: &Url, requested: &str, page: PageMetadata) -> UrlMetadata {
    let domain = domain_of(parsed);

    let title = if page.title.is_empty() {
        format!("Visit {domain}")
    } else {
        page.title
    };
    let site_name = if page.site_name.is_empty() {
        domain.clone()
    } else {
        page.site_name
    };

    UrlMetadata {
        title,
        description: page.description,
        image: page.image,
        url: requested.to_string(),
        favicon: favicon_of(parsed),
        site_name,
        page_type: page.page_type,
        domain,
        author: non_empty(page.author),
        published_time: non_empty(page.published_time),
        modified_time: non_empty(page.modified_time),
        tags: if page.tags.is_empty() {
            None
        } else {
            Some(page.tags)
        },
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis().try_into().unwrap_or(u64::MAX)
}
