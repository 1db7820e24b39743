pub mod cache;
pub mod extract;
pub mod fallback;
pub mod fetcher;
pub mod normalize;
pub mod preview;
pub mod service;
pub mod types;

pub use cache::MetadataCache;
pub use fetcher::{FetchError, MetadataFetcher, PageSource};
pub use preview::PreviewCard;
pub use service::MetadataService;
pub use types::{AttemptStatus, Extraction, UrlMetadata};

/// Log how a lookup went. Called by the HTTP and CLI boundaries, the
/// extraction core itself stays silent.
pub fn log_outcome(requested: &str, extraction: &Extraction) {
    if let Some(report) = extraction.report() {
        for attempt in &report.attempts {
            match &attempt.status {
                AttemptStatus::Success => {
                    log::debug!("{}: ok in {}ms", attempt.url, attempt.duration_ms)
                }
                AttemptStatus::NoData => {
                    log::debug!("{}: no usable metadata", attempt.url)
                }
                AttemptStatus::Error(err) => {
                    log::warn!("{}: {err}", attempt.url)
                }
            }
        }
    }

    match extraction {
        Extraction::Live {
            variant, report, ..
        } => {
            log::info!(
                "metadata for {requested} fetched from {variant} in {}ms",
                report.duration_ms
            );
        }
        Extraction::Fallback { report, .. } => {
            log::warn!(
                "all {} variants failed for {requested}, using fallback",
                report.attempts.len()
            );
        }
        Extraction::Cached { .. } => {
            log::debug!("metadata for {requested} served from cache");
        }
        Extraction::InvalidUrl { error, .. } => {
            log::warn!("invalid url {requested:?}: {error}");
        }
    }
}
