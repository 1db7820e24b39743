use serde::{Deserialize, Serialize};

/// Normalized link preview record. Built fresh for every fetch and never
/// mutated once it has been handed to the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlMetadata {
    pub title: String,
    pub description: String,
    pub image: String,
    /// The URL the caller asked for, never the variant that answered.
    pub url: String,
    pub domain: String,
    pub favicon: String,
    pub site_name: String,
    #[serde(rename = "type")]
    pub page_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Fields pulled out of one HTML document. Only produced when at least one
/// of title, description or image is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    pub image: String,
    pub site_name: String,
    pub page_type: String,
    pub author: String,
    pub published_time: String,
    pub modified_time: String,
    pub tags: Vec<String>,
}

impl PageMetadata {
    pub fn has_any_data(&self) -> bool {
        !self.title.is_empty() || !self.description.is_empty() || !self.image.is_empty()
    }
}

/// Outcome of a metadata lookup. Every variant carries a complete record;
/// the variant only tells the boundary how it was obtained.
#[derive(Debug, Clone)]
pub enum Extraction {
    /// A variant was fetched and parsed into usable data.
    Live {
        metadata: UrlMetadata,
        variant: String,
        report: MetadataReport,
    },
    /// Every variant failed or had no data; the knowledge base answered.
    Fallback {
        metadata: UrlMetadata,
        report: MetadataReport,
    },
    /// Served from the cache without touching the network.
    Cached { metadata: UrlMetadata },
    /// The requested URL could not be parsed, so no domain could be derived.
    InvalidUrl {
        metadata: UrlMetadata,
        error: url::ParseError,
    },
}

impl Extraction {
    pub fn metadata(&self) -> &UrlMetadata {
        match self {
            Extraction::Live { metadata, .. }
            | Extraction::Fallback { metadata, .. }
            | Extraction::Cached { metadata }
            | Extraction::InvalidUrl { metadata, .. } => metadata,
        }
    }

    pub fn into_metadata(self) -> UrlMetadata {
        match self {
            Extraction::Live { metadata, .. }
            | Extraction::Fallback { metadata, .. }
            | Extraction::Cached { metadata }
            | Extraction::InvalidUrl { metadata, .. } => metadata,
        }
    }

    pub fn report(&self) -> Option<&MetadataReport> {
        match self {
            Extraction::Live { report, .. } | Extraction::Fallback { report, .. } => Some(report),
            Extraction::Cached { .. } | Extraction::InvalidUrl { .. } => None,
        }
    }

    pub fn outcome(&self) -> &'static str {
        match self {
            Extraction::Live { .. } => "live",
            Extraction::Fallback { .. } => "fallback",
            Extraction::Cached { .. } => "cached",
            Extraction::InvalidUrl { .. } => "invalid_url",
        }
    }

    /// Results worth remembering. Invalid input is cheap to recompute.
    pub fn is_cacheable(&self) -> bool {
        matches!(self, Extraction::Live { .. } | Extraction::Fallback { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetadataReport {
    pub attempts: Vec<AttemptReport>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptReport {
    pub url: String,
    pub status: AttemptStatus,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail")]
pub enum AttemptStatus {
    Success,
    NoData,
    Error(String),
}
