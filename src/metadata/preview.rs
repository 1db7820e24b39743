use serde::{Deserialize, Serialize};

use crate::metadata::fallback;
use crate::metadata::types::UrlMetadata;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationType {
    Article,
    Video,
    Audio,
    Social,
    Professional,
    Publication,
}

impl PublicationType {
    pub fn label(self) -> &'static str {
        match self {
            PublicationType::Article => "Article",
            PublicationType::Video => "Video",
            PublicationType::Audio => "Audio",
            PublicationType::Social => "Social post",
            PublicationType::Professional => "Professional profile",
            PublicationType::Publication => "Publication",
        }
    }

    /// Known platforms decide first, then the page's own `og:type`.
    pub fn classify(page_type: &str, domain: &str) -> Self {
        if let Some(kind) = fallback::known_type(domain).and_then(Self::from_type) {
            return kind;
        }
        Self::from_type(page_type).unwrap_or(PublicationType::Publication)
    }

    fn from_type(page_type: &str) -> Option<Self> {
        let page_type = page_type.trim().to_ascii_lowercase();
        let kind = match page_type.as_str() {
            "article" | "blog" | "newsarticle" => PublicationType::Article,
            "social" => PublicationType::Social,
            "professional" | "profile" => PublicationType::Professional,
            "audio" => PublicationType::Audio,
            "video" => PublicationType::Video,
            t if t.starts_with("video.") => PublicationType::Video,
            t if t.starts_with("music.") => PublicationType::Audio,
            _ => return None,
        };
        Some(kind)
    }
}

/// Display-ready fields for a link card. Missing image or favicon is `None`
/// so the renderer can skip the image or show a generic icon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewCard {
    pub url: String,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub domain: String,
    pub favicon: Option<String>,
    pub site_label: String,
    pub publication_type: PublicationType,
    pub publication_label: String,
}

impl From<&UrlMetadata> for PreviewCard {
    fn from(meta: &UrlMetadata) -> Self {
        let publication_type = PublicationType::classify(&meta.page_type, &meta.domain);

        // a raw domain as site name reads worse than the curated outlet name
        let site_label = match fallback::known_site(&meta.domain) {
            Some(info) if meta.site_name.is_empty() || meta.site_name == meta.domain => {
                info.site_name
            }
            _ if meta.site_name.is_empty() => meta.domain.clone(),
            _ => meta.site_name.clone(),
        };

        let description = if meta.description.is_empty() {
            format!("Published on {}", meta.domain)
        } else {
            meta.description.clone()
        };

        PreviewCard {
            url: meta.url.clone(),
            title: meta.title.clone(),
            description,
            image: Some(meta.image.clone()).filter(|i| !i.is_empty()),
            domain: meta.domain.clone(),
            favicon: Some(meta.favicon.clone()).filter(|f| !f.is_empty()),
            site_label,
            publication_type,
            publication_label: publication_type.label().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(domain: &str, page_type: &str) -> UrlMetadata {
        UrlMetadata {
            title: "Title".into(),
            description: "Desc".into(),
            image: String::new(),
            url: format!("https://{domain}/x"),
            domain: domain.into(),
            favicon: format!("https://{domain}/favicon.ico"),
            site_name: domain.into(),
            page_type: page_type.into(),
            author: None,
            published_time: None,
            modified_time: None,
            tags: None,
        }
    }

    #[test]
    fn test_platform_overrides_page_type() {
        let card = PreviewCard::from(&meta("youtube.com", "website"));
        assert_eq!(card.publication_type, PublicationType::Video);
        assert_eq!(card.publication_label, "Video");
        assert_eq!(card.site_label, "YouTube");

        let card = PreviewCard::from(&meta("open.spotify.com", "music.song"));
        assert_eq!(card.publication_type, PublicationType::Audio);
    }

    #[test]
    fn test_og_type_classification() {
        assert_eq!(PublicationType::classify("article", "foo.test"), PublicationType::Article);
        assert_eq!(PublicationType::classify("video.movie", "foo.test"), PublicationType::Video);
        assert_eq!(PublicationType::classify("music.album", "foo.test"), PublicationType::Audio);
        assert_eq!(PublicationType::classify("profile", "foo.test"), PublicationType::Professional);
        assert_eq!(PublicationType::classify("website", "foo.test"), PublicationType::Publication);
        assert_eq!(PublicationType::classify("", "foo.test"), PublicationType::Publication);
    }

    #[test]
    fn test_missing_image_and_favicon_are_none() {
        let mut m = meta("foo.test", "website");
        m.favicon.clear();
        let card = PreviewCard::from(&m);
        assert_eq!(card.image, None);
        assert_eq!(card.favicon, None);
    }

    #[test]
    fn test_curated_site_label_replaces_domain() {
        let card = PreviewCard::from(&meta("theguardian.com", "article"));
        assert_eq!(card.site_label, "The Guardian");
        assert_eq!(card.publication_type, PublicationType::Article);

        let mut m = meta("theguardian.com", "article");
        m.site_name = "the Guardian".into();
        assert_eq!(PreviewCard::from(&m).site_label, "the Guardian");
    }

    #[test]
    fn test_empty_description_gets_placeholder() {
        let mut m = meta("foo.test", "website");
        m.description.clear();
        assert_eq!(PreviewCard::from(&m).description, "Published on foo.test");
    }

    #[test]
    fn test_card_serializes_camel_case() {
        let card = PreviewCard::from(&meta("foo.test", "article"));
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["publicationType"], "article");
        assert_eq!(json["publicationLabel"], "Article");
        assert_eq!(json["siteLabel"], "foo.test");
        assert!(json["image"].is_null());
    }
}
