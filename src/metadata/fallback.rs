//! Static knowledge about well-known publishers, used when live extraction
//! gives nothing usable.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::metadata::normalize::{domain_of, favicon_of};
use crate::metadata::types::UrlMetadata;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteInfo {
    pub site_name: String,
    pub description: String,
}

struct KnownSite {
    domain: &'static str,
    name: &'static str,
    description: &'static str,
    page_type: &'static str,
}

const fn site(domain: &'static str, name: &'static str, description: &'static str) -> KnownSite {
    KnownSite {
        domain,
        name,
        description,
        page_type: "website",
    }
}

const fn platform(
    domain: &'static str,
    name: &'static str,
    description: &'static str,
    page_type: &'static str,
) -> KnownSite {
    KnownSite {
        domain,
        name,
        description,
        page_type,
    }
}

// Longer, more specific domains must come before any entry they end with.
const KNOWN_SITES: &[KnownSite] = &[
    site("amazoniavox.com", "Amazônia Vox", "Jornalismo independente da Amazônia"),
    site("infoamazonia.org", "InfoAmazônia", "Rede de jornalismo investigativo"),
    site("agenciaamapa.com.br", "Agência Amapá", "Notícias do Amapá"),
    site("jornalismoagcom.com", "Jornalismo AGCom", "Comunicação e jornalismo"),
    site("g1.globo.com", "G1", "Portal de notícias da Globo"),
    site("folha.uol.com.br", "Folha de S.Paulo", "Jornal Folha de S.Paulo"),
    site("estadao.com.br", "O Estado de S. Paulo", "Estadão"),
    site("bbc.co.uk", "BBC", "BBC News"),
    site("bbc.com", "BBC", "BBC News"),
    site("cnn.com", "CNN", "CNN News"),
    site("nytimes.com", "The New York Times", "The New York Times"),
    site("washingtonpost.com", "The Washington Post", "The Washington Post"),
    site("theguardian.com", "The Guardian", "The Guardian"),
    site("reuters.com", "Reuters", "Reuters News"),
    site("apnews.com", "Associated Press", "AP News"),
    site("ap.news", "Associated Press", "AP News"),
    site("theatlantic.com", "The Atlantic", "The Atlantic"),
    site("newyorker.com", "The New Yorker", "The New Yorker"),
    site("wired.com", "WIRED", "WIRED"),
    site("vox.com", "Vox", "Vox"),
    site("medium.com", "Medium", "Read this article on Medium"),
    site("substack.com", "Substack", "Newsletter on Substack"),
    site("dev.to", "Dev.to", "Read this article on Dev.to"),
    site("arxiv.org", "arXiv", "Academic paper on arXiv"),
    site("researchgate.net", "ResearchGate", "Academic publication on ResearchGate"),
    platform("twitter.com", "X (Twitter)", "View this post on X", "social"),
    platform("x.com", "X (Twitter)", "View this post on X", "social"),
    platform("instagram.com", "Instagram", "View this post on Instagram", "social"),
    platform("linkedin.com", "LinkedIn", "Professional profile on LinkedIn", "professional"),
    platform("youtube.com", "YouTube", "Watch this video on YouTube", "video"),
    platform("youtu.be", "YouTube", "Watch this video on YouTube", "video"),
    platform("spotify.com", "Spotify", "Listen on Spotify", "audio"),
];

static YOUTUBE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:https?://)?(?:www\.|m\.)?(?:youtube\.com/watch\?(?:.*&)?v=|youtu\.be/|youtube\.com/shorts/)([A-Za-z0-9_-]{11})",
    )
    .expect("Failed to compile YouTube regex")
});

fn find_site(domain: &str) -> Option<&'static KnownSite> {
    let domain = domain.to_ascii_lowercase();
    let domain = domain.strip_prefix("www.").unwrap_or(&domain);

    KNOWN_SITES
        .iter()
        .find(|s| s.domain == domain)
        .or_else(|| {
            // subdomains such as news.bbc.co.uk or mobile.twitter.com
            KNOWN_SITES.iter().find(|s| {
                domain
                    .strip_suffix(s.domain)
                    .is_some_and(|prefix| prefix.ends_with('.'))
            })
        })
}

/// Curated site information for `domain`, or `None` when the domain is not
/// in the table.
pub fn known_site(domain: &str) -> Option<SiteInfo> {
    find_site(domain).map(|s| SiteInfo {
        site_name: s.name.to_string(),
        description: s.description.to_string(),
    })
}

/// Content classification for known platforms (`social`, `video`, ...).
pub fn known_type(domain: &str) -> Option<&'static str> {
    find_site(domain)
        .map(|s| s.page_type)
        .filter(|t| *t != "website")
}

/// Site name and description for `domain`. Unknown domains get the domain
/// itself and a generic description.
pub fn lookup(domain: &str) -> SiteInfo {
    known_site(domain).unwrap_or_else(|| SiteInfo {
        site_name: domain.to_string(),
        description: format!("Content from {domain}"),
    })
}

/// Fully populated record for `requested` built without any network access.
pub fn fallback_record(parsed: &Url, requested: &str) -> UrlMetadata {
    let domain = domain_of(parsed);
    let info = lookup(&domain);

    let title = if known_site(&domain).is_some() {
        info.site_name.clone()
    } else {
        format!("Visit {domain}")
    };

    let mut record = UrlMetadata {
        title,
        description: info.description,
        image: String::new(),
        url: requested.to_string(),
        favicon: favicon_of(parsed),
        site_name: info.site_name,
        page_type: known_type(&domain).unwrap_or("website").to_string(),
        domain,
        author: None,
        published_time: None,
        modified_time: None,
        tags: None,
    };

    apply_path_hints(&mut record, parsed);
    record
}

/// Record for input that is not a URL at all. There is no domain to derive,
/// so the raw string stands in for it in the human-readable fields.
pub fn invalid_record(requested: &str) -> UrlMetadata {
    let label = requested.trim();
    UrlMetadata {
        title: format!("Visit {label}"),
        description: format!("Content from {label}"),
        image: String::new(),
        url: requested.to_string(),
        domain: String::new(),
        favicon: String::new(),
        site_name: label.to_string(),
        page_type: "website".to_string(),
        author: None,
        published_time: None,
        modified_time: None,
        tags: None,
    }
}

/// URL shapes we can describe without fetching anything.
fn apply_path_hints(record: &mut UrlMetadata, parsed: &Url) {
    if record.domain == "github.com" {
        let segments: Vec<&str> = parsed
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).collect())
            .unwrap_or_default();
        if let [owner, repo, ..] = segments.as_slice() {
            record.title = format!("{owner}/{repo}");
            record.description = "GitHub Repository".to_string();
            record.site_name = "GitHub".to_string();
            record.image = format!("https://opengraph.githubassets.com/1/{owner}/{repo}");
        }
        return;
    }

    if let Some(video_id) = youtube_video_id(parsed.as_str()) {
        record.image = format!("https://img.youtube.com/vi/{video_id}/hqdefault.jpg");
    }
}

pub fn youtube_video_id(url: &str) -> Option<String> {
    YOUTUBE_REGEX
        .captures(url)
        .and_then(|caps| caps.get(1).map(|m| m.as_str().to_owned()))
}
