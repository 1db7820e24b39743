use std::collections::HashMap;

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

use crate::metadata::types::PageMetadata;

static META_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta").expect("Failed to compile meta selector"));
static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("Failed to compile title selector"));
static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("link[rel]").expect("Failed to compile link selector"));
static IMG_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img").expect("Failed to compile img selector"));

const TITLE_KEYS: &[&str] = &["og:title", "twitter:title"];
const DESCRIPTION_KEYS: &[&str] = &["og:description", "twitter:description", "description"];
const IMAGE_KEYS: &[&str] = &[
    "og:image",
    "og:image:secure_url",
    "twitter:image",
    "twitter:image:src",
];
const AUTHOR_KEYS: &[&str] = &["author", "article:author"];
const PUBLISHED_KEYS: &[&str] = &["article:published_time", "article:published"];
const MODIFIED_KEYS: &[&str] = &["article:modified_time", "article:modified"];

/// Lazy-load attributes are checked before `src`, which often holds a placeholder.
const IMG_ATTRS: &[&str] = &["data-src", "data-original", "data-lazy-src", "src"];

/// Meta tag contents keyed by lowercased `property`/`name`, first non-empty wins.
#[derive(Default)]
struct MetaTags {
    named: HashMap<String, String>,
    itemprop: HashMap<String, String>,
    tags: Vec<String>,
}

impl MetaTags {
    fn collect(document: &Html) -> Self {
        let mut meta = MetaTags::default();

        for element in document.select(&META_SELECTOR) {
            let el = element.value();
            let content = match el.attr("content").map(str::trim) {
                Some(c) if !c.is_empty() => c,
                _ => continue,
            };

            for key in [el.attr("property"), el.attr("name")].into_iter().flatten() {
                let key = key.trim().to_ascii_lowercase();
                if key == "article:tag" {
                    let tag = collapse_whitespace(content);
                    if !meta.tags.contains(&tag) {
                        meta.tags.push(tag);
                    }
                    break;
                }
                meta.named.entry(key).or_insert_with(|| content.to_string());
            }

            if let Some(key) = el.attr("itemprop") {
                meta.itemprop
                    .entry(key.trim().to_ascii_lowercase())
                    .or_insert_with(|| content.to_string());
            }
        }

        meta
    }

    fn first(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .find_map(|key| self.named.get(*key))
            .map(String::as_str)
    }
}

/// Extract preview fields from `html` fetched from `source`.
///
/// Returns `None` when the page has no title, description or image, so the
/// caller can move on to the next URL variant. Malformed markup is parsed
/// best-effort by html5ever and never causes an error.
pub fn parse_page(html: &str, source: &Url) -> Option<PageMetadata> {
    let document = Html::parse_document(html);
    let meta = MetaTags::collect(&document);

    let title = meta
        .first(TITLE_KEYS)
        .map(collapse_whitespace)
        .filter(|t| !t.is_empty())
        .or_else(|| title_element(&document))
        .unwrap_or_default();

    let description = meta
        .first(DESCRIPTION_KEYS)
        .map(collapse_whitespace)
        .unwrap_or_default();

    let image = image_candidate(&document, &meta)
        .and_then(|raw| resolve_url(source, &raw))
        .unwrap_or_default();

    let page = PageMetadata {
        title,
        description,
        image,
        site_name: meta
            .first(&["og:site_name"])
            .map(collapse_whitespace)
            .unwrap_or_default(),
        page_type: meta
            .first(&["og:type"])
            .map(|t| t.trim().to_string())
            .unwrap_or_else(|| "website".to_string()),
        author: meta
            .first(AUTHOR_KEYS)
            .map(collapse_whitespace)
            .unwrap_or_default(),
        published_time: meta
            .first(PUBLISHED_KEYS)
            .map(|t| t.trim().to_string())
            .unwrap_or_default(),
        modified_time: meta
            .first(MODIFIED_KEYS)
            .map(|t| t.trim().to_string())
            .unwrap_or_default(),
        tags: meta.tags,
    };

    if page.has_any_data() {
        Some(page)
    } else {
        None
    }
}

fn title_element(document: &Html) -> Option<String> {
    document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
}

fn image_candidate(document: &Html, meta: &MetaTags) -> Option<String> {
    if let Some(image) = meta.first(IMAGE_KEYS) {
        return Some(image.to_string());
    }

    if let Some(image) = meta.itemprop.get("image") {
        return Some(image.clone());
    }

    let image_src = document.select(&LINK_SELECTOR).find_map(|el| {
        let el = el.value();
        let rel = el.attr("rel").unwrap_or_default();
        let is_image_src = rel
            .split_ascii_whitespace()
            .any(|r| r.eq_ignore_ascii_case("image_src"));
        if !is_image_src {
            return None;
        }
        el.attr("href").map(str::trim).filter(|h| !h.is_empty())
    });
    if let Some(href) = image_src {
        return Some(href.to_string());
    }

    // first image on the page, per attribute, in document order
    IMG_ATTRS.iter().find_map(|attr| {
        document.select(&IMG_SELECTOR).find_map(|el| {
            el.value()
                .attr(attr)
                .map(str::trim)
                .filter(|src| !src.is_empty() && !src.starts_with("data:"))
                .map(str::to_string)
        })
    })
}

/// Resolve a possibly relative or protocol-relative reference against the
/// page it came from. Anything that does not end up as http(s) is dropped.
pub fn resolve_url(base: &Url, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    base.join(raw)
        .ok()
        .filter(|resolved| matches!(resolved.scheme(), "http" | "https"))
        .map(String::from)
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
