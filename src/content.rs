//! Typed view of the CMS export the site renders from.
//!
//! Entries are decoded once, up front, into one variant per content kind so
//! that nothing downstream has to poke at untyped field maps.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

#[derive(thiserror::Error, Debug)]
pub enum ContentError {
    #[error("export is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("entry {id} ({content_type}): {source}")]
    Entry {
        id: String,
        content_type: String,
        source: serde_json::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}

/// Reference to another entry or asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub sys: LinkSys,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSys {
    pub id: String,
    #[serde(default)]
    pub link_type: Option<String>,
}

impl Link {
    pub fn id(&self) -> &str {
        &self.sys.id
    }
}

/// Rich text document as exported. Only its plain text is interpreted here.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RichText(pub serde_json::Value);

impl RichText {
    pub fn plain_text(&self) -> String {
        fn walk(node: &serde_json::Value, out: &mut String) {
            match node {
                serde_json::Value::String(s) => out.push_str(s),
                serde_json::Value::Object(map) => {
                    if let Some(serde_json::Value::String(text)) = map.get("value") {
                        out.push_str(text);
                    }
                    if let Some(serde_json::Value::Array(children)) = map.get("content") {
                        for child in children {
                            walk(child, out);
                        }
                        if map.get("nodeType").and_then(|t| t.as_str()) == Some("paragraph") {
                            out.push('\n');
                        }
                    }
                }
                _ => {}
            }
        }

        let mut out = String::new();
        walk(&self.0, &mut out);
        out.trim().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BlogPost {
    pub title: String,
    pub slug: String,
    #[serde(deserialize_with = "deserialize_date")]
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: RichText,
    #[serde(default)]
    pub banner: Option<Link>,
    #[serde(default)]
    pub author: Option<Link>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Publication {
    pub title: String,
    #[serde(default)]
    pub links: Option<String>,
    #[serde(default)]
    pub description: RichText,
    #[serde(default)]
    pub banner: Option<Link>,
    #[serde(default, deserialize_with = "deserialize_links")]
    pub tags: Vec<Link>,
}

impl Publication {
    /// Absolute http(s) URLs from the free-form `links` field, in order.
    pub fn link_urls(&self) -> Vec<String> {
        let Some(links) = &self.links else {
            return Vec::new();
        };

        links
            .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter(|s| {
                Url::parse(s)
                    .map(|u| matches!(u.scheme(), "http" | "https"))
                    .unwrap_or(false)
            })
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Gallery {
    #[serde(default)]
    pub photos: Vec<Link>,
    #[serde(default, deserialize_with = "deserialize_links")]
    pub tags: Vec<Link>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct About {
    pub title: String,
    #[serde(default)]
    pub description: RichText,
    #[serde(default, deserialize_with = "deserialize_links")]
    pub banner: Vec<Link>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Experience {
    pub title: String,
    #[serde(default)]
    pub description: RichText,
    #[serde(default)]
    pub img: Option<Link>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    BlogPost(BlogPost),
    Publication(Publication),
    Gallery(Gallery),
    Tag(Tag),
    About(About),
    Experience(Experience),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEntry {
    pub id: String,
    pub entry: Entry,
}

#[derive(Deserialize)]
struct RawExport {
    #[serde(default)]
    items: Vec<RawEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSys {
    #[serde(default)]
    id: String,
    #[serde(default)]
    content_type: Option<Link>,
}

#[derive(Deserialize)]
struct RawEntry {
    sys: RawSys,
    #[serde(default)]
    fields: serde_json::Value,
}

fn decode<T: serde::de::DeserializeOwned>(
    raw: &RawEntry,
    content_type: &str,
) -> Result<T, ContentError> {
    serde_json::from_value(raw.fields.clone()).map_err(|source| ContentError::Entry {
        id: raw.sys.id.clone(),
        content_type: content_type.to_string(),
        source,
    })
}

/// Decode an export. Entries of content types this site does not render
/// are skipped.
pub fn parse_export(json: &str) -> Result<Vec<DecodedEntry>, ContentError> {
    let export: RawExport = serde_json::from_str(json)?;
    let mut entries = Vec::with_capacity(export.items.len());

    for raw in &export.items {
        let content_type = raw
            .sys
            .content_type
            .as_ref()
            .map(|l| l.id())
            .unwrap_or_default();

        let entry = match content_type {
            "blogPost" => Entry::BlogPost(decode(raw, content_type)?),
            "publicacoes" => Entry::Publication(decode(raw, content_type)?),
            "gallery" => Entry::Gallery(decode(raw, content_type)?),
            "tags" => Entry::Tag(decode(raw, content_type)?),
            "about" => Entry::About(decode(raw, content_type)?),
            "experiences" => Entry::Experience(decode(raw, content_type)?),
            other => {
                log::debug!("skipping entry {} of content type '{other}'", raw.sys.id);
                continue;
            }
        };

        entries.push(DecodedEntry {
            id: raw.sys.id.clone(),
            entry,
        });
    }

    Ok(entries)
}

pub fn load_export(path: &std::path::Path) -> Result<Vec<DecodedEntry>, ContentError> {
    let json = std::fs::read_to_string(path).map_err(|source| ContentError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_export(&json)
}

pub fn publications(entries: &[DecodedEntry]) -> impl Iterator<Item = &Publication> {
    entries.iter().filter_map(|e| match &e.entry {
        Entry::Publication(p) => Some(p),
        _ => None,
    })
}

/// `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM` (the CMS date picker) or RFC 3339.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M") {
        return Some(dt.and_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.and_utc());
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn deserialize_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse_date(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognized date '{value}'")))
}

/// Reference fields may hold a single link or a list of them.
fn deserialize_links<'de, D>(deserializer: D) -> Result<Vec<Link>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(Link),
        Many(Vec<Link>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(link)) => vec![link],
        Some(OneOrMany::Many(links)) => links,
        None => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn entry(content_type: &str, id: &str, fields: &str) -> String {
        format!(
            r#"{{"sys":{{"id":"{id}","contentType":{{"sys":{{"id":"{content_type}","linkType":"ContentType"}}}}}},"fields":{fields}}}"#
        )
    }

    fn export(entries: &[String]) -> String {
        format!(r#"{{"items":[{}]}}"#, entries.join(","))
    }

    #[test]
    fn test_parse_dates() {
        let d = parse_date("2024-03-01").unwrap();
        assert_eq!((d.year(), d.month(), d.day(), d.hour()), (2024, 3, 1, 0));

        let d = parse_date("2024-03-01T10:30").unwrap();
        assert_eq!((d.hour(), d.minute()), (10, 30));

        let d = parse_date("2024-03-01T10:30:00-03:00").unwrap();
        assert_eq!(d.hour(), 13);

        assert!(parse_date("March 1st").is_none());
    }

    #[test]
    fn test_decode_mixed_export() {
        let json = export(&[
            entry(
                "blogPost",
                "p1",
                r#"{"title":"Rio","slug":"rio","date":"2024-05-02","description":"On the river","banner":{"sys":{"id":"a1","linkType":"Asset","type":"Link"}}}"#,
            ),
            entry(
                "publicacoes",
                "pub1",
                r#"{"title":"Report","links":"https://www.bbc.com/news/1 https://g1.globo.com/x","tags":{"sys":{"id":"t1"}}}"#,
            ),
            entry("tags", "t1", r#"{"name":"Amazon"}"#),
            entry("gallery", "g1", r#"{"photos":[{"sys":{"id":"a2"}}],"tags":[{"sys":{"id":"t1"}}]}"#),
            entry("author", "x1", r#"{"name":"Someone"}"#),
        ]);

        let entries = parse_export(&json).unwrap();
        assert_eq!(entries.len(), 4);

        match &entries[0].entry {
            Entry::BlogPost(post) => {
                assert_eq!(post.slug, "rio");
                assert_eq!(post.banner.as_ref().map(Link::id), Some("a1"));
                assert_eq!(post.date.day(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }

        let pubs: Vec<_> = publications(&entries).collect();
        assert_eq!(pubs.len(), 1);
        assert_eq!(pubs[0].tags.len(), 1);
        assert_eq!(
            pubs[0].link_urls(),
            vec!["https://www.bbc.com/news/1", "https://g1.globo.com/x"]
        );
    }

    #[test]
    fn test_missing_required_field_names_entry() {
        let json = export(&[entry("blogPost", "broken", r#"{"title":"No slug","date":"2024-01-01"}"#)]);
        let err = parse_export(&json).unwrap_err();
        match err {
            ContentError::Entry { id, content_type, .. } => {
                assert_eq!(id, "broken");
                assert_eq!(content_type, "blogPost");
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn test_bad_date_fails() {
        let json = export(&[entry("blogPost", "p", r#"{"title":"T","slug":"t","date":"soon"}"#)]);
        assert!(parse_export(&json).is_err());
    }

    #[test]
    fn test_link_urls_skip_junk() {
        let publication = Publication {
            title: "t".into(),
            links: Some("see: https://a.test/x,\nhttps://b.test ; ftp://c.test notaurl".into()),
            description: RichText::default(),
            banner: None,
            tags: Vec::new(),
        };
        assert_eq!(publication.link_urls(), vec!["https://a.test/x", "https://b.test"]);
    }

    #[test]
    fn test_rich_text_plain() {
        let doc: RichText = serde_json::from_str(
            r#"{"nodeType":"document","content":[
                {"nodeType":"paragraph","content":[{"nodeType":"text","value":"Hello "},{"nodeType":"text","value":"world"}]},
                {"nodeType":"paragraph","content":[{"nodeType":"text","value":"Again"}]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(doc.plain_text(), "Hello world\nAgain");
    }

    #[test]
    fn test_not_json() {
        assert!(matches!(parse_export("nope"), Err(ContentError::Json(_))));
    }
}
