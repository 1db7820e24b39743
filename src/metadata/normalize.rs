use url::Url;

/// Build the ordered list of URLs worth trying for `url`.
///
/// The original string always comes first, followed by the `www.`-toggled
/// host and then the `http`/`https`-toggled scheme. The two toggles are
/// applied independently, so there are never more than three entries and
/// duplicates are dropped.
///
/// Returns just the original string if the URL cannot be parsed.
pub fn url_variants(url: &str) -> Vec<String> {
    let mut variants = vec![url.to_string()];

    let parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(_) => return variants,
    };

    let candidates = [toggle_www(&parsed), toggle_scheme(&parsed)];
    for candidate in candidates.into_iter().flatten() {
        let candidate = candidate.to_string();
        if !variants.contains(&candidate) {
            variants.push(candidate);
        }
    }

    variants
}

fn toggle_www(url: &Url) -> Option<Url> {
    let host = url.host_str()?;
    // IP literals have no www form
    if host.parse::<std::net::IpAddr>().is_ok() || host.starts_with('[') {
        return None;
    }

    let toggled = match host.strip_prefix("www.") {
        Some(bare) if !bare.is_empty() => bare.to_string(),
        Some(_) => return None,
        None => format!("www.{host}"),
    };

    let mut out = url.clone();
    out.set_host(Some(&toggled)).ok()?;
    Some(out)
}

fn toggle_scheme(url: &Url) -> Option<Url> {
    let scheme = match url.scheme() {
        "http" => "https",
        "https" => "http",
        _ => return None,
    };

    let mut out = url.clone();
    out.set_scheme(scheme).ok()?;
    Some(out)
}

/// Hostname with a leading `www.` removed. The `url` crate already lowercases
/// hosts of http(s) URLs, so every extraction path yields the same casing.
pub fn domain_of(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    host.strip_prefix("www.").unwrap_or(host).to_string()
}

/// Conventional favicon location. Not checked for existence.
pub fn favicon_of(url: &Url) -> String {
    match url.host_str() {
        Some(host) => format!("{}://{}/favicon.ico", url.scheme(), host),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_www_variants() {
        let variants = url_variants("http://www.example.com/a");
        assert_eq!(
            variants,
            vec![
                "http://www.example.com/a".to_string(),
                "http://example.com/a".to_string(),
                "https://www.example.com/a".to_string(),
            ]
        );
    }

    #[test]
    fn test_https_bare_host_variants() {
        let variants = url_variants("https://example.com/page?q=1");
        assert_eq!(
            variants,
            vec![
                "https://example.com/page?q=1".to_string(),
                "https://www.example.com/page?q=1".to_string(),
                "http://example.com/page?q=1".to_string(),
            ]
        );
    }

    #[test]
    fn test_original_string_kept_verbatim() {
        // the url crate would serialize this with a trailing slash
        let variants = url_variants("https://example.com");
        assert_eq!(variants[0], "https://example.com");
        assert_eq!(variants.len(), 3);
    }

    #[test]
    fn test_never_more_than_three() {
        for url in [
            "http://www.example.com/a",
            "https://news.example.co.uk/x/y",
            "http://example.com:8080/",
        ] {
            assert!(url_variants(url).len() <= 3, "{url}");
        }
    }

    #[test]
    fn test_ip_host_only_toggles_scheme() {
        let variants = url_variants("http://10.0.0.1/status");
        assert_eq!(
            variants,
            vec![
                "http://10.0.0.1/status".to_string(),
                "https://10.0.0.1/status".to_string(),
            ]
        );
    }

    #[test]
    fn test_non_http_scheme_only_toggles_host() {
        let variants = url_variants("ftp://example.com/file");
        assert_eq!(
            variants,
            vec![
                "ftp://example.com/file".to_string(),
                "ftp://www.example.com/file".to_string(),
            ]
        );
    }

    #[test]
    fn test_malformed_url_returns_original() {
        assert_eq!(url_variants("not a valid url"), vec!["not a valid url".to_string()]);
        assert_eq!(url_variants("example.com/page"), vec!["example.com/page".to_string()]);
    }

    #[test]
    fn test_domain_strips_leading_www_only() {
        let url = Url::parse("https://www.bbc.com/news").unwrap();
        assert_eq!(domain_of(&url), "bbc.com");

        let url = Url::parse("https://news.www.example.com/").unwrap();
        assert_eq!(domain_of(&url), "news.www.example.com");
    }

    #[test]
    fn test_domain_is_lowercase() {
        let url = Url::parse("https://WWW.Example.COM/Path").unwrap();
        assert_eq!(domain_of(&url), "example.com");
    }

    #[test]
    fn test_favicon_uses_scheme_and_host() {
        let url = Url::parse("http://www.example.com:8080/a/b").unwrap();
        assert_eq!(favicon_of(&url), "http://www.example.com/favicon.ico");
    }
}
