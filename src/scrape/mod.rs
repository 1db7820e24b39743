use std::{
    error::Error,
    fmt,
    future::Future,
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use reqwest::{
    dns::{Addrs, Name, Resolve, Resolving},
    header::{self, HeaderMap, HeaderValue},
    redirect::Policy,
    Url,
};

use crate::config::ScrapeConfig;
use crate::metadata::{FetchError, PageSource};

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

fn is_ip_private(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
        }
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_ip_private(&IpAddr::V4(v4));
            }
            v6.is_loopback()
                || v6.is_unspecified()
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}

/// A url refused by the scrape policy, raised from inside the client for
/// redirect hops and DNS answers.
#[derive(Debug)]
struct PolicyViolation(String);

impl fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for PolicyViolation {}

/// Checks that need no DNS: scheme, blocked hosts and IP literal hosts.
/// Applied to the requested url and again to every redirect target.
fn check_url(url: &Url, config: &ScrapeConfig) -> Result<(), PolicyViolation> {
    if !config.allowed_schemes.iter().any(|s| s == url.scheme()) {
        return Err(PolicyViolation(format!(
            "scheme '{}' not allowed",
            url.scheme()
        )));
    }

    let host = url.host_str().unwrap_or_default();
    if host.is_empty() {
        return Err(PolicyViolation("url has no host".into()));
    }

    if config
        .blocked_hosts
        .iter()
        .any(|h| h.eq_ignore_ascii_case(host))
    {
        return Err(PolicyViolation(format!("host '{host}' is blocked")));
    }

    if config.block_private_ips {
        let ip = match url.host() {
            Some(url::Host::Ipv4(v4)) => Some(IpAddr::V4(v4)),
            Some(url::Host::Ipv6(v6)) => Some(IpAddr::V6(v6)),
            _ => None,
        };
        if ip.is_some_and(|ip| is_ip_private(&ip)) {
            return Err(PolicyViolation(format!("host '{host}' is a private address")));
        }
    }

    Ok(())
}

/// Resolve `host` and refuse the whole answer if any address is private.
/// Runs at connect time, so it also covers redirect targets and hosts whose
/// records change between requests.
async fn resolve_public(host: &str) -> Result<Vec<SocketAddr>, Box<dyn Error + Send + Sync>> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, 0)).await?.collect();

    if addrs.iter().any(|addr| is_ip_private(&addr.ip())) {
        return Err(Box::new(PolicyViolation(format!(
            "host '{host}' resolves to a private address"
        ))));
    }

    Ok(addrs)
}

struct PublicResolver;

impl Resolve for PublicResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(async move {
            let addrs = resolve_public(name.as_str()).await?;
            let addrs: Addrs = Box::new(addrs.into_iter());
            Ok(addrs)
        })
    }
}

fn redirect_policy(config: &ScrapeConfig) -> Policy {
    let config = config.clone();
    Policy::custom(move |attempt| {
        if attempt.previous().len() > config.max_redirects {
            return attempt.error("too many redirects");
        }
        match check_url(attempt.url(), &config) {
            Ok(()) => attempt.follow(),
            Err(violation) => attempt.error(violation),
        }
    })
}

fn get_error(error: &reqwest::Error) -> String {
    match error.source() {
        Some(e) => match e.source() {
            Some(e) => e.to_string(),
            None => e.to_string(),
        },
        None => error.to_string(),
    }
}

fn map_error(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        return FetchError::Timeout;
    }

    let mut source = error.source();
    while let Some(err) = source {
        if let Some(violation) = err.downcast_ref::<PolicyViolation>() {
            return FetchError::Blocked(violation.0.clone());
        }
        source = err.source();
    }

    FetchError::Network(get_error(&error))
}

/// Bound a whole fetch, DNS and body included, by `limit`.
async fn with_deadline<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T, FetchError>>,
) -> Result<T, FetchError> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_elapsed) => Err(FetchError::Timeout),
    }
}

fn is_markup(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.contains("html") || content_type.contains("xml") || content_type.starts_with("text/")
}

/// Live page source backed by one shared reqwest client.
pub struct HttpPageSource {
    client: reqwest::Client,
    config: ScrapeConfig,
}

impl HttpPageSource {
    pub fn new(config: &ScrapeConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.accept_language)?,
        );
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));

        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(config.timeout())
            .redirect(redirect_policy(config))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .danger_accept_invalid_hostnames(config.accept_invalid_certs);

        let proxy = config.proxy.as_deref().filter(|p| !p.is_empty());
        if let Some(proxy) = proxy {
            log::debug!("scrape: using proxy {proxy}");
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        } else if config.block_private_ips {
            builder = builder.dns_resolver(Arc::new(PublicResolver));
        }

        Ok(Self {
            client: builder.build()?,
            config: config.clone(),
        })
    }

    async fn fetch_page(&self, url: &Url) -> Result<String, FetchError> {
        check_url(url, &self.config).map_err(|v| FetchError::Blocked(v.0))?;

        let mut resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(map_error)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        if let Some(content_type) = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !is_markup(content_type) {
                return Err(FetchError::NotHtml(content_type.to_string()));
            }
        }

        let limit = self.config.max_body_bytes;
        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = resp.chunk().await.map_err(map_error)? {
            let room = limit.saturating_sub(body.len());
            body.extend_from_slice(&chunk[..chunk.len().min(room)]);
            if body.len() >= limit {
                break;
            }
        }

        let html = String::from_utf8_lossy(&body).into_owned();
        if html.trim().is_empty() {
            return Err(FetchError::EmptyBody);
        }

        Ok(html)
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_html(&self, url: &Url) -> Result<String, FetchError> {
        with_deadline(self.config.timeout(), self.fetch_page(url)).await
    }
}
