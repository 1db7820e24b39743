use crate::metadata::{self, MetadataService, PreviewCard, UrlMetadata};
use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tower_http::set_header::SetResponseHeaderLayer;

const CACHE_CONTROL: &str = "public, max-age=3600, stale-while-revalidate=86400";
const ALLOW_METHODS: &str = "GET, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Accept, User-Agent";
const PREFLIGHT_MAX_AGE: &str = "86400";

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum AppError {
    #[error("URL parameter is required")]
    MissingUrl,

    #[error("Invalid URL format")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Clone)]
pub struct SharedState {
    service: Arc<MetadataService>,
}

impl SharedState {
    pub fn new(service: Arc<MetadataService>) -> Self {
        Self { service }
    }
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/metadata", get(get_metadata).options(preflight))
        .route("/api/preview", get(get_preview).options(preflight))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                log::error!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::warn!("shutting down");
}

pub async fn serve(service: Arc<MetadataService>, listen: SocketAddr) -> anyhow::Result<()> {
    let app = router(SharedState::new(service));

    let listener = tokio::net::TcpListener::bind(listen).await?;
    log::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub fn start_daemon(service: Arc<MetadataService>, listen: SocketAddr) -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(serve(service, listen))
}

#[derive(Debug)]
struct HttpError(AppError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        log::debug!("rejected request: {}", self.0);
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": self.0.to_string()})),
        )
            .into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MetadataQuery {
    pub url: Option<String>,
}

/// Wire shape of `/api/metadata`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenGraphResponse {
    pub og_title: String,
    pub og_description: String,
    pub og_image: String,
    pub og_site_name: String,
    pub og_type: String,
    pub og_url: String,
}

impl From<UrlMetadata> for OpenGraphResponse {
    fn from(meta: UrlMetadata) -> Self {
        Self {
            og_title: meta.title,
            og_description: meta.description,
            og_image: meta.image,
            og_site_name: meta.site_name,
            og_type: meta.page_type,
            og_url: meta.url,
        }
    }
}

/// Reject missing and unparseable input before anything is fetched.
fn requested_url(query: MetadataQuery) -> Result<String, HttpError> {
    let url = query
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or(AppError::MissingUrl)?;
    metadata::fetcher::parse_requested(&url)?;
    Ok(url)
}

async fn lookup(state: &SharedState, url: &str) -> UrlMetadata {
    let extraction = state.service.fetch(url).await;
    metadata::log_outcome(url, &extraction);
    extraction.into_metadata()
}

fn cacheable<T: Serialize>(body: T) -> impl IntoResponse {
    (
        [
            (header::CACHE_CONTROL, CACHE_CONTROL),
            (header::VARY, "Accept-Encoding"),
        ],
        Json(body),
    )
}

async fn get_metadata(
    State(state): State<SharedState>,
    Query(query): Query<MetadataQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let url = requested_url(query)?;
    let meta = lookup(&state, &url).await;
    Ok(cacheable(OpenGraphResponse::from(meta)))
}

async fn get_preview(
    State(state): State<SharedState>,
    Query(query): Query<MetadataQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let url = requested_url(query)?;
    let meta = lookup(&state, &url).await;
    Ok(cacheable(PreviewCard::from(&meta)))
}

async fn preflight() -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            (header::ACCESS_CONTROL_ALLOW_METHODS, ALLOW_METHODS),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, ALLOW_HEADERS),
            (header::ACCESS_CONTROL_MAX_AGE, PREFLIGHT_MAX_AGE),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requested_url_validation() {
        let missing = requested_url(MetadataQuery { url: None }).unwrap_err();
        assert_eq!(missing.0, AppError::MissingUrl);

        let blank = requested_url(MetadataQuery {
            url: Some("  ".into()),
        })
        .unwrap_err();
        assert_eq!(blank.0, AppError::MissingUrl);

        let invalid = requested_url(MetadataQuery {
            url: Some("not-a-url".into()),
        })
        .unwrap_err();
        assert_eq!(invalid.0.to_string(), "Invalid URL format");

        for hostless in ["mailto:someone@example.com", "data:text/html,hi", "javascript:alert(1)"] {
            let err = requested_url(MetadataQuery {
                url: Some(hostless.into()),
            })
            .unwrap_err();
            assert_eq!(err.0, AppError::InvalidUrl(url::ParseError::EmptyHost), "{hostless}");
        }

        let ok = requested_url(MetadataQuery {
            url: Some("https://example.com/a".into()),
        })
        .unwrap();
        assert_eq!(ok, "https://example.com/a");
    }

    #[test]
    fn test_og_mapping() {
        let meta = crate::metadata::fallback::invalid_record("x");
        let og = OpenGraphResponse::from(meta.clone());
        assert_eq!(og.og_title, meta.title);
        assert_eq!(og.og_url, "x");

        let json = serde_json::to_value(&og).unwrap();
        assert!(json.get("ogSiteName").is_some());
        assert!(json.get("ogType").is_some());
    }
}
