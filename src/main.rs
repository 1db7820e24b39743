use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod content;
mod metadata;
mod scrape;
#[cfg(test)]
mod tests;
mod web;

use cli::Command;
use config::Config;
use metadata::{MetadataCache, MetadataFetcher, MetadataService, PreviewCard};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("folio=info,tower_http=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_service(config: &Config) -> anyhow::Result<MetadataService> {
    let source = scrape::HttpPageSource::new(&config.scrape)
        .context("failed to build http client")?;
    let fetcher = MetadataFetcher::new(Arc::new(source));

    if !config.cache.enabled {
        log::debug!("metadata cache disabled");
        return Ok(MetadataService::uncached(fetcher));
    }

    let cache = MetadataCache::new(config.cache.ttl(), config.cache.capacity);
    Ok(MetadataService::new(fetcher, Some(cache)))
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let args = cli::Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_with(path)?,
        None => Config::default(),
    };

    match args.command {
        Command::Serve { listen } => {
            let addr: SocketAddr = match listen {
                Some(listen) => listen
                    .parse::<SocketAddr>()
                    .with_context(|| format!("invalid listen address '{listen}'"))?,
                None => config.server.listen_addr()?,
            };

            let service = Arc::new(build_service(&config)?);
            web::start_daemon(service, addr)
        }

        Command::Meta { url, report, card } => {
            let service = build_service(&config)?;
            let extraction = runtime()?.block_on(service.fetch(&url));
            metadata::log_outcome(&url, &extraction);

            let output = if report {
                json!({
                    "outcome": extraction.outcome(),
                    "report": extraction.report(),
                    "metadata": extraction.metadata(),
                })
            } else if card {
                serde_json::to_value(PreviewCard::from(extraction.metadata()))?
            } else {
                serde_json::to_value(extraction.metadata())?
            };

            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }

        Command::Variants { url } => {
            for variant in metadata::normalize::url_variants(&url) {
                println!("{variant}");
            }
            Ok(())
        }

        Command::Publications { export } => {
            let entries = content::load_export(&export)?;
            let service = build_service(&config)?;
            let rt = runtime()?;

            let mut cards = Vec::new();
            for publication in content::publications(&entries) {
                let urls = publication.link_urls();
                if urls.is_empty() {
                    log::warn!("publication '{}' has no links", publication.title);
                }

                for url in urls {
                    let extraction = rt.block_on(service.fetch(&url));
                    metadata::log_outcome(&url, &extraction);
                    cards.push(json!({
                        "publication": publication.title,
                        "description": publication.description.plain_text(),
                        "card": PreviewCard::from(extraction.metadata()),
                    }));
                }
            }

            log::info!(
                "{} cards built, {} distinct urls cached",
                cards.len(),
                service.cached_entries()
            );

            println!("{}", serde_json::to_string_pretty(&cards)?);
            Ok(())
        }
    }
}
