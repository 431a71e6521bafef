//! Subcommand handlers.

use std::time::{Duration, Instant};

use tokio::net::TcpListener;
use tracing::info;

use super::command::{IngestArgs, ScanArgs, ServeArgs, SuggestArgs};
use super::output;
use crate::adapter::inbound::http;
use crate::application::Engine;
use crate::domain::{SportsEventId, VenueId};
use crate::error::{IngestError, Result};
use crate::infrastructure::config::{Config, StoreBackend};

/// Serve the HTTP API until ctrl-c.
pub async fn serve(config: &Config, engine: Engine, args: &ServeArgs) -> Result<()> {
    let mut server = config.server.clone();
    if let Some(host) = &args.host {
        server.host.clone_from(host);
    }
    if let Some(port) = args.port {
        server.port = port;
    }
    let addr = server.socket_addr()?;

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "HTTP API listening");
    axum::serve(listener, http::router(engine))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;
    Ok(())
}

pub async fn scan(engine: &Engine, args: &ScanArgs) -> Result<()> {
    let summary = match args.event {
        Some(id) => engine.scanner.scan_event(SportsEventId::new(id)).await?,
        None => engine.scanner.scan_all().await?,
    };
    output::summary("Scan", &summary);
    Ok(())
}

pub async fn suggest(engine: &Engine, args: &SuggestArgs) -> Result<()> {
    let deadline = args
        .timeout_ms
        .map(|ms| Instant::now() + Duration::from_millis(ms));
    let summary = engine.matcher.suggest(args.limit, deadline).await?;
    output::summary("Suggest", &summary);
    Ok(())
}

/// Ingest one venue, or every configured venue for `all`.
pub async fn ingest(engine: &Engine, args: &IngestArgs) -> Result<()> {
    if args.venue == "all" {
        let reports = engine.ingestion.ingest_all(args.quotes).await;
        let total = reports.len();
        let mut failed = 0;
        for report in reports {
            match (&report.summary, &report.error) {
                (Some(summary), _) => output::summary(report.venue_id.as_str(), summary),
                (None, Some(error)) => {
                    failed += 1;
                    output::warning(&format!("{}: {error}", report.venue_id));
                }
                (None, None) => {}
            }
        }
        if failed > 0 {
            return Err(IngestError::PartialFailure { failed, total }.into());
        }
        return Ok(());
    }

    let venue = VenueId::new(args.venue.as_str());
    let summary = engine.ingestion.ingest_venue(&venue, args.quotes).await?;
    output::summary(venue.as_str(), &summary);
    Ok(())
}

/// Report the effective configuration.
pub fn check_config(config: &Config) {
    output::section("Configuration");
    output::success("Configuration file is valid");
    output::field("Server", format!("{}:{}", config.server.host, config.server.port));
    match config.database.backend {
        StoreBackend::Memory => output::field("Store", "memory"),
        StoreBackend::Sqlite => output::field("Store", format!("sqlite ({})", config.database.path)),
    }
    output::field("Budget", config.arbitrage.budget);
    output::field("Match window (h)", config.matcher.window_hours);

    let venues = &config.venues;
    for (name, enabled) in [
        ("polymarket", venues.polymarket.enabled),
        ("kalshi", venues.kalshi.enabled),
    ] {
        output::field(name, if enabled { "enabled" } else { "disabled" });
    }
    if !venues.polymarket.enabled && !venues.kalshi.enabled {
        output::warning("No venues enabled; ingestion will do nothing");
    }
}
