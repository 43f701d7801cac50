use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use tradeit_feed::config;
use tradeit_feed::engine::{FeedEngine, FeedSettings};
use tradeit_feed::gateway::GraphqlGateway;
use tradeit_feed::likes::is_liked;
use tradeit_feed::location::LocationProvider;
use tradeit_feed::model::{FeedPhase, GeoPoint};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Device latitude; omit (with --lon) to browse the general catalog
    #[arg(long)]
    lat: Option<f64>,

    /// Device longitude
    #[arg(long)]
    lon: Option<f64>,

    /// Search radius in meters
    #[arg(long)]
    radius: Option<u32>,

    /// Profile id to sync liked listings for
    #[arg(long)]
    profile: Option<String>,

    /// Maximum number of pages to fetch
    #[arg(long, default_value_t = 5)]
    max_pages: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;

    let gateway = Arc::new(GraphqlGateway::from_config(&cfg)?);
    let settings = FeedSettings::from(&cfg.feed);
    let radius = args.radius.unwrap_or(settings.default_radius_meters);

    let engine = Arc::new(FeedEngine::new(gateway, settings));
    let reader = engine.subscribe();

    let center = match (args.lat, args.lon) {
        (Some(lat), Some(lon)) => Some(GeoPoint { lat, lon }),
        _ => None,
    };
    match center {
        Some(c) => info!(lat = c.lat, lon = c.lon, radius, "browsing nearby feed"),
        None => info!("no coordinates given; browsing general catalog"),
    }
    engine.initialize(center, radius).await;

    // Keep feeding later fixes into the engine the way platform glue would.
    let _provider = center.map(|c| {
        let (provider, location) = LocationProvider::new();
        provider.grant();
        provider.update(c);
        tokio::spawn(Arc::clone(&engine).drive(location));
        provider
    });

    if let Some(profile) = args.profile.as_deref() {
        engine.sync_likes(profile).await;
    }

    let mut snap = reader.snapshot();
    if snap.phase == FeedPhase::Error {
        anyhow::bail!("feed fetch failed; see logs");
    }
    info!(listings = snap.listings.len(), cursor = ?snap.cursor, "page 1 applied");

    let mut pages = 1;
    while snap.cursor.is_some() && pages < args.max_pages {
        engine.load_more().await;
        pages += 1;
        snap = reader.snapshot();
        if snap.phase == FeedPhase::Error {
            anyhow::bail!("feed fetch failed; see logs");
        }
        info!(listings = snap.listings.len(), cursor = ?snap.cursor, "page {} applied", pages);
    }

    let snap = reader.snapshot();
    for listing in &snap.listings {
        info!(
            id = %listing.id,
            price = listing.price,
            liked = is_liked(&listing.id, &snap.liked_ids),
            "{}",
            listing.title
        );
    }

    Ok(())
}
