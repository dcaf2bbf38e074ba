pub mod aggregate;
pub mod backoff;
pub mod catalog;
pub mod config;
pub mod feed;
pub mod pipeline;
pub mod rollup;
pub mod stats;
pub mod store;
pub mod window;

use {
    catalog::ItemCatalog,
    config::Config,
    feed::HttpLogFeed,
    store::SqliteStatsStore,
};

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    // NOTE: Workaround for rustls issue
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .expect("Can't set crypto provider to aws_lc_rs");

    let config = Config::from_env()?;

    log::info!("🚀 Starting marketwatch...");
    log::info!("📊 Configuration:");
    log::info!("   Feed: {}", config.feed_url);
    log::info!("   Database: {}", config.db_path);
    log::info!(
        "   Window: {} x {} (offset {})",
        config.period,
        config.granularity.as_str(),
        config.offset
    );
    log::info!("   Items: {}", config.selector);

    let catalog = ItemCatalog::load(&config.catalog_path)?;
    log::info!("📒 Loaded {} items from {}", catalog.len(), config.catalog_path);

    let feed = HttpLogFeed::connect(&config.feed_url, config.session_token.clone()).await?;
    let store = SqliteStatsStore::open(&config.db_path)?;

    let report =
        pipeline::run_market_fetch(&feed, &store, &catalog, &config.fetch_params()).await?;

    for failure in &report.failures {
        log::error!("❌ Item {} failed: {}", failure.item_id, failure.reason);
    }

    if report.failures.is_empty() {
        log::info!("✅ Saved {} records to database", report.processed);
    } else {
        log::warn!(
            "⚠️  Saved {} records, {} items failed",
            report.processed,
            report.failures.len()
        );
    }

    Ok(())
}
