use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use hazard_api::config::{Args, HazardConfig};
use hazard_api::state::AppState;
use hazard_api::{build_router, prefetch};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    let config = HazardConfig::load(args.config.as_deref())?;
    info!(?config, "starting hazard-api");
    let state = Arc::new(AppState::new(config)?);

    if args.no_prefetch {
        info!("prefetch loop disabled");
    } else {
        tokio::spawn(prefetch::run_prefetch_loop(state.clone()));
    }

    let app = build_router(state, prometheus_handle);

    let addr: SocketAddr = args.listen.parse()?;
    info!(address = %addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
