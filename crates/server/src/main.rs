use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use dogmirror_core::Config;
use dogmirror_server::cli::{Cli, Command};
use dogmirror_server::{router, startup};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dogmirror_core::config::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    cli.apply(&mut config);
    config.validate()?;
    config.log_summary();

    match cli.command() {
        Command::Serve { .. } => serve(&config).await,
        Command::Refresh {
            start_page,
            max_pages,
        } => refresh(&config, start_page, max_pages).await,
    }
}

async fn serve(config: &Config) -> anyhow::Result<()> {
    let app = startup::start(config).await?;
    let router = router::build_router(app.state.clone(), router::cors_layer(&config.server.cors_origin));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    app.scheduler.stop().await;
    app.state.store.close().await;
    info!("Server stopped");
    Ok(())
}

async fn refresh(config: &Config, start_page: u32, max_pages: Option<u32>) -> anyhow::Result<()> {
    let ingestor = startup::build_ingestor(config).await?;
    let report = ingestor.run(start_page, max_pages).await?;
    ingestor.store().close().await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
