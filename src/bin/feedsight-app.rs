use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;

use feedsight::app::{AppState, router};
use feedsight::config::Settings;
use feedsight::pipeline::Pipelines;
use feedsight::store::{DocumentStore, LocalFsDocumentStore};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct AppArgs {
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: SocketAddr,

    #[arg(long, default_value = "workspace-data")]
    data_dir: PathBuf,

    /// Pipelines allowed to run at once; further requests wait for a slot.
    #[arg(long, default_value_t = 4)]
    max_concurrency: usize,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    feedsight::logging::init()?;

    let args = AppArgs::parse();
    let settings = Settings::from_env().context("load settings")?;
    tracing::info!(
        ?args,
        feed_api_url = %settings.feed_api_url,
        openai_model = %settings.openai_model,
        max_tokens = settings.max_tokens,
        request_timeout_secs = settings.request_timeout.as_secs(),
        api_key_required = settings.api_key.is_some(),
        "starting feedsight-app"
    );

    let store: Arc<dyn DocumentStore> = Arc::new(LocalFsDocumentStore::new(&args.data_dir));
    let pipelines = Pipelines::from_settings(&settings, store)?;
    let state = AppState::new(pipelines, args.max_concurrency, settings.request_timeout)
        .with_api_key(settings.api_key.clone());
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .map_err(|err| anyhow::anyhow!("bind {}: {err}", args.addr))?;
    tracing::info!(addr = %args.addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(?err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
