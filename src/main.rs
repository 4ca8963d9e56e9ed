use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    feedsight::logging::init().context("init logging")?;

    let cli = feedsight::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    let data_dir = cli.data_dir.as_str();
    match cli.command {
        feedsight::cli::Command::Insights(args) => {
            feedsight::commands::insights(data_dir, args)
                .await
                .context("insights")?;
        }
        feedsight::cli::Command::Post(args) => {
            feedsight::commands::post(data_dir, args)
                .await
                .context("post")?;
        }
        feedsight::cli::Command::Config {
            command: feedsight::cli::ConfigCommand::Put(args),
        } => {
            feedsight::commands::config_put(data_dir, args)
                .await
                .context("config put")?;
        }
        feedsight::cli::Command::Config {
            command: feedsight::cli::ConfigCommand::Show(args),
        } => {
            feedsight::commands::config_show(data_dir, args)
                .await
                .context("config show")?;
        }
    }

    Ok(())
}
