use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Document store directory (configs, insights, posts).
    #[arg(long, global = true, default_value = "workspace-data")]
    pub data_dir: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Insights(InsightsArgs),
    Post(PostArgs),
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Debug, Args)]
pub struct InsightsArgs {
    /// User whose stored config drives the run.
    #[arg(long)]
    pub user_id: String,

    /// Lookback window in days.
    #[arg(long, default_value_t = 1)]
    pub days: u32,

    /// Also email the digest to the user's configured recipient.
    #[arg(long)]
    pub email: bool,
}

#[derive(Debug, Args)]
pub struct PostArgs {
    #[arg(long)]
    pub user_id: String,

    /// Lookback window in days (fresh articles only).
    #[arg(long, default_value_t = 2)]
    pub days: u32,

    /// Stored insight to reuse as source (repeatable). Omit to use fresh articles.
    #[arg(long = "insight-id")]
    pub insight_ids: Vec<String>,

    /// System role for the post completion.
    #[arg(long)]
    pub role: Option<String>,

    /// Replaces the default post instructions.
    #[arg(long)]
    pub post_prompt: Option<String>,

    /// Image prompt template; `{post}` is replaced by the generated post.
    #[arg(long)]
    pub image_prompt: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    Put(ConfigPutArgs),
    Show(ConfigShowArgs),
}

#[derive(Debug, Args)]
pub struct ConfigPutArgs {
    /// JSON user config document.
    #[arg(long)]
    pub file: String,
}

#[derive(Debug, Args)]
pub struct ConfigShowArgs {
    #[arg(long)]
    pub user_id: String,
}
