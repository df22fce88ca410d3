use adjective_tally::config::loader::{ConfigLoader, default_config_path};
use adjective_tally::config::{AppConfig, RateLimitRule};
use adjective_tally::models::RateLimitKey;
use adjective_tally::observability::{TallyMetrics, check_health, init_tracing};
use adjective_tally::services::{TallyServices, create_services};
use adjective_tally::storage::{StorageFactory, StoreHandles};
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "adjective-tally")]
#[command(about = "Admin CLI for the adjective tally store", long_about = None)]
struct Cli {
    /// Config file (defaults to ./tally.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the leaderboard
    Top {
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Show how many words a session has submitted
    Count { session: String },
    /// Show the words a session has submitted
    Words { session: String },
    /// List every session with its words
    Sessions,
    /// Submit a word on behalf of a session, enforcing the per-session cap
    Submit { session: String, word: String },
    /// Withdraw every word a session submitted and delete the session
    RemoveSession { session: String },
    /// Delete all sessions and counts
    Reset {
        /// Required; there is no undo
        #[arg(long)]
        yes: bool,
    },
    /// Count one request against a rate limit window
    RateCheck {
        origin: String,
        #[arg(value_enum)]
        action: Action,
    },
    /// Show the remaining allowance of a rate limit window
    RateInfo {
        origin: String,
        #[arg(value_enum)]
        action: Action,
    },
    /// Check store connectivity
    Health,
}

#[derive(Clone, Copy, ValueEnum)]
enum Action {
    Submit,
    Login,
}

impl Action {
    fn name(self) -> &'static str {
        match self {
            Action::Submit => "submit",
            Action::Login => "login",
        }
    }

    fn rule(self, config: &AppConfig) -> RateLimitRule {
        match self {
            Action::Submit => config.rate_limits.submit,
            Action::Login => config.rate_limits.login,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ConfigLoader::load().with_context(|| {
            format!("failed to load config from {}", default_config_path().display())
        })?,
    };
    ConfigLoader::validate(&config).context("invalid configuration")?;

    let _guard = init_tracing(&config.logging)?;
    info!(app = %config.app_name, environment = %config.environment, "configuration loaded");

    let handles = StorageFactory::create(&config.store).await?;
    let metrics = TallyMetrics::new()?;
    let services = create_services(&handles, &config, Some(metrics));

    run(cli.command, &handles, &services, &config).await
}

async fn run(
    command: Commands,
    handles: &StoreHandles,
    services: &TallyServices,
    config: &AppConfig,
) -> Result<()> {
    let aggregation = &services.aggregation;

    match command {
        Commands::Top { limit } => {
            let limit = limit.unwrap_or(config.limits.leaderboard_size);
            print(&aggregation.leaderboard().try_top(limit).await?)?;
        }
        Commands::Count { session } => {
            let count = aggregation.submissions().try_count(&session).await?;
            print(&json!({ "session": session, "count": count }))?;
        }
        Commands::Words { session } => {
            let words = aggregation.submissions().words_of(&session).await?;
            print(&json!({ "session": session, "words": words }))?;
        }
        Commands::Sessions => {
            print(&aggregation.submissions().list_all().await?)?;
        }
        Commands::Submit { session, word } => {
            let count = services.policy.submit(aggregation, &session, &word).await?;
            print(&json!({ "session": session, "count": count }))?;
        }
        Commands::RemoveSession { session } => {
            print(&aggregation.remove_session(&session).await?)?;
        }
        Commands::Reset { yes } => {
            if !yes {
                bail!("refusing to reset without --yes");
            }
            let removed = aggregation.reset().await?;
            print(&json!({ "removed_keys": removed }))?;
        }
        Commands::RateCheck { origin, action } => {
            let key = RateLimitKey::new(&origin, action.name());
            let decision = services
                .rate_limiter
                .check_rule(&key, &action.rule(config))
                .await;
            print(&json!({ "key": key.as_str(), "decision": decision }))?;
        }
        Commands::RateInfo { origin, action } => {
            let key = RateLimitKey::new(&origin, action.name());
            let info = services
                .rate_limiter
                .info(&key, action.rule(config).limit)
                .await;
            print(&json!({
                "key": key.as_str(),
                "remaining": info.remaining,
                "reset": info.reset_millis(),
            }))?;
        }
        Commands::Health => {
            let status = check_health(handles).await;
            print(&status)?;
            if !status.is_healthy() {
                bail!("store is unhealthy");
            }
        }
    }

    Ok(())
}

fn print<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
