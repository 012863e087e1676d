use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "motiva")]
#[command(about = "Learning engagement engine - hearts, streaks, boards and challenges")]
#[command(version)]
struct Cli {
    /// Path to the database file (defaults to ~/.motiva/motiva.db)
    #[arg(short, long, global = true)]
    db: Option<PathBuf>,

    /// Path to the config file (defaults to .motiva/config.toml in the
    /// working directory, then ~/.motiva/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new ~/.motiva/config.toml configuration file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show a user's engagement state
    Status {
        /// User to inspect
        user: String,
    },

    /// Print a leaderboard
    Board {
        /// Board scope: global, class, grade, weekly or monthly
        #[arg(long, default_value = "global")]
        scope: String,

        /// Class id or grade number for class/grade boards
        #[arg(long)]
        scope_id: Option<String>,

        /// Ranking metric: xp, streak, lessons or accuracy
        #[arg(long, default_value = "xp")]
        metric: String,

        /// Rows to print
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Seed a cohort and replay days of activity (best on a throwaway --db)
    Simulate {
        /// Number of simulated users
        #[arg(long, default_value_t = 8)]
        users: usize,

        /// Number of simulated days, ending today
        #[arg(long, default_value_t = 14)]
        days: i64,
    },

    /// Remove expired challenges and refresh stale leaderboards
    Maintain {
        /// Keep running, one pass per interval
        #[arg(long)]
        watch: bool,

        /// Seconds between passes in watch mode
        #[arg(long, default_value_t = 300)]
        interval: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    match cli.command {
        Commands::Init { force } => {
            cli::init::init_command(cli.config, force).await?;
        }
        Commands::Status { user } => {
            let engine = cli::open_engine(cli.db, cli.config)?;
            cli::status::status_command(&engine, &user).await?;
        }
        Commands::Board {
            scope,
            scope_id,
            metric,
            limit,
        } => {
            let engine = cli::open_engine(cli.db, cli.config)?;
            cli::board::board_command(&engine, &scope, scope_id, &metric, limit).await?;
        }
        Commands::Simulate { users, days } => {
            let engine = cli::open_engine(cli.db, cli.config)?;
            cli::simulate::simulate_command(&engine, users, days).await?;
        }
        Commands::Maintain { watch, interval } => {
            let engine = cli::open_engine(cli.db, cli.config)?;
            cli::maintain::maintain_command(&engine, watch, interval).await?;
        }
    }

    Ok(())
}
