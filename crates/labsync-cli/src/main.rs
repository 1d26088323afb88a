mod webhook;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "labsync-cli")]
#[command(about = "labsync webhook and database maintenance")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create the Airtable webhook and store it, replacing any stored one
    Register,
    /// Fetch pending payloads once and forward them to the sync endpoint
    Poll,
    /// Check that the stored webhook is still enabled upstream
    Health {
        /// Register a new webhook when the stored one is disabled or gone
        #[arg(long)]
        reregister: bool,
    },
    /// Re-forward payloads that failed during earlier polls
    Replay {
        /// Maximum number of dead letters to replay
        #[arg(long, default_value = "50")]
        limit: i64,
    },
    /// Show the stored webhook, last sync and pending dead letters
    Status,
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Apply pending migrations
    Migrate,
    /// Check database connectivity
    Ping,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("labsync-cli ready; run with --help for commands");
        return Ok(());
    };

    let config = labsync_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool =
        labsync_db::connect_pool(&config.database_url, labsync_db::PoolConfig::from_env()).await?;

    match command {
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let applied = labsync_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            labsync_db::ping(&pool).await?;
            println!("database ok");
        }
        Commands::Register => {
            labsync_db::run_migrations(&pool).await?;
            webhook::run_register(&pool, &config).await?;
        }
        Commands::Poll => {
            labsync_db::run_migrations(&pool).await?;
            webhook::run_poll(&pool, &config).await?;
        }
        Commands::Health { reregister } => {
            labsync_db::run_migrations(&pool).await?;
            webhook::run_health(&pool, &config, reregister).await?;
        }
        Commands::Replay { limit } => {
            labsync_db::run_migrations(&pool).await?;
            webhook::run_replay(&pool, &config, limit).await?;
        }
        Commands::Status => {
            labsync_db::run_migrations(&pool).await?;
            webhook::run_status(&pool, &config).await?;
        }
    }

    Ok(())
}
