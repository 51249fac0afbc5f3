mod crawl;

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::crawl::{run_crawl, CrawlOptions};

#[derive(Debug, Parser)]
#[command(name = "vistet-cli")]
#[command(about = "Vistet command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract products from a storefront page and submit them to the catalog.
    Crawl {
        /// Page to crawl (defaults to `VISTET_STOREFRONT_URL`).
        #[arg(long)]
        url: Option<String>,

        /// Parse a saved HTML page instead of fetching one.
        #[arg(long)]
        html_file: Option<PathBuf>,

        /// Submit every product in one request to the bulk endpoint.
        #[arg(long)]
        bulk: bool,

        /// Print the extracted products as JSON without submitting them.
        #[arg(long)]
        dry_run: bool,

        /// Concurrent single-product submissions.
        #[arg(long, default_value_t = 1)]
        concurrency: usize,

        /// Abort the whole run after this many seconds.
        #[arg(long, default_value_t = 300)]
        timeout: u64,
    },
    /// Database bootstrap commands.
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity.
    Ping,
    /// Apply pending migrations.
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = vistet_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match command {
        Commands::Crawl {
            url,
            html_file,
            bulk,
            dry_run,
            concurrency,
            timeout,
        } => {
            let options = CrawlOptions {
                url,
                html_file,
                bulk,
                dry_run,
                concurrency,
                timeout_secs: timeout,
            };
            let report = run_crawl(&config, &options).await?;
            if dry_run {
                eprintln!("extracted {} products (dry run)", report.extracted);
            } else {
                println!("saved {} of {} products", report.saved(), report.extracted);
                if report.failed > 0 {
                    println!("{} products failed", report.failed);
                }
            }
        }
        Commands::Db { command } => {
            let pool = vistet_db::connect_pool_from_config(&config).await?;
            match command {
                DbCommands::Ping => {
                    vistet_db::health_check(&pool).await?;
                    println!("database ok");
                }
                DbCommands::Migrate => {
                    let applied = vistet_db::run_migrations(&pool).await?;
                    println!("applied {applied} migrations");
                }
            }
        }
    }

    Ok(())
}
