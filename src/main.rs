use clap::{Parser, Subcommand};
use std::sync::Arc;

use comic_gateway::apis::xkcd::XkcdApi;
use comic_gateway::config::Config;
use comic_gateway::gateway::Gateway;
use comic_gateway::server::AppState;
use comic_gateway::types::{ComicApi, FetchOutcome};
use comic_gateway::{logging, metrics, server};

#[derive(Parser)]
#[command(name = "comic_gateway")]
#[command(about = "Aggregation and search gateway for the xkcd comic archive")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Listen port (overrides the configured port)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the latest comic as JSON
    Latest,
    /// Print one comic by id as JSON
    Comic {
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        id: u32,
    },
    /// Print a random comic as JSON
    Random,
    /// Search the recent window and print the matches as JSON
    Search {
        query: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=50))]
        limit: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    logging::init_logging();

    let cli = Cli::parse();

    let config = Config::load()?;
    let source: Arc<dyn ComicApi> = Arc::new(XkcdApi::new(&config.origin, config.timeout())?);
    let gateway = Gateway::new(source, &config);

    match cli.command {
        Commands::Serve { port } => {
            metrics::init_metrics();
            let port = port.unwrap_or(config.port);
            let state = Arc::new(AppState::new(gateway, &config));
            server::start_server(state, port).await?;
        }
        Commands::Latest => {
            print_json(&gateway.latest().await?)?;
        }
        Commands::Comic { id } => match gateway.by_id(id).await? {
            FetchOutcome::Found(comic) => print_json(&comic)?,
            FetchOutcome::NotFound => {
                println!("⚠️  Comic {} does not exist", id);
            }
        },
        Commands::Random => {
            print_json(&gateway.random().await?)?;
        }
        Commands::Search { query, page, limit } => {
            anyhow::ensure!(
                !query.trim().is_empty() && query.trim().chars().count() <= 100,
                "Query must be between 1 and 100 characters"
            );
            print_json(&gateway.search(query.trim(), page, limit).await?)?;
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
