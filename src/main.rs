//! Command-line front end for the resilient Semantic Scholar client.
//!
//! ```text
//! scholar-client get /paper/search -p query=transformers -p limit=5
//! scholar-client --recommendations post /papers/ --body '{"positivePaperIds":["649def34"]}'
//! scholar-client health --live
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;

use scholar_client::config::{load_config, ClientConfig};
use scholar_client::observability::{logging, metrics};
use scholar_client::{ApiRequest, ApiSurface, ScholarClient};

#[derive(Parser)]
#[command(name = "scholar-client")]
#[command(
    about = "Rate-limited, cached, circuit-protected Semantic Scholar client",
    long_about = None
)]
struct Cli {
    /// TOML config file. Environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Send requests to the Recommendations API instead of the Graph API.
    #[arg(long, global = true)]
    recommendations: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// GET an endpoint
    Get {
        endpoint: String,
        /// Query parameter as key=value, repeatable
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
    /// POST a JSON body to an endpoint
    Post {
        endpoint: String,
        #[arg(short, long)]
        body: String,
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
    /// Show circuit, cache and rate-limit state
    Health {
        /// Issue a small search first so the report reflects a live call
        #[arg(long)]
        live: bool,
    },
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::from_env()?,
    };

    logging::init_logging(&config.observability)?;
    tracing::info!("scholar-client v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let client = ScholarClient::new(&config)?;
    let surface = if cli.recommendations {
        ApiSurface::Recommendations
    } else {
        ApiSurface::Graph
    };

    match cli.command {
        Commands::Get { endpoint, params } => {
            let request = ApiRequest::get(endpoint).on(surface).params(params);
            print_json(&client.execute(request).await?)?;
        }
        Commands::Post { endpoint, body, params } => {
            let body: Value = serde_json::from_str(&body)?;
            let request = ApiRequest::post(endpoint, body).on(surface).params(params);
            print_json(&client.execute(request).await?)?;
        }
        Commands::Health { live } => {
            if live {
                let request = ApiRequest::get("/paper/search")
                    .param("query", "test")
                    .param("limit", "1");
                if let Err(e) = client.execute(request).await {
                    tracing::warn!(error = %e, "Live health check failed");
                }
            }
            println!("{}", serde_json::to_string_pretty(&client.health())?);
        }
    }

    Ok(())
}

fn print_json(value: &Value) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
