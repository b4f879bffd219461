use clap::Parser;
use log::{info, warn};
use server::catalog::MemoryCatalog;
use server::hub::Hub;
use server::rng::ThreadRoll;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// WebSocket port to listen on
    #[clap(short, long, default_value = "8080")]
    port: u16,

    /// Path to a JSON file holding the tyrant stat blocks
    #[clap(short, long)]
    catalog: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Warning: RUST_LOG environment variable not set. Set it to display logs!");
        eprintln!("Recommended: RUST_LOG=info cargo run");
    }

    let args = Args::parse();

    let catalog = match &args.catalog {
        Some(path) => MemoryCatalog::load(path)?,
        None => {
            warn!("no catalogue file given; every join will fail until one is provided");
            MemoryCatalog::new()
        }
    };

    let addr = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("scene server listening on {}", addr);

    let hub = Arc::new(Hub::new(Arc::new(catalog), Box::new(ThreadRoll)));
    hub.serve(listener).await;

    Ok(())
}
