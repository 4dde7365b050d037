//! doctxn loopback server
//!
//! Serves an in-memory document store over the doctxn wire protocol, for
//! local runs of the demo binary.

use clap::Parser;
use doctxn::network::Server;
use doctxn::{Config, MemoryStore};
use tracing_subscriber::{fmt, EnvFilter};

/// doctxn Server
#[derive(Parser, Debug)]
#[command(name = "doctxn-server")]
#[command(about = "In-memory document store for local development")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:7017")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,doctxn=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("doctxn server v{}", doctxn::VERSION);

    let config = Config::builder()
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .build();

    let mut server = Server::new(config, Box::new(MemoryStore::new()));
    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
