//! doctxn demo binary
//!
//! Waits for the store, inserts two users in one transaction and prints every
//! user in the collection.

use std::io::{self, Write};
use std::time::Duration;

use clap::Parser;
use doctxn::workflow::{demo_users, insert_and_list};
use doctxn::{connect, Config, TcpConnector};
use tracing_subscriber::{fmt, EnvFilter};

/// doctxn demo
#[derive(Parser, Debug)]
#[command(name = "doctxn")]
#[command(about = "Insert users in one transaction and list them")]
#[command(version)]
struct Args {
    /// Store address (host or host:port)
    #[arg(short, long, default_value = "localhost")]
    address: String,

    /// Database name
    #[arg(short, long, default_value = "test")]
    db: String,

    /// User collection name
    #[arg(short, long, default_value = "users")]
    collection: String,

    /// Transaction log collection name
    #[arg(long, default_value = "txns")]
    txn_collection: String,

    /// Seconds to wait between connection attempts
    #[arg(short, long, default_value = "5")]
    retry_secs: u64,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,doctxn=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .address(&args.address)
        .db_name(&args.db)
        .collection(&args.collection)
        .txn_collection(&args.txn_collection)
        .retry_delay(Duration::from_secs(args.retry_secs))
        .build();

    tracing::info!("doctxn v{}", doctxn::VERSION);
    tracing::info!("Store address: {}", config.address);

    let connected = connect(&TcpConnector, &config);
    let session = connected.session;

    let users = match insert_and_list(&session, &config, &demo_users()) {
        Ok(users) => users,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for user in &users {
        if let Err(e) = writeln!(out, "{}", user) {
            tracing::error!("Failed to write output: {}", e);
            std::process::exit(1);
        }
    }

    session.close();
}
