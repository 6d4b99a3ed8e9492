//! AtlasKV Server Binary
//!
//! Starts the TCP server for AtlasKV.

use std::sync::Arc;

use clap::Parser;

use atlaskv::network::Server;
use atlaskv::{Config, Engine};

/// AtlasKV Server
#[derive(Parser, Debug)]
#[command(name = "atlaskv-server")]
#[command(about = "High-performance distributed key-value store")]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./atlaskv_data")]
    data_dir: String,

    /// Listen address
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    listen: String,

    /// Max concurrent client connections
    #[arg(long, default_value_t = 1024)]
    max_connections: usize,

    /// Open the naive append-only legacy store instead of the
    /// WAL/SSTable engine (diagnostic/contrast mode; the legacy store
    /// is not exposed over the network protocol).
    #[arg(long, default_value_t = false)]
    legacy: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    if args.legacy {
        run_legacy(&args);
        return;
    }

    let config = Config::builder()
        .data_dir(args.data_dir)
        .listen_addr(args.listen)
        .max_connections(args.max_connections)
        .build();

    let engine = match Engine::open(config.clone()) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            tracing::error!("failed to open engine: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(data_dir = %config.data_dir.display(), listen = %config.listen_addr, "starting AtlasKV server");

    let mut server = Server::new(config, engine);
    if let Err(e) = server.run() {
        tracing::error!("server error: {e}");
        std::process::exit(1);
    }
}

/// Open the legacy store and report its entry count, then exit. It has
/// no network server of its own: it exists for direct file inspection
/// behind the `--legacy` flag.
fn run_legacy(args: &Args) {
    let dir = std::path::Path::new(&args.data_dir).join("legacy");
    match atlaskv::legacy::LegacyStore::open(&dir) {
        Ok(store) => {
            tracing::info!(entries = store.entry_count(), dir = %dir.display(), "legacy store opened");
        }
        Err(e) => {
            tracing::error!("failed to open legacy store: {e}");
            std::process::exit(1);
        }
    }
}
