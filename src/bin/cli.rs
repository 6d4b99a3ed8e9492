//! AtlasKV CLI Client
//!
//! Command-line interface for interacting with AtlasKV.

use clap::{Parser, Subcommand};

use atlaskv::client::Client;

/// AtlasKV CLI
#[derive(Parser, Debug)]
#[command(name = "atlaskv-cli")]
#[command(about = "CLI for AtlasKV key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Ping the server
    Ping,
}

fn main() {
    let args = Args::parse();

    let mut client = match Client::connect(&args.server) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let result = match args.command {
        Commands::Get { key } => client.get(key.as_bytes()).map(|value| match value {
            Some(value) => println!("{}", String::from_utf8_lossy(&value)),
            None => println!("(nil)"),
        }),
        Commands::Set { key, value } => client.put(key.as_bytes(), value.as_bytes()).map(|applied| {
            println!("{}", if applied { "OK" } else { "(rejected)" });
        }),
        Commands::Del { key } => client.delete(key.as_bytes()).map(|applied| {
            println!("{}", if applied { "OK" } else { "(not found)" });
        }),
        Commands::Ping => client.ping().map(|ok| {
            println!("{}", if ok { "PONG" } else { "(no response)" });
        }),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
