use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod rpc_client;
mod utils;

/// Command-line client for the ndnfd forwarding daemon.
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Path to the daemon's management control socket.
    #[clap(short, long, global = true, default_value = "/tmp/ndnfd.sock")]
    socket: String,

    /// Sets the level of verbosity.
    #[clap(short, long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the forwarding table (FIB)
    Fib {
        #[clap(subcommand)]
        cmd: FibCommands,
    },

    /// Create or destroy faces
    Face {
        #[clap(subcommand)]
        cmd: FaceCommands,
    },

    /// Set or unset the per-prefix forwarding strategy
    Strategy {
        #[clap(subcommand)]
        cmd: StrategyCommands,
    },

    /// Administer the Content Store
    Cs {
        #[clap(subcommand)]
        cmd: CsCommands,
    },

    /// Send an Interest directly to a router and print the Data response
    Interest {
        /// Name to request (NDN URI format)
        name: String,

        /// Timeout in milliseconds
        #[clap(short, long, default_value = "4000")]
        timeout: u64,

        /// Router address to dial (host:port)
        #[clap(short, long, default_value = "localhost:6367")]
        router: String,
    },

    /// Serve Data under a name as a standalone QUIC producer
    Publish {
        /// Name to publish under (NDN URI format)
        name: String,

        /// Content to publish (string)
        content: String,

        /// Freshness period in milliseconds
        #[clap(short, long, default_value = "60000")]
        ttl: u32,

        /// Address to listen on
        #[clap(short, long, default_value = "0.0.0.0:6367")]
        listen: String,
    },

    /// Benchmark a running forwarder
    Benchmark {
        /// Number of Interests to send
        #[clap(short, long, default_value = "1000")]
        count: usize,

        /// Name prefix to use for the benchmark
        #[clap(short, long, default_value = "/benchmark")]
        prefix: String,

        /// Number of concurrent faces
        #[clap(short = 'j', long, default_value = "1")]
        concurrent: usize,

        /// Router address to dial (host:port)
        #[clap(short, long, default_value = "localhost:6367")]
        router: String,
    },
}

#[derive(Subcommand)]
enum FibCommands {
    /// Add a nexthop to a FIB entry
    Add {
        /// Name prefix (NDN URI format)
        prefix: String,

        /// Next-hop face id
        face: u64,

        /// Route cost
        #[clap(short, long, default_value = "0")]
        cost: u64,
    },

    /// Remove a nexthop from a FIB entry
    Remove {
        /// Name prefix (NDN URI format)
        prefix: String,

        /// Next-hop face id
        face: u64,
    },
}

#[derive(Subcommand)]
enum FaceCommands {
    /// Dial a new face
    Create {
        /// Face URI, e.g. quic://host:port
        uri: String,

        /// Persistency: on-demand, persistent, or permanent
        #[clap(short, long, default_value = "persistent")]
        persistency: String,
    },

    /// Destroy an existing face
    Destroy {
        /// Face id
        face: u64,
    },
}

#[derive(Subcommand)]
enum StrategyCommands {
    /// Set the forwarding strategy for a prefix
    Set {
        /// Name prefix (NDN URI format)
        prefix: String,

        /// Strategy name
        strategy: String,
    },

    /// Unset the forwarding strategy for a prefix
    Unset {
        /// Name prefix (NDN URI format)
        prefix: String,
    },
}

#[derive(Subcommand)]
enum CsCommands {
    /// Erase Content Store entries under a prefix
    Erase {
        /// Name prefix (NDN URI format)
        prefix: String,

        /// Maximum number of entries to erase
        #[clap(short, long, default_value = "1")]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "info" }),
    )
    .init();

    match cli.command {
        Commands::Fib { cmd } => commands::fib::handle_command(&cli.socket, cmd).await,
        Commands::Face { cmd } => commands::face::handle_command(&cli.socket, cmd).await,
        Commands::Strategy { cmd } => commands::strategy::handle_command(&cli.socket, cmd).await,
        Commands::Cs { cmd } => commands::cs::handle_command(&cli.socket, cmd).await,
        Commands::Interest { name, timeout, router } => {
            commands::interest::send_interest(name, timeout, router).await
        }
        Commands::Publish { name, content, ttl, listen } => {
            commands::publish::publish_data(name, content, ttl, listen).await
        }
        Commands::Benchmark { count, prefix, concurrent, router } => {
            commands::benchmark::run_benchmark(count, prefix, concurrent, router).await
        }
    }
}
