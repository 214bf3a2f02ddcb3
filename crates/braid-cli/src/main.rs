#![forbid(unsafe_code)]

mod robot;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "braid: local-first issue viewer with dependency-graph analytics",
    long_about = None
)]
struct Cli {
    /// Repository root containing the .beads directory.
    #[arg(long, global = true, default_value = ".")]
    dir: PathBuf,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Batch JSON output for downstream automation",
        long_about = "Run the analysis pipeline and emit one deterministic JSON object on stdout.",
        after_help = "EXAMPLES:\n    # Bottlenecks, keystones, and cycles\n    braid robot insights\n\n    # Alerts filtered to warnings\n    braid robot alerts --severity warning\n\n    # Capacity with three agents\n    braid robot capacity --agents 3"
    )]
    Robot {
        #[command(subcommand)]
        endpoint: robot::Endpoint,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let result = match cli.command {
        Commands::Robot { endpoint } => robot::run(&cli.dir, endpoint),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("braid: {err:#}");
            ExitCode::FAILURE
        }
    }
}
