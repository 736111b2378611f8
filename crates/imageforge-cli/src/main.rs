mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use commands::{EXIT_CONFIG_ERROR, EXIT_FAILURE, EXIT_MANIFEST_ERROR};
use imageforge_core::install_signal_handler;
use imageforge_schema::redact;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "imageforge",
    version,
    about = "Chroot-based cloud VM image builder that skips the throwaway build VM"
)]
struct Cli {
    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Which set of cloud and host collaborators a build runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// In-memory collaborators; no cloud access, no host mutation.
    Mock,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve and validate a manifest without building anything.
    Validate {
        /// Path to manifest TOML file.
        #[arg(default_value = "imageforge.toml")]
        manifest: PathBuf,
    },
    /// Show the step sequence a build of this manifest would run.
    Plan {
        /// Path to manifest TOML file.
        #[arg(default_value = "imageforge.toml")]
        manifest: PathBuf,
    },
    /// Build the image described by a manifest.
    Build {
        /// Path to manifest TOML file.
        #[arg(default_value = "imageforge.toml")]
        manifest: PathBuf,
        /// Collaborator backend to build against.
        #[arg(long, value_enum, default_value_t = Backend::Mock)]
        backend: Backend,
    },
    /// Run diagnostic checks on this host.
    Doctor,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("IMAGEFORGE_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .init();

    install_signal_handler();

    let json_output = cli.json;
    let result = match cli.command {
        Commands::Validate { manifest } => commands::validate::run(&manifest, json_output),
        Commands::Plan { manifest } => commands::plan::run(&manifest, json_output),
        Commands::Build { manifest, backend } => match backend {
            Backend::Mock => commands::build::run_mock(&manifest, json_output),
        },
        Commands::Doctor => commands::doctor::run(json_output),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            // credential material registered during resolution must
            // never reach the terminal
            eprintln!("error: {}", redact(&msg));
            let code = if msg.starts_with("failed to read manifest")
                || msg.starts_with("failed to parse manifest")
            {
                EXIT_MANIFEST_ERROR
            } else if msg.starts_with("invalid build configuration") {
                EXIT_CONFIG_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}
