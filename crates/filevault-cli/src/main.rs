mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use filevault_core::Config;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "filevault", about = "Upload directories and download files with Merkle proofs")]
struct Cli {
    /// Configuration environment (defaults to $APP_ENV, then "dev")
    #[arg(long, global = true)]
    env: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload every file in a directory as a new session
    Upload {
        /// Directory to upload
        dir: PathBuf,

        /// Delete the source directory after a successful upload
        #[arg(long)]
        remove_source: bool,
    },

    /// Download a file and verify it against the trusted root
    Download {
        /// Session id printed by upload
        session: Uuid,

        /// Name of the stored file
        file: String,

        /// Where to write the verified file (defaults to the file name)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Also write the raw response (file + proof) as JSON
        #[arg(long)]
        bundle: Option<PathBuf>,

        /// Trusted root to verify against instead of the saved root file
        #[arg(long)]
        root: Option<String>,
    },

    /// Verify a saved download bundle offline
    Verify {
        /// JSON bundle written by `download --bundle`
        bundle: PathBuf,

        /// Trusted root to verify against instead of the saved root file
        #[arg(long)]
        root: Option<String>,
    },

    /// Hash a directory locally and print the root it would produce
    Hash {
        /// Directory to hash
        dir: PathBuf,
    },

    /// Show the current root of a session
    Root {
        /// Session id
        session: Uuid,
    },

    /// List upload sessions and their roots
    Sessions,

    /// List the files of a session in upload order
    Files {
        /// Session id
        session: Uuid,
    },
}

fn main() {
    // Initialize tracing (controlled by RUST_LOG env var).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("filevault=info,filevault_core=info")),
        )
        .init();

    let cli = Cli::parse();

    let env_name = cli.env.unwrap_or_else(Config::env_name);
    let config = match Config::load(&env_name) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    tracing::debug!(env = %env_name, scheme = config.hash_scheme.as_str(), "configuration ready");

    let result = match cli.command {
        Commands::Upload { dir, remove_source } => {
            commands::upload::run_upload(&config, &dir, remove_source)
        }
        Commands::Download {
            session,
            file,
            output,
            bundle,
            root,
        } => commands::download::run_download(
            &config,
            session,
            &file,
            output.as_deref(),
            bundle.as_deref(),
            root.as_deref(),
        ),
        Commands::Verify { bundle, root } => {
            commands::verify::run_verify(&config, &bundle, root.as_deref())
        }
        Commands::Hash { dir } => commands::inspect::run_hash(&config, &dir),
        Commands::Root { session } => commands::inspect::run_root(&config, session),
        Commands::Sessions => commands::inspect::run_sessions(&config),
        Commands::Files { session } => commands::inspect::run_files(&config, session),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
