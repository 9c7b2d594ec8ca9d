//! Flotilla - Entry Point
//!
//! Coordinates app deployments across loosely-coupled peer nodes: a
//! shared append-only feed records what ran where, and an MQTT bus
//! carries best-effort announcements between peers.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use colored::Colorize;

use flotilla::commands::{self, CommandContext};
use flotilla::errors::RegistryError;
use flotilla::logs::{init_logging, LogOptions};
use flotilla::storage::layout::StorageLayout;
use flotilla::storage::settings::Settings;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", built ",
    env!("BUILD_TIME"),
    ")"
);

#[derive(Parser)]
#[command(name = "flotilla")]
#[command(about = "Coordinate app deployments across independent peer nodes")]
#[command(version, long_version = LONG_VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a packaged artifact and record it as deployed
    Deploy {
        /// Path to the artifact
        artifact: PathBuf,

        /// App name; defaults to the artifact's file stem
        #[arg(short, long)]
        name: Option<String>,

        /// Version tag to record
        #[arg(short, long, default_value = "latest")]
        version: String,

        /// Domain the app should be served under
        #[arg(short, long)]
        domain: Option<String>,
    },

    /// List applications and their current state
    Apps,

    /// Show an application's recorded versions
    Versions {
        /// App name
        app: String,
    },

    /// Start a recorded version of an application
    Start {
        app: String,

        /// Version tag to start
        #[arg(short, long, default_value = "latest")]
        version: String,
    },

    /// Stop a running application
    Stop {
        app: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Re-assert a previously recorded version
    Rollback {
        app: String,

        /// Version tag; the newest undeployed one when omitted
        version: Option<String>,

        /// Domain override for the re-asserted version
        #[arg(short, long)]
        domain: Option<String>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Record an application as deleted
    Delete {
        app: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Show connected peers and local machine stats
    Node,

    /// Follow announcements and track live state
    Listen,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let layout = StorageLayout::default();
    let settings = match Settings::load(&layout.settings_file()).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            process::exit(1);
        }
    };

    // Listen mode also writes logs to disk; one-shot commands stay on stderr
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        file_dir: matches!(&cli.command, Commands::Listen).then(|| layout.logs_dir()),
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let ctx = match CommandContext::new(settings) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Deploy {
            artifact,
            name,
            version,
            domain,
        } => {
            commands::deploy::run(
                ctx,
                commands::deploy::DeployArgs {
                    artifact,
                    name,
                    version,
                    domain,
                },
            )
            .await
        }
        Commands::Apps => commands::apps::run(ctx).await,
        Commands::Versions { app } => {
            commands::versions::run(ctx, commands::versions::VersionsArgs { app }).await
        }
        Commands::Start { app, version } => {
            commands::start::run(ctx, commands::start::StartArgs { app, version }).await
        }
        Commands::Stop { app, force } => {
            commands::stop::run(ctx, commands::stop::StopArgs { app, force }).await
        }
        Commands::Rollback {
            app,
            version,
            domain,
            force,
        } => {
            commands::rollback::run(
                ctx,
                commands::rollback::RollbackArgs {
                    app,
                    version,
                    domain,
                    force,
                },
            )
            .await
        }
        Commands::Delete { app, force } => {
            commands::delete::run(ctx, commands::delete::DeleteArgs { app, force }).await
        }
        Commands::Node => commands::node::run(ctx).await,
        Commands::Listen => commands::listen::run(ctx).await,
    };

    if let Err(e) = result {
        report(&e);
        process::exit(1);
    }
}

fn report(err: &anyhow::Error) {
    if let Some(registry_err) = err.downcast_ref::<RegistryError>() {
        // Expected conditions read better without the context chain
        if registry_err.is_user_facing() {
            eprintln!("{} {}", "error:".red().bold(), registry_err);
        } else {
            eprintln!("{} {:#}", "error:".red().bold(), err);
        }
        if let Some(hint) = hint_for(registry_err) {
            eprintln!("{}", hint.dimmed());
        }
        return;
    }
    eprintln!("{} {:#}", "error:".red().bold(), err);
}

fn hint_for(err: &RegistryError) -> Option<String> {
    match err {
        RegistryError::VersionNotFound { app_name, .. }
        | RegistryError::NoPreviousVersion(app_name) => Some(format!(
            "Run `flotilla versions {app_name}` to see what is recorded."
        )),
        RegistryError::NoVersionsFound(_) => Some(
            "Nothing is recorded under that name. Deploy first with `flotilla deploy`.".to_string(),
        ),
        RegistryError::StorageUnavailable(_) => Some(
            "Is the local node daemon running? Check node.api_url in settings.json.".to_string(),
        ),
        _ => None,
    }
}
