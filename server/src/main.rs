//! FileFlow License Server - Main Entry Point

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use ff_server::{api, config, setup};

#[derive(Parser)]
#[command(name = "ff-server", version, about = "FileFlow license fulfilment server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the webhook server (default)
    Serve,
    /// Create a .env file with freshly generated webhook secrets
    InitEnv {
        /// File to create
        #[arg(long, default_value = ".env")]
        path: PathBuf,
        /// Template to copy from
        #[arg(long, default_value = ".env.example")]
        template: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ff_server=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::InitEnv { path, template } => init_env(&path, &template),
    }
}

async fn serve() -> Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting FileFlow license server"
    );

    let state = api::AppState::from_config(config.clone())?;

    match &state.email {
        Some(email) => match email.test_connection().await {
            Ok(()) => info!("SMTP connection verified"),
            Err(e) => {
                tracing::warn!("SMTP connection test failed: {e}. Emails may not be delivered.");
            }
        },
        None => tracing::warn!("SMTP not configured. License keys will be logged, not emailed."),
    }

    // Build router
    let app = api::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "Server listening");

    // Graceful shutdown handler
    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal, cleaning up...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shutdown complete");

    Ok(())
}

fn init_env(path: &std::path::Path, template: &std::path::Path) -> Result<()> {
    match setup::init_env(path, template)? {
        setup::InitOutcome::AlreadyExists => {
            println!("{} already exists; leaving it untouched.", path.display());
        }
        setup::InitOutcome::Created { generated } => {
            println!("Created {}.", path.display());
            for name in generated {
                println!("  generated {name}");
            }
            println!();
            println!("Next steps:");
            println!("1. Fill in KEYGEN_ACCOUNT_ID and KEYGEN_API_KEY in {}", path.display());
            println!("2. Copy the webhook secrets into the AppSumo and Gumroad dashboards");
            println!("3. Run `ff-server` and point the storefronts at the webhook routes:");
            println!("   /webhook/appsumo and /webhook/gumroad");
            println!();
            println!("See docs/keygen-integration.md for details.");
        }
    }
    Ok(())
}
