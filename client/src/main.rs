//! `ff-license`: inspect and manage the FileFlow license on this machine.
//!
//! ```bash
//! ff-license activate ABCDE-12345-FGHIJ-67890
//! ff-license status
//! ff-license check-feature find_duplicates
//! ```

use std::process::ExitCode;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use ff_client::{ClientConfig, FeatureGate, LicenseCheck, LicenseManager};
use ff_common::{key, Feature};

#[derive(Parser, Debug)]
#[command(name = "ff-license")]
#[command(
    author,
    version,
    about = "Manage the FileFlow license on this machine",
    long_about = None
)]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Re-validate the stored license and show its details
    Status,
    /// Activate a license key
    Activate {
        /// License key from the purchase email
        key: String,
    },
    /// Mark the stored license inactive
    Deactivate,
    /// Generate a development key (activates offline only)
    TestKey,
    /// List gated features and whether the current license unlocks them
    Features,
    /// Check whether a single feature is unlocked
    CheckFeature {
        /// Feature id, e.g. `find_duplicates`
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ff_client=info".into()),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let mut manager = LicenseManager::new(ClientConfig::from_env()?)?;

    Ok(if run(cli.command, cli.json, &mut manager).await? {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Execute one subcommand; `false` maps to a failing exit status.
async fn run(command: Command, json: bool, manager: &mut LicenseManager) -> Result<bool> {
    let success = match command {
        Command::Status => {
            let check = manager.check().await?;
            report(&check, json)?;
            if !json {
                print_record(manager);
            }
            check.success
        }
        Command::Activate { key } => {
            let check = manager.activate(&key).await?;
            report(&check, json)?;
            check.success
        }
        Command::Deactivate => {
            let check = manager.deactivate()?;
            report(&check, json)?;
            check.success
        }
        Command::Features => {
            let check = manager.check().await?;
            let tier = if check.success {
                manager.effective_tier()
            } else {
                None
            };
            for feature in Feature::ALL {
                let available = tier.is_some_and(|t| feature.is_available_in(t));
                println!(
                    "{:<26} {:<9} {}",
                    feature.id(),
                    feature.required_tier().display_name(),
                    if available { "available" } else { "locked" }
                );
            }
            true
        }
        Command::CheckFeature { id } => {
            let feature: Feature = id.parse()?;
            match FeatureGate::ensure(manager, feature).await {
                Ok(tier) => {
                    println!(
                        "{} is available ({} license)",
                        feature.display_name(),
                        tier.display_name()
                    );
                    true
                }
                Err(locked) => {
                    println!("{locked}");
                    false
                }
            }
        }
        Command::TestKey => {
            let product_id = &manager.config().product_id;
            println!("{}", key::generate_test_key(product_id, Utc::now()));
            true
        }
    };
    Ok(success)
}

fn report(check: &LicenseCheck, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(check)?);
    } else {
        println!("{}", check.message);
    }
    Ok(())
}

fn print_record(manager: &LicenseManager) {
    let Some(record) = manager.record() else {
        return;
    };
    println!("License Key:  {}", record.license_key);
    println!("Activated On: {}", record.activation_date.to_rfc3339());
    println!(
        "Status:       {}",
        if record.is_active() { "active" } else { "inactive" }
    );
    if let Some(tier) = manager.effective_tier() {
        println!("Tier:         {}", tier.display_name());
    }
    if let Some(expires) = record.expires {
        println!("Expires:      {}", expires.to_rfc3339());
    }
}
