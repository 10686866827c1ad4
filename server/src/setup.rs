//! Environment Setup
//!
//! `ff-server init-env`: creates a `.env` from the template with fresh
//! webhook secrets filled in.

use std::path::Path;

use anyhow::{Context, Result};

use crate::webhooks::signing::generate_signing_secret;

/// Template shipped with the repository, used when no template file is found.
pub const BUNDLED_TEMPLATE: &str = include_str!("../../.env.example");

/// Variables that receive a generated secret when left as placeholders.
const GENERATED_SECRETS: [&str; 2] = ["APPSUMO_WEBHOOK_SECRET", "GUMROAD_WEBHOOK_SECRET"];

/// What `init_env` did.
#[derive(Debug, PartialEq, Eq)]
pub enum InitOutcome {
    /// The target already existed and was left untouched.
    AlreadyExists,
    /// The target was written; lists the variables given generated secrets.
    Created { generated: Vec<String> },
}

/// Create `target` from `template` (or the bundled template) unless it exists.
pub fn init_env(target: &Path, template: &Path) -> Result<InitOutcome> {
    if target.exists() {
        return Ok(InitOutcome::AlreadyExists);
    }

    let contents = if template.exists() {
        std::fs::read_to_string(template)
            .with_context(|| format!("Failed to read {}", template.display()))?
    } else {
        tracing::debug!(template = %template.display(), "Template not found, using bundled copy");
        BUNDLED_TEMPLATE.to_string()
    };

    let (rendered, generated) = fill_secrets(&contents);

    std::fs::write(target, rendered)
        .with_context(|| format!("Failed to write {}", target.display()))?;

    Ok(InitOutcome::Created { generated })
}

/// Replace placeholder secret values with generated ones.
fn fill_secrets(template: &str) -> (String, Vec<String>) {
    let mut generated = Vec::new();
    let mut out = String::with_capacity(template.len() + 128);

    for line in template.lines() {
        let replaced = line.split_once('=').and_then(|(name, value)| {
            let name = name.trim();
            (GENERATED_SECRETS.contains(&name) && is_placeholder(value)).then(|| {
                generated.push(name.to_string());
                format!("{name}={}", generate_signing_secret())
            })
        });
        out.push_str(replaced.as_deref().unwrap_or(line));
        out.push('\n');
    }

    (out, generated)
}

fn is_placeholder(value: &str) -> bool {
    let value = value.trim().trim_matches('"');
    value.is_empty() || value.starts_with("YOUR_")
}
