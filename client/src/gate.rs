//! Feature Gate
//!
//! Premium features run only behind a successful license check and a tier
//! that includes them.

use ff_common::{Feature, Tier};
use thiserror::Error;
use tracing::warn;

use crate::manager::LicenseManager;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureLocked {
    #[error("The {} is a premium feature that requires a license.", .feature.display_name())]
    Unlicensed { feature: Feature },

    #[error(
        "The {} requires a {} license (current: {}).",
        .feature.display_name(),
        .required.display_name(),
        .current.display_name()
    )]
    TierTooLow {
        feature: Feature,
        required: Tier,
        current: Tier,
    },
}

impl FeatureLocked {
    #[must_use]
    pub const fn feature(&self) -> Feature {
        match self {
            Self::Unlicensed { feature } | Self::TierTooLow { feature, .. } => *feature,
        }
    }
}

pub struct FeatureGate;

impl FeatureGate {
    /// Check the license and return the tier unlocking `feature`.
    pub async fn ensure(
        manager: &mut LicenseManager,
        feature: Feature,
    ) -> Result<Tier, FeatureLocked> {
        let licensed = match manager.check().await {
            Ok(check) => check.success,
            Err(e) => {
                warn!(error = %e, "License check failed");
                false
            }
        };

        let current = match manager.effective_tier() {
            Some(tier) if licensed => tier,
            _ => return Err(FeatureLocked::Unlicensed { feature }),
        };

        let required = feature.required_tier();
        if !feature.is_available_in(current) {
            return Err(FeatureLocked::TierTooLow {
                feature,
                required,
                current,
            });
        }

        Ok(current)
    }

    /// Run `f` only when `feature` is unlocked.
    pub async fn run<T, F>(
        manager: &mut LicenseManager,
        feature: Feature,
        f: F,
    ) -> Result<T, FeatureLocked>
    where
        F: FnOnce(Tier) -> T,
    {
        let tier = Self::ensure(manager, feature).await?;
        Ok(f(tier))
    }
}
