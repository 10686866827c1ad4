//! License Tiers

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// A named feature bundle sold through the storefronts.
///
/// Variants are declared in ascending order so that `Ord` reflects the
/// upgrade path (`Basic < Pro < Premium < Business`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Basic,
    Pro,
    Premium,
    Business,
}

impl Tier {
    /// Tier assumed when a plan is unknown or a valid license carries no tier.
    pub const DEFAULT_PAID: Self = Self::Premium;

    pub const ALL: [Self; 4] = [Self::Basic, Self::Pro, Self::Premium, Self::Business];

    /// Number of machines a license of this tier may be activated on.
    #[must_use]
    pub const fn max_machines(self) -> u32 {
        match self {
            Self::Basic | Self::Pro => 1,
            Self::Premium => 3,
            Self::Business => 5,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Pro => "pro",
            Self::Premium => "premium",
            Self::Business => "business",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Basic => "Basic",
            Self::Pro => "Pro",
            Self::Premium => "Premium",
            Self::Business => "Business",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|tier| tier.as_str() == lower)
            .ok_or_else(|| Error::UnknownTier(s.to_string()))
    }
}
