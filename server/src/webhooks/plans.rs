//! Storefront Plan Mapping
//!
//! Maps what a storefront sold (AppSumo plan code, Gumroad product name) to a
//! license tier. Unknown plans fall back to [`Tier::DEFAULT_PAID`].

use std::fmt;

use ff_common::Tier;

/// Storefront a purchase webhook came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storefront {
    AppSumo,
    Gumroad,
}

impl Storefront {
    /// Value recorded as `source` in license metadata.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AppSumo => "appsumo",
            Self::Gumroad => "gumroad",
        }
    }

    /// Name used for customers who did not provide one.
    #[must_use]
    pub const fn default_customer_name(self) -> &'static str {
        match self {
            Self::AppSumo => "AppSumo Customer",
            Self::Gumroad => "Gumroad Customer",
        }
    }
}

impl fmt::Display for Storefront {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// AppSumo plan code assumed when a purchase carries none.
pub const APPSUMO_DEFAULT_PLAN: &str = "tier1";

/// Tier for an AppSumo plan code.
pub fn appsumo_tier(plan_id: &str) -> Tier {
    match plan_id {
        "tier1" => Tier::Pro,
        "tier2" => Tier::Premium,
        "tier3" => Tier::Business,
        _ => Tier::DEFAULT_PAID,
    }
}

/// Tier for a Gumroad product name.
pub fn gumroad_tier(product_name: &str) -> Tier {
    match product_name {
        "FileFlow-Pro" => Tier::Pro,
        "FileFlow-Premium" => Tier::Premium,
        "FileFlow-Business" => Tier::Business,
        _ => Tier::DEFAULT_PAID,
    }
}
