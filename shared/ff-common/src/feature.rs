//! Gated Features
//!
//! Desktop features that require a paid license, and the tier each one needs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Tier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    FindDuplicates,
    AutoOrganize,
    RenameFiles,
    ClearDatabase,
    ImportDatabase,
    ExportDatabase,
    #[serde(rename = "show_cleanup_suggestions")]
    CleanupSuggestions,
}

impl Feature {
    pub const ALL: [Self; 7] = [
        Self::FindDuplicates,
        Self::AutoOrganize,
        Self::RenameFiles,
        Self::ClearDatabase,
        Self::ImportDatabase,
        Self::ExportDatabase,
        Self::CleanupSuggestions,
    ];

    /// Stable identifier used by the desktop app and the CLI.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::FindDuplicates => "find_duplicates",
            Self::AutoOrganize => "auto_organize",
            Self::RenameFiles => "rename_files",
            Self::ClearDatabase => "clear_database",
            Self::ImportDatabase => "import_database",
            Self::ExportDatabase => "export_database",
            Self::CleanupSuggestions => "show_cleanup_suggestions",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::FindDuplicates => "Duplicate Finder",
            Self::AutoOrganize => "Auto Organize",
            Self::RenameFiles => "Smart File Renaming",
            Self::ClearDatabase => "Database Management",
            Self::ImportDatabase => "Database Import",
            Self::ExportDatabase => "Database Export",
            Self::CleanupSuggestions => "Cleanup Suggestions",
        }
    }

    /// Lowest tier that unlocks this feature.
    #[must_use]
    pub const fn required_tier(self) -> Tier {
        match self {
            Self::FindDuplicates | Self::RenameFiles | Self::CleanupSuggestions => Tier::Pro,
            Self::AutoOrganize
            | Self::ClearDatabase
            | Self::ImportDatabase
            | Self::ExportDatabase => Tier::Premium,
        }
    }

    #[must_use]
    pub fn is_available_in(self, tier: Tier) -> bool {
        tier >= self.required_tier()
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Feature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|feature| feature.id() == s)
            .ok_or_else(|| Error::UnknownFeature(s.to_string()))
    }
}
