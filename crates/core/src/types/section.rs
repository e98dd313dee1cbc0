//! Section install actions.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned for an unrecognized action string.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid action: {0}")]
pub struct SectionActionError(pub String);

/// What to do with a section on a theme.
///
/// Older dashboard builds posted `enable` / `disable`, so both spellings
/// are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionAction {
    /// Upload the section and record it as installed.
    #[serde(alias = "enable")]
    Activate,
    /// Remove the section and clear the installed flag.
    #[serde(alias = "disable")]
    Deactivate,
}

impl SectionAction {
    /// Returns the canonical action name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Activate => "activate",
            Self::Deactivate => "deactivate",
        }
    }
}

impl fmt::Display for SectionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SectionAction {
    type Err = SectionActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "activate" | "enable" => Ok(Self::Activate),
            "deactivate" | "disable" => Ok(Self::Deactivate),
            other => Err(SectionActionError(other.to_string())),
        }
    }
}
