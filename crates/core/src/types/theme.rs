//! Theme and theme asset identifiers.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`ThemeId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ThemeIdError {
    /// The input string is empty.
    #[error("theme id cannot be empty")]
    Empty,
    /// The input is not a positive integer or a theme GID.
    #[error("invalid theme id: {0}")]
    Invalid(String),
}

/// A Shopify theme ID.
///
/// The REST API uses the bare numeric ID, the GraphQL API a global ID. Both
/// forms parse into the same value.
///
/// ```
/// use shopi_section_core::ThemeId;
///
/// let id: ThemeId = "gid://shopify/OnlineStoreTheme/128".parse().unwrap();
/// assert_eq!(id, ThemeId::new(128));
/// assert_eq!(id.to_gid(), "gid://shopify/OnlineStoreTheme/128");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThemeId(u64);

impl ThemeId {
    /// Create a new theme ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the underlying numeric value.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Global ID for the GraphQL Admin API.
    #[must_use]
    pub fn to_gid(&self) -> String {
        format!("gid://shopify/OnlineStoreTheme/{}", self.0)
    }

    /// Parse a theme ID from a numeric string or a theme GID.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, not numeric, zero, or a GID
    /// for a resource other than a theme.
    pub fn parse(s: &str) -> Result<Self, ThemeIdError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ThemeIdError::Empty);
        }

        let numeric = match s.strip_prefix("gid://shopify/") {
            Some(rest) => rest
                .strip_prefix("OnlineStoreTheme/")
                .or_else(|| rest.strip_prefix("Theme/"))
                .ok_or_else(|| ThemeIdError::Invalid(s.to_string()))?,
            None => s,
        };

        match numeric.parse::<u64>() {
            Ok(id) if id > 0 => Ok(Self(id)),
            _ => Err(ThemeIdError::Invalid(s.to_string())),
        }
    }
}

impl fmt::Display for ThemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ThemeId {
    type Err = ThemeIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<u64> for ThemeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Errors that can occur when parsing an [`AssetKey`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetKeyError {
    /// The input string is empty.
    #[error("asset key cannot be empty")]
    Empty,
    /// The key must be `directory/file`.
    #[error("asset key must be a relative path like `sections/name.liquid`")]
    NotRelative,
    /// The key contains a parent-directory component.
    #[error("asset key cannot contain `..`")]
    Traversal,
}

/// A theme-relative asset path such as `sections/my-section.liquid`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetKey(String);

impl AssetKey {
    /// Parse an asset key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is empty, absolute, has no directory, or
    /// contains `..`.
    pub fn parse(s: &str) -> Result<Self, AssetKeyError> {
        if s.is_empty() {
            return Err(AssetKeyError::Empty);
        }
        if s.starts_with('/') || !s.contains('/') || s.ends_with('/') {
            return Err(AssetKeyError::NotRelative);
        }
        if s.split('/').any(|part| part == "..") {
            return Err(AssetKeyError::Traversal);
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The file name without its directory.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AssetKey {
    type Error = AssetKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AssetKey> for String {
    fn from(key: AssetKey) -> Self {
        key.0
    }
}
