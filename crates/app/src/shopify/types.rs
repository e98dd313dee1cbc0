//! Shopify Admin API domain types.
//!
//! These are the shapes the app works with after unwrapping REST envelopes
//! (`{"themes": [...]}`, `{"asset": {...}}`) and GraphQL payloads.

use serde::{Deserialize, Serialize};
use shopi_section_core::ThemeId;

/// Theme role as reported by the REST API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeRole {
    /// The published theme.
    Main,
    /// A theme in the library that is not published.
    Unpublished,
    /// A theme store demo.
    Demo,
    /// A development theme created by the CLI.
    Development,
    /// Any role this app does not know about.
    #[serde(other)]
    Other,
}

impl ThemeRole {
    /// Role name as Shopify spells it.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Unpublished => "unpublished",
            Self::Demo => "demo",
            Self::Development => "development",
            Self::Other => "other",
        }
    }
}

/// A storefront theme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    /// Numeric theme ID.
    pub id: ThemeId,
    /// Theme name shown in the admin.
    pub name: String,
    /// Publication role.
    pub role: ThemeRole,
    /// True while Shopify is still unpacking an uploaded theme.
    #[serde(default)]
    pub processing: bool,
}

impl Theme {
    /// Whether this is the published theme.
    #[must_use]
    pub fn is_main(&self) -> bool {
        self.role == ThemeRole::Main
    }
}

/// A file stored in a theme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    /// Theme-relative path.
    pub key: String,
    /// Text content; absent for binary assets and in write responses.
    #[serde(default)]
    pub value: Option<String>,
    /// Theme the asset belongs to.
    #[serde(default)]
    pub theme_id: Option<ThemeId>,
    /// MIME type.
    #[serde(default)]
    pub content_type: Option<String>,
    /// Last modification time (ISO 8601).
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// A stored metafield value with its optimistic-concurrency digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metafield {
    /// Raw string value (JSON for `json` metafields).
    pub value: String,
    /// Digest to pass back as `compareDigest` on the next write.
    pub compare_digest: Option<String>,
}

/// A shop-owned metafield lookup result.
#[derive(Debug, Clone)]
pub struct ShopMetafield {
    /// Shop GID, used as `ownerId` when writing.
    pub shop_id: String,
    /// The metafield, if it has ever been written.
    pub metafield: Option<Metafield>,
}

/// Precondition attached to a metafield write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCondition {
    /// Overwrite whatever is stored.
    Unconditional,
    /// Only write if the metafield does not exist yet.
    Absent,
    /// Only write if the stored value still has this `compareDigest`.
    Digest(String),
}

impl WriteCondition {
    /// Condition matching a previous read.
    #[must_use]
    pub fn from_read(metafield: Option<&Metafield>) -> Self {
        match metafield {
            None => Self::Absent,
            Some(m) => m
                .compare_digest
                .clone()
                .map_or(Self::Unconditional, Self::Digest),
        }
    }

    /// Wire form of `compareDigest`: omitted, `null`, or a digest.
    #[must_use]
    pub fn compare_digest(&self) -> Option<Option<String>> {
        match self {
            Self::Unconditional => None,
            Self::Absent => Some(None),
            Self::Digest(d) => Some(Some(d.clone())),
        }
    }
}

/// Input for a single `metafieldsSet` entry.
#[derive(Debug, Clone)]
pub struct MetafieldWrite<'a> {
    /// Owner GID (the shop).
    pub owner_id: &'a str,
    /// Metafield namespace.
    pub namespace: &'a str,
    /// Metafield key.
    pub key: &'a str,
    /// Serialized JSON value.
    pub value: String,
    /// Precondition checked by Shopify before writing.
    pub condition: WriteCondition,
}
