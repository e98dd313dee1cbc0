//! Catalog of installable theme sections.
//!
//! The Liquid sources are compiled into the binary. Installing a section
//! writes its source (with presets ensured) to `sections/{id}.liquid` in the
//! target theme.

mod presets;

use serde::Serialize;
use shopi_section_core::{AssetKey, AssetKeyError};

pub use presets::{ensure_presets, find_schema};

/// A section the app knows how to install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    /// Identifier used in forms, metafields and as the section type.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Short description for the dashboard card.
    pub description: &'static str,
    /// Liquid source as shipped.
    #[serde(skip)]
    pub source: &'static str,
}

/// Every section the app can install, in dashboard order.
pub const CATALOG: &[Section] = &[
    Section {
        id: "my-custom-section",
        name: "My Custom Section",
        description: "A customizable header banner with heading, text and a call-to-action button.",
        source: include_str!("../../liquid/my-custom-section.liquid"),
    },
    Section {
        id: "3d-carousel-pro",
        name: "3D Carousel Pro",
        description: "A 3D product carousel that showcases a collection with perspective cards.",
        source: include_str!("../../liquid/3d-carousel-pro.liquid"),
    },
];

/// Look up a catalog entry by identifier.
#[must_use]
pub fn lookup(id: &str) -> Option<&'static Section> {
    CATALOG.iter().find(|s| s.id == id)
}

impl Section {
    /// Theme asset key the section is installed under.
    ///
    /// # Errors
    ///
    /// Returns an error if the id does not form a valid asset path.
    pub fn asset_key(&self) -> Result<AssetKey, AssetKeyError> {
        AssetKey::parse(&format!("sections/{}.liquid", self.id))
    }

    /// Filename with non-alphanumeric characters stripped from the id.
    ///
    /// Last resort for the upload chain: some stores reject hyphenated or
    /// digit-leading section filenames through `themeFilesUpsert`.
    #[must_use]
    pub fn simplified_filename(&self) -> String {
        let stem: String = self
            .id
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect();
        format!("sections/{stem}.liquid")
    }

    /// Liquid source with a `presets` entry guaranteed in the schema.
    #[must_use]
    pub fn liquid_with_presets(&self) -> String {
        ensure_presets(self.source, self.id)
    }
}
