//! Carousel slide data stored in the `carousel_data` shop metafield.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::rust::double_option;

/// Group used for values saved before slides were grouped.
pub const DEFAULT_GROUP: &str = "default";

/// One carousel slide.
///
/// Fields the app does not know about are kept so that saving never drops
/// data written by a newer theme block. Known fields distinguish absent
/// (`None`) from an explicit `null` (`Some(None)`) so both survive a save.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub title: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub subtitle: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub image_url: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub link: Option<Option<String>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Slide {
    #[must_use]
    pub fn title_text(&self) -> Option<&str> {
        self.title.as_ref().and_then(Option::as_deref)
    }

    #[must_use]
    pub fn subtitle_text(&self) -> Option<&str> {
        self.subtitle.as_ref().and_then(Option::as_deref)
    }

    #[must_use]
    pub fn link_text(&self) -> Option<&str> {
        self.link.as_ref().and_then(Option::as_deref)
    }
}

/// Slides keyed by carousel group id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CarouselData(pub BTreeMap<String, Vec<Slide>>);

/// Accepted shapes of a stored or submitted value.
#[derive(Deserialize)]
#[serde(untagged)]
enum CarouselValue {
    Grouped(BTreeMap<String, Vec<Slide>>),
    Legacy(Vec<Slide>),
}

impl From<CarouselValue> for CarouselData {
    fn from(value: CarouselValue) -> Self {
        match value {
            CarouselValue::Grouped(groups) => Self(groups),
            CarouselValue::Legacy(slides) => {
                Self(BTreeMap::from([(DEFAULT_GROUP.to_string(), slides)]))
            }
        }
    }
}

impl CarouselData {
    /// Parse JSON submitted by the editor.
    ///
    /// A bare array of slides is accepted as the `default` group.
    ///
    /// # Errors
    ///
    /// Returns the parse error if `raw` is neither a group map nor a slide
    /// array.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<CarouselValue>(raw).map(Self::from)
    }

    /// Read a stored metafield value. Unreadable values load as empty.
    #[must_use]
    pub fn from_stored(raw: &str) -> Self {
        Self::parse(raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Stored carousel data is not valid JSON, treating as empty");
            Self::default()
        })
    }

    /// Serialize for storage.
    ///
    /// # Errors
    ///
    /// Returns an error if a slide holds a value that cannot be serialized.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }

    /// Whether there are no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of slides across groups.
    #[must_use]
    pub fn slide_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_grouped_round_trip() {
        let raw = r#"{"home":[{"title":"A","imageUrl":"https://cdn/a.jpg","link":"/a","badge":"new"}],"sale":[]}"#;
        let data = CarouselData::parse(raw).unwrap();

        assert_eq!(data.slide_count(), 1);
        let first = &data.0["home"][0];
        assert_eq!(first.image_url, Some(Some("https://cdn/a.jpg".to_string())));
        assert_eq!(first.extra["badge"], "new");

        let reparsed = CarouselData::parse(&data.to_json().unwrap()).unwrap();
        assert_eq!(reparsed, data);
        assert_eq!(
            serde_json::from_str::<Value>(&data.to_json().unwrap()).unwrap(),
            serde_json::from_str::<Value>(raw).unwrap()
        );
    }

    #[test]
    fn test_explicit_nulls_survive_round_trip() {
        let raw = r#"{"g":[{"title":null,"subtitle":"x","imageUrl":"","link":"/a"},{"link":null}]}"#;
        let data = CarouselData::parse(raw).unwrap();

        let first = &data.0["g"][0];
        assert_eq!(first.title, Some(None));
        assert_eq!(first.title_text(), None);
        assert_eq!(first.image_url, Some(Some(String::new())));
        assert_eq!(data.0["g"][1].title, None);

        assert_eq!(
            serde_json::from_str::<Value>(&data.to_json().unwrap()).unwrap(),
            serde_json::from_str::<Value>(raw).unwrap()
        );
    }

    #[test]
    fn test_legacy_array_becomes_default_group() {
        let data = CarouselData::parse(r#"[{"title":"Only"}]"#).unwrap();
        assert_eq!(data.0.len(), 1);
        assert_eq!(data.0[DEFAULT_GROUP][0].title_text(), Some("Only"));
    }

    #[test]
    fn test_invalid_stored_value_is_empty() {
        assert!(CarouselData::from_stored("{not json").is_empty());
        assert!(CarouselData::from_stored("42").is_empty());
    }

    #[test]
    fn test_parse_rejects_scalars() {
        assert!(CarouselData::parse("\"text\"").is_err());
        assert!(CarouselData::parse("{\"group\": 1}").is_err());
    }
}
