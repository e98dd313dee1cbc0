//! Home page template (`templates/index.json`) editing.
//!
//! Activating a section also places an instance of it at the top of the home
//! page so the merchant sees it immediately in the theme editor; deactivating
//! removes every instance of its type.

use serde_json::{Map, Value, json};
use shopi_section_core::{AssetKey, ThemeId};
use thiserror::Error;
use tracing::instrument;

use crate::shopify::{AdminShopifyError, ShopAdmin};

/// Theme-relative path of the home page template.
pub const HOME_TEMPLATE: &str = "templates/index.json";

/// Errors while editing a JSON template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Shopify call failed.
    #[error(transparent)]
    Shopify(#[from] AdminShopifyError),

    /// Template is not valid JSON.
    #[error("template is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Template JSON lacks the expected structure.
    #[error("template has no {0}")]
    Shape(&'static str),
}

impl TemplateError {
    /// Whether the shop must re-run OAuth.
    #[must_use]
    pub const fn requires_reauth(&self) -> bool {
        matches!(self, Self::Shopify(e) if e.requires_reauth())
    }
}

/// Instance id used for auto-added sections.
#[must_use]
pub fn auto_instance_id(section_id: &str) -> String {
    format!("{section_id}-auto")
}

/// Add an instance of `section_id` at the top of the template.
///
/// Does nothing (returns `false`) if any instance of that type already
/// exists.
///
/// # Errors
///
/// Returns `TemplateError::Shape` if `sections` is not an object or `order`
/// is not an array.
pub fn add_instance(template: &mut Value, section_id: &str) -> Result<bool, TemplateError> {
    let root = template
        .as_object_mut()
        .ok_or(TemplateError::Shape("top-level object"))?;

    let sections = sections_mut(root)?;
    if sections
        .values()
        .any(|s| s.get("type").and_then(Value::as_str) == Some(section_id))
    {
        return Ok(false);
    }

    let instance_id = auto_instance_id(section_id);
    if sections.contains_key(&instance_id) {
        return Ok(false);
    }
    sections.insert(
        instance_id.clone(),
        json!({ "type": section_id, "settings": {} }),
    );

    let order = order_mut(root)?;
    if !order.iter().any(|v| v.as_str() == Some(instance_id.as_str())) {
        order.insert(0, Value::String(instance_id));
    }
    Ok(true)
}

/// Remove every instance of `section_id` from the template.
///
/// # Errors
///
/// Returns `TemplateError::Shape` if `sections` is not an object or `order`
/// is not an array.
pub fn remove_instances(template: &mut Value, section_id: &str) -> Result<bool, TemplateError> {
    let root = template
        .as_object_mut()
        .ok_or(TemplateError::Shape("top-level object"))?;

    let sections = sections_mut(root)?;
    let doomed: Vec<String> = sections
        .iter()
        .filter(|(_, s)| s.get("type").and_then(Value::as_str) == Some(section_id))
        .map(|(key, _)| key.clone())
        .collect();

    if doomed.is_empty() {
        return Ok(false);
    }
    for key in &doomed {
        sections.remove(key);
    }

    let order = order_mut(root)?;
    order.retain(|v| v.as_str().is_none_or(|key| !doomed.iter().any(|d| d == key)));
    Ok(true)
}

fn sections_mut(root: &mut Map<String, Value>) -> Result<&mut Map<String, Value>, TemplateError> {
    root.entry("sections")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or(TemplateError::Shape("sections object"))
}

fn order_mut(root: &mut Map<String, Value>) -> Result<&mut Vec<Value>, TemplateError> {
    root.entry("order")
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
        .ok_or(TemplateError::Shape("order array"))
}

/// Split Shopify's auto-generated `/* ... */` banner from the JSON body.
fn split_banner(raw: &str) -> (&str, &str) {
    let trimmed = raw.trim_start();
    if trimmed.starts_with("/*")
        && let Some(end) = trimmed.find("*/")
    {
        let split = raw.len() - trimmed.len() + end + 2;
        return raw.split_at(split);
    }
    ("", raw)
}

/// Apply `edit` to the theme's home template and save it if it changed.
///
/// A theme without `templates/index.json` (vintage themes) is left alone.
#[instrument(skip(admin, edit), fields(shop = %admin.shop_domain(), theme_id = %theme_id))]
async fn edit_home_template<F>(
    admin: &ShopAdmin,
    theme_id: ThemeId,
    edit: F,
) -> Result<bool, TemplateError>
where
    F: FnOnce(&mut Value) -> Result<bool, TemplateError> + Send,
{
    let key = AssetKey::parse(HOME_TEMPLATE).map_err(|_| TemplateError::Shape("template key"))?;
    let Some(asset) = admin.get_asset(theme_id, &key).await? else {
        tracing::debug!("Theme has no home template");
        return Ok(false);
    };
    let Some(raw) = asset.value else {
        return Ok(false);
    };

    let (banner, body) = split_banner(&raw);
    let mut template: Value = serde_json::from_str(body)?;
    if !edit(&mut template)? {
        return Ok(false);
    }

    let rendered = serde_json::to_string_pretty(&template)?;
    let value = if banner.is_empty() {
        rendered
    } else {
        format!("{banner}\n{rendered}")
    };
    admin.put_asset(theme_id, &key, &value).await?;
    Ok(true)
}

/// Put an instance of the section on the home page.
///
/// # Errors
///
/// Returns an error if the template cannot be read, parsed or saved.
pub async fn activate_on_home(
    admin: &ShopAdmin,
    theme_id: ThemeId,
    section_id: &str,
) -> Result<bool, TemplateError> {
    edit_home_template(admin, theme_id, |t| add_instance(t, section_id)).await
}

/// Remove every instance of the section from the home page.
///
/// # Errors
///
/// Returns an error if the template cannot be read, parsed or saved.
pub async fn deactivate_on_home(
    admin: &ShopAdmin,
    theme_id: ThemeId,
    section_id: &str,
) -> Result<bool, TemplateError> {
    edit_home_template(admin, theme_id, |t| remove_instances(t, section_id)).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn template() -> Value {
        json!({
            "sections": {
                "hero": {"type": "image-banner", "settings": {}},
                "featured": {"type": "featured-collection", "settings": {}}
            },
            "order": ["hero", "featured"]
        })
    }

    #[test]
    fn test_add_instance_goes_first() {
        let mut t = template();
        assert!(add_instance(&mut t, "3d-carousel-pro").unwrap());

        assert_eq!(t["order"][0], "3d-carousel-pro-auto");
        assert_eq!(t["sections"]["3d-carousel-pro-auto"]["type"], "3d-carousel-pro");
        assert_eq!(t["order"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_add_instance_skips_existing_type() {
        let mut t = template();
        t["sections"]["custom"] = json!({"type": "3d-carousel-pro"});
        assert!(!add_instance(&mut t, "3d-carousel-pro").unwrap());
        assert!(t["sections"].get("3d-carousel-pro-auto").is_none());
    }

    #[test]
    fn test_remove_all_instances() {
        let mut t = template();
        t["sections"]["a"] = json!({"type": "my-custom-section"});
        t["sections"]["b"] = json!({"type": "my-custom-section"});
        t["order"] = json!(["a", "hero", "b", "featured"]);

        assert!(remove_instances(&mut t, "my-custom-section").unwrap());
        assert_eq!(t["order"], json!(["hero", "featured"]));
        assert!(t["sections"].get("a").is_none());
        assert!(t["sections"].get("b").is_none());

        assert!(!remove_instances(&mut t, "my-custom-section").unwrap());
    }

    #[test]
    fn test_add_to_empty_template() {
        let mut t = json!({});
        assert!(add_instance(&mut t, "x").unwrap());
        assert_eq!(t["order"], json!(["x-auto"]));
    }

    #[test]
    fn test_bad_shape() {
        let mut t = json!({"sections": [], "order": []});
        assert!(matches!(
            add_instance(&mut t, "x"),
            Err(TemplateError::Shape(_))
        ));
    }

    #[test]
    fn test_split_banner() {
        let raw = "/*\n * auto-generated\n */\n{\"order\": []}";
        let (banner, body) = split_banner(raw);
        assert!(banner.starts_with("/*"));
        assert!(banner.ends_with("*/"));
        assert_eq!(body.trim(), "{\"order\": []}");

        let (banner, body) = split_banner("{}");
        assert!(banner.is_empty());
        assert_eq!(body, "{}");
    }
}
