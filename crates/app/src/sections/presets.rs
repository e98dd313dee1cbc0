//! `{% schema %}` handling for section Liquid.
//!
//! The theme editor only lists a section under "Add section" when its schema
//! declares `presets`. Sections shipped without them get a single default
//! preset injected at install time.

use std::ops::Range;

use serde_json::{Map, Value, json};

/// Locate the JSON body of the `{% schema %}` block.
///
/// Returns the byte range of the body within `source` and the body itself.
/// Whitespace-control forms (`{%- schema -%}`) are recognized.
#[must_use]
pub fn find_schema(source: &str) -> Option<(Range<usize>, &str)> {
    let open = find_tag(source, "schema", 0)?;
    let close = find_tag(source, "endschema", open.end)?;
    let range = open.end..close.start;
    source.get(range.clone()).map(|body| (range, body))
}

/// Return `source` with a default preset added if the schema has none.
///
/// The preset is named after the schema's `name`, or `fallback_name` when
/// the schema has no name. Sources without a schema, or with a schema that is
/// not a JSON object, are returned unchanged.
#[must_use]
pub fn ensure_presets(source: &str, fallback_name: &str) -> String {
    let Some((range, body)) = find_schema(source) else {
        return source.to_string();
    };

    let mut schema: Map<String, Value> = match serde_json::from_str(body) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            tracing::warn!(section = fallback_name, "Section schema is not a JSON object");
            return source.to_string();
        }
        Err(e) => {
            tracing::warn!(section = fallback_name, error = %e, "Failed to parse section schema");
            return source.to_string();
        }
    };

    if schema.contains_key("presets") {
        return source.to_string();
    }

    let name = schema
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .unwrap_or(fallback_name)
        .to_string();
    schema.insert(
        "presets".to_string(),
        json!([{ "name": name, "settings": {} }]),
    );

    let Ok(rendered) = serde_json::to_string_pretty(&Value::Object(schema)) else {
        return source.to_string();
    };

    let (head, tail) = (source.split_at(range.start).0, source.split_at(range.end).1);
    format!("{head}\n{rendered}\n{tail}")
}

/// Find a `{% name %}` tag at or after `from`, returning its full byte range.
fn find_tag(source: &str, name: &str, from: usize) -> Option<Range<usize>> {
    let mut cursor = from;
    while let Some(offset) = source.get(cursor..)?.find("{%") {
        let start = cursor + offset;
        let rest = source.get(start + 2..)?;

        let inner = rest.strip_prefix('-').unwrap_or(rest).trim_start();
        let word_len = inner
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(inner.len());
        let (word, after) = inner.split_at(word_len);
        let after = after.trim_start();
        let after = after.strip_prefix('-').unwrap_or(after);

        if word == name && after.starts_with("%}") {
            let end = source.len() - after.len() + 2;
            return Some(start..end);
        }

        cursor = start + 2;
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const WITHOUT_PRESETS: &str = r#"<div>{{ section.settings.heading }}</div>
{% schema %}
{
  "name": "Banner",
  "settings": [{"type": "text", "id": "heading", "label": "Heading"}]
}
{% endschema %}
"#;

    fn schema_json(source: &str) -> Value {
        let (_, body) = find_schema(source).unwrap();
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_find_schema_whitespace_control() {
        let source = "a{%- schema -%}{\"name\":\"x\"}{%- endschema -%}b";
        let (range, body) = find_schema(source).unwrap();
        assert_eq!(body, "{\"name\":\"x\"}");
        assert_eq!(&source[range], body);
    }

    #[test]
    fn test_find_schema_skips_other_tags() {
        let source = "{% if x %}{% endif %}{% schema %}{}{% endschema %}";
        let (_, body) = find_schema(source).unwrap();
        assert_eq!(body, "{}");
    }

    #[test]
    fn test_find_schema_missing() {
        assert!(find_schema("<div>no schema</div>").is_none());
        assert!(find_schema("{% schema %}{} no end").is_none());
    }

    #[test]
    fn test_injects_default_preset() {
        let out = ensure_presets(WITHOUT_PRESETS, "banner-id");
        let schema = schema_json(&out);

        assert_eq!(schema["presets"], json!([{"name": "Banner", "settings": {}}]));
        assert_eq!(schema["settings"][0]["id"], "heading");
        assert!(out.starts_with("<div>{{ section.settings.heading }}</div>"));
        assert!(out.trim_end().ends_with("{% endschema %}"));
    }

    #[test]
    fn test_preset_falls_back_to_id() {
        let source = "{% schema %}{\"settings\": []}{% endschema %}";
        let schema = schema_json(&ensure_presets(source, "banner-id"));
        assert_eq!(schema["presets"][0]["name"], "banner-id");
    }

    #[test]
    fn test_existing_presets_untouched() {
        let source = "{% schema %}{\"name\":\"A\",\"presets\":[{\"name\":\"A\"}]}{% endschema %}";
        assert_eq!(ensure_presets(source, "a"), source);
    }

    #[test]
    fn test_invalid_schema_untouched() {
        let source = "{% schema %}{ not json {% endschema %}";
        assert_eq!(ensure_presets(source, "a"), source);
    }
}
