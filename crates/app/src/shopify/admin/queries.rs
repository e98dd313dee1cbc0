//! GraphQL operations for the Shopify Admin API.
//!
//! Each operation implements `graphql_client::GraphQLQuery` with a module
//! holding its `Variables` and `ResponseData`, the same layout the derive
//! macro generates. The app only touches a handful of fields, so the
//! response types are written out instead of generated from the full Admin
//! schema.

use graphql_client::{GraphQLQuery, QueryBody};

// =============================================================================
// Theme files
// =============================================================================

/// `themeFilesUpsert` mutation (Online Store 2.0 asset writes).
pub struct ThemeFilesUpsert;

pub mod theme_files_upsert {
    use serde::{Deserialize, Serialize};

    pub const OPERATION_NAME: &str = "ThemeFilesUpsert";
    pub const QUERY: &str = r"mutation ThemeFilesUpsert($themeId: ID!, $files: [OnlineStoreThemeFilesUpsertFileInput!]!) {
  themeFilesUpsert(themeId: $themeId, files: $files) {
    upsertedThemeFiles {
      filename
    }
    userErrors {
      filename
      code
      message
    }
  }
}";

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub theme_id: String,
        pub files: Vec<FileInput>,
    }

    #[derive(Debug, Clone, Serialize)]
    pub struct FileInput {
        pub filename: String,
        pub body: FileBody,
    }

    #[derive(Debug, Clone, Serialize)]
    pub struct FileBody {
        #[serde(rename = "type")]
        pub body_type: BodyType,
        pub value: String,
    }

    #[derive(Debug, Clone, Copy, Serialize)]
    #[allow(clippy::upper_case_acronyms)]
    pub enum BodyType {
        TEXT,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub theme_files_upsert: Option<Payload>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Payload {
        #[serde(default)]
        pub upserted_theme_files: Option<Vec<UpsertedFile>>,
        #[serde(default)]
        pub user_errors: Vec<UserError>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct UpsertedFile {
        pub filename: String,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct UserError {
        pub filename: Option<String>,
        pub code: Option<String>,
        pub message: String,
    }
}

impl GraphQLQuery for ThemeFilesUpsert {
    type Variables = theme_files_upsert::Variables;
    type ResponseData = theme_files_upsert::ResponseData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: theme_files_upsert::QUERY,
            operation_name: theme_files_upsert::OPERATION_NAME,
        }
    }
}

// =============================================================================
// Metafields
// =============================================================================

/// Read one shop-owned metafield together with the shop's GID.
pub struct GetShopMetafield;

pub mod get_shop_metafield {
    use serde::{Deserialize, Serialize};

    pub const OPERATION_NAME: &str = "GetShopMetafield";
    pub const QUERY: &str = r"query GetShopMetafield($namespace: String!, $key: String!) {
  shop {
    id
    metafield(namespace: $namespace, key: $key) {
      id
      value
      compareDigest
    }
  }
}";

    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub namespace: String,
        pub key: String,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct ResponseData {
        pub shop: Shop,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct Shop {
        pub id: String,
        pub metafield: Option<Metafield>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Metafield {
        pub id: String,
        pub value: String,
        #[serde(default)]
        pub compare_digest: Option<String>,
    }
}

impl GraphQLQuery for GetShopMetafield {
    type Variables = get_shop_metafield::Variables;
    type ResponseData = get_shop_metafield::ResponseData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: get_shop_metafield::QUERY,
            operation_name: get_shop_metafield::OPERATION_NAME,
        }
    }
}

/// `metafieldsSet` mutation with optional `compareDigest`.
pub struct MetafieldsSet;

pub mod metafields_set {
    use serde::{Deserialize, Serialize};

    pub const OPERATION_NAME: &str = "MetafieldsSet";
    pub const QUERY: &str = r"mutation MetafieldsSet($metafields: [MetafieldsSetInput!]!) {
  metafieldsSet(metafields: $metafields) {
    metafields {
      key
      namespace
      value
      compareDigest
    }
    userErrors {
      field
      message
      code
    }
  }
}";

    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub metafields: Vec<MetafieldsSetInput>,
    }

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MetafieldsSetInput {
        pub owner_id: String,
        pub namespace: String,
        pub key: String,
        #[serde(rename = "type")]
        pub metafield_type: String,
        pub value: String,
        /// Omitted for unconditional writes; `null` asserts that the
        /// metafield does not exist yet.
        #[serde(skip_serializing_if = "Option::is_none")]
        pub compare_digest: Option<Option<String>>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub metafields_set: Option<Payload>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Payload {
        #[serde(default)]
        pub metafields: Option<Vec<Metafield>>,
        #[serde(default)]
        pub user_errors: Vec<UserError>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Metafield {
        pub key: String,
        pub namespace: String,
        pub value: String,
        #[serde(default)]
        pub compare_digest: Option<String>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct UserError {
        pub field: Option<Vec<String>>,
        pub message: String,
        pub code: Option<String>,
    }
}

impl GraphQLQuery for MetafieldsSet {
    type Variables = metafields_set::Variables;
    type ResponseData = metafields_set::ResponseData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: metafields_set::QUERY,
            operation_name: metafields_set::OPERATION_NAME,
        }
    }
}

// =============================================================================
// App installation
// =============================================================================

/// Scopes granted to the current app installation.
pub struct GetAppAccessScopes;

pub mod get_app_access_scopes {
    use serde::{Deserialize, Serialize};

    pub const OPERATION_NAME: &str = "GetAppAccessScopes";
    pub const QUERY: &str = r"query GetAppAccessScopes {
  currentAppInstallation {
    accessScopes {
      handle
    }
  }
}";

    #[derive(Debug, Clone, Serialize)]
    pub struct Variables;

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub current_app_installation: AppInstallation,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AppInstallation {
        pub access_scopes: Vec<AccessScope>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct AccessScope {
        pub handle: String,
    }
}

impl GraphQLQuery for GetAppAccessScopes {
    type Variables = get_app_access_scopes::Variables;
    type ResponseData = get_app_access_scopes::ResponseData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: get_app_access_scopes::QUERY,
            operation_name: get_app_access_scopes::OPERATION_NAME,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_files_upsert_body() {
        let body = ThemeFilesUpsert::build_query(theme_files_upsert::Variables {
            theme_id: "gid://shopify/OnlineStoreTheme/1".to_string(),
            files: vec![theme_files_upsert::FileInput {
                filename: "sections/a.liquid".to_string(),
                body: theme_files_upsert::FileBody {
                    body_type: theme_files_upsert::BodyType::TEXT,
                    value: "<div></div>".to_string(),
                },
            }],
        });

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["operationName"], "ThemeFilesUpsert");
        assert_eq!(json["variables"]["themeId"], "gid://shopify/OnlineStoreTheme/1");
        assert_eq!(json["variables"]["files"][0]["body"]["type"], "TEXT");
    }

    #[test]
    fn test_metafields_set_absent_sends_null_digest() {
        let body = MetafieldsSet::build_query(metafields_set::Variables {
            metafields: vec![metafields_set::MetafieldsSetInput {
                owner_id: "gid://shopify/Shop/1".to_string(),
                namespace: "shopi_section".to_string(),
                key: "installed_sections".to_string(),
                metafield_type: "json".to_string(),
                value: "[]".to_string(),
                compare_digest: Some(None),
            }],
        });

        let json = serde_json::to_value(&body).unwrap();
        let input = &json["variables"]["metafields"][0];
        assert_eq!(input["ownerId"], "gid://shopify/Shop/1");
        assert_eq!(input["type"], "json");
        assert!(input["compareDigest"].is_null());
        assert!(input.as_object().unwrap().contains_key("compareDigest"));
    }

    #[test]
    fn test_metafields_set_unconditional_omits_digest() {
        let body = MetafieldsSet::build_query(metafields_set::Variables {
            metafields: vec![metafields_set::MetafieldsSetInput {
                owner_id: "gid://shopify/Shop/1".to_string(),
                namespace: "shopi_section".to_string(),
                key: "carousel_data".to_string(),
                metafield_type: "json".to_string(),
                value: "{}".to_string(),
                compare_digest: None,
            }],
        });

        let json = serde_json::to_value(&body).unwrap();
        let input = json["variables"]["metafields"][0].as_object().unwrap();
        assert!(!input.contains_key("compareDigest"));
    }
}
