//! Section activation and deactivation through `POST /api/section`.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use httpmock::Method::{DELETE, GET, PUT};
use serde_json::json;
use shopi_section_integration_tests::{TestApp, admin_path, metafields};

const ASSETS: &str = "themes/5/assets.json";

async fn no_home_template(app: &TestApp) {
    app.shopify
        .mock_async(|when, then| {
            when.method(GET)
                .path(admin_path(ASSETS))
                .query_param("asset[key]", "templates/index.json");
            then.status(404);
        })
        .await;
}

#[tokio::test]
async fn test_activate_uploads_once_and_records_section() {
    let app = TestApp::installed().await;
    let upload = app
        .shopify
        .mock_async(|when, then| {
            when.method(PUT)
                .path(admin_path(ASSETS))
                .header("x-shopify-access-token", "shpat_integration")
                .body_contains("sections/3d-carousel-pro.liquid")
                .body_contains("presets");
            then.status(200)
                .json_body(json!({"asset": {"key": "sections/3d-carousel-pro.liquid"}}));
        })
        .await;
    metafields::stored(&app.shopify, "installed_sections", None).await;
    let record = metafields::writable(&app.shopify, "installed_sections").await;
    no_home_template(&app).await;

    let (status, _, body) = app
        .post_form(
            "/api/section",
            &[
                ("action", "activate"),
                ("themeId", "5"),
                ("sectionId", "3d-carousel-pro"),
            ],
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Section enabled and activated");
    assert_eq!(body["activation"]["uploadMethod"], "rest");
    assert_eq!(body["activation"]["recorded"], true);
    upload.assert_hits_async(1).await;
    record.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_activate_twice_leaves_metafield_alone() {
    let app = TestApp::installed().await;
    let upload = app
        .shopify
        .mock_async(|when, then| {
            when.method(PUT).path(admin_path(ASSETS));
            then.status(200)
                .json_body(json!({"asset": {"key": "sections/3d-carousel-pro.liquid"}}));
        })
        .await;
    metafields::stored(
        &app.shopify,
        "installed_sections",
        Some(r#"["3d-carousel-pro"]"#),
    )
    .await;
    let record = metafields::writable(&app.shopify, "installed_sections").await;
    no_home_template(&app).await;

    let (status, _, body) = app
        .post_form(
            "/api/section",
            &[
                ("actionType", "enable"),
                ("themeId", "gid://shopify/OnlineStoreTheme/5"),
                ("sectionId", "3d-carousel-pro"),
            ],
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["activation"]["recorded"], false);
    upload.assert_hits_async(1).await;
    record.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_deactivate_not_installed_succeeds() {
    let app = TestApp::installed().await;
    let delete = app
        .shopify
        .mock_async(|when, then| {
            when.method(DELETE)
                .path(admin_path(ASSETS))
                .query_param("asset[key]", "sections/my-custom-section.liquid");
            then.status(404);
        })
        .await;
    metafields::stored(&app.shopify, "installed_sections", None).await;
    let record = metafields::writable(&app.shopify, "installed_sections").await;
    no_home_template(&app).await;

    let (status, _, body) = app
        .post_form(
            "/api/section",
            &[
                ("action", "deactivate"),
                ("themeId", "5"),
                ("sectionId", "my-custom-section"),
            ],
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Section disabled and removed");
    assert_eq!(body["deactivation"]["assetDeleted"], false);
    assert_eq!(body["deactivation"]["unrecorded"], false);
    delete.assert_hits_async(1).await;
    record.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_unknown_section_is_rejected_without_calls() {
    let app = TestApp::installed().await;
    let any = app
        .shopify
        .mock_async(|when, then| {
            when.any_request();
            then.status(500);
        })
        .await;

    let (status, _, body) = app
        .post_form(
            "/api/section",
            &[
                ("action", "activate"),
                ("themeId", "5"),
                ("sectionId", "not-a-section"),
            ],
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("not-a-section"));
    any.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_missing_fields_and_bad_action() {
    let app = TestApp::installed().await;

    let (status, _, body) = app
        .post_form("/api/section", &[("action", "activate"), ("themeId", "5")])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing themeId or sectionId");

    let (status, _, body) = app
        .post_form(
            "/api/section",
            &[
                ("action", "explode"),
                ("themeId", "5"),
                ("sectionId", "3d-carousel-pro"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid action");
}

#[tokio::test]
async fn test_all_upload_methods_failing_is_bad_gateway() {
    let app = TestApp::installed().await;
    app.shopify
        .mock_async(|when, then| {
            when.method(PUT);
            then.status(404);
        })
        .await;
    let upsert = app
        .shopify
        .mock_async(|when, then| {
            when.path(admin_path("graphql.json"))
                .body_contains("ThemeFilesUpsert");
            then.status(200).json_body(json!({
                "data": {"themeFilesUpsert": {
                    "upsertedThemeFiles": [],
                    "userErrors": [{"filename": null, "code": "INVALID", "message": "Filename is invalid"}]
                }}
            }));
        })
        .await;

    let (status, _, body) = app
        .post_form(
            "/api/section",
            &[
                ("action", "activate"),
                ("themeId", "5"),
                ("sectionId", "3d-carousel-pro"),
            ],
        )
        .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].is_string());
    upsert.assert_hits_async(2).await;
}

#[tokio::test]
async fn test_themes_listing_reports_main_theme_sections() {
    let app = TestApp::installed().await;
    app.shopify
        .mock_async(|when, then| {
            when.method(GET).path(admin_path("themes.json"));
            then.status(200).json_body(json!({"themes": [
                {"id": 5, "name": "Dawn", "role": "main", "processing": false},
                {"id": 6, "name": "Dawn copy", "role": "unpublished", "processing": false}
            ]}));
        })
        .await;
    metafields::stored(
        &app.shopify,
        "installed_sections",
        Some(r#"["my-custom-section"]"#),
    )
    .await;

    let (status, body) = app.get_json("/api/themes").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["installedSections"], json!(["my-custom-section"]));
    assert_eq!(body["themes"][0]["installedSections"], json!(["my-custom-section"]));
    assert_eq!(body["themes"][1]["installedSections"], json!([]));
}

#[tokio::test]
async fn test_asset_check_reports_sections_per_theme() {
    let app = TestApp::installed().await;
    app.shopify
        .mock_async(|when, then| {
            when.method(GET).path(admin_path("themes.json"));
            then.status(200).json_body(json!({"themes": [
                {"id": 5, "name": "Dawn", "role": "main", "processing": false},
                {"id": 6, "name": "Dawn copy", "role": "unpublished", "processing": false}
            ]}));
        })
        .await;
    metafields::stored(
        &app.shopify,
        "installed_sections",
        Some(r#"["my-custom-section"]"#),
    )
    .await;
    for (theme, key, status) in [
        (5, "sections/my-custom-section.liquid", 200),
        (5, "sections/3d-carousel-pro.liquid", 200),
        (6, "sections/my-custom-section.liquid", 200),
        (6, "sections/3d-carousel-pro.liquid", 404),
    ] {
        app.shopify
            .mock_async(|when, then| {
                when.method(GET)
                    .path(admin_path(&format!("themes/{theme}/assets.json")))
                    .query_param("asset[key]", key);
                then.status(status)
                    .json_body(json!({"asset": {"key": key, "value": "{% schema %}{}{% endschema %}"}}));
            })
            .await;
    }

    let (status, body) = app.get_json("/api/themes?probe=true").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["installedSections"], json!(["my-custom-section"]));
    assert_eq!(
        body["themes"][0]["installedSections"],
        json!(["my-custom-section", "3d-carousel-pro"])
    );
    assert_eq!(body["themes"][1]["installedSections"], json!(["my-custom-section"]));
}

#[tokio::test]
async fn test_activate_places_section_on_home_page() {
    let app = TestApp::installed().await;
    app.shopify
        .mock_async(|when, then| {
            when.method(PUT)
                .path(admin_path(ASSETS))
                .body_contains("sections/3d-carousel-pro.liquid");
            then.status(200)
                .json_body(json!({"asset": {"key": "sections/3d-carousel-pro.liquid"}}));
        })
        .await;
    metafields::stored(&app.shopify, "installed_sections", None).await;
    metafields::writable(&app.shopify, "installed_sections").await;
    let template = r#"/*
 * IMPORTANT: This file is auto-generated by the theme editor.
 */
{"sections": {"hero": {"type": "image-banner", "settings": {}}}, "order": ["hero"]}"#;
    let read = app
        .shopify
        .mock_async(|when, then| {
            when.method(GET)
                .path(admin_path(ASSETS))
                .query_param("asset[key]", "templates/index.json");
            then.status(200).json_body(json!({
                "asset": {"key": "templates/index.json", "value": template}
            }));
        })
        .await;
    let save = app
        .shopify
        .mock_async(|when, then| {
            when.method(PUT)
                .path(admin_path(ASSETS))
                .body_contains("templates/index.json")
                .body_contains("IMPORTANT: This file is auto-generated")
                .body_contains("3d-carousel-pro-auto")
                .body_contains("hero");
            then.status(200)
                .json_body(json!({"asset": {"key": "templates/index.json"}}));
        })
        .await;

    let (status, _, body) = app
        .post_form(
            "/api/section",
            &[
                ("action", "activate"),
                ("themeId", "5"),
                ("sectionId", "3d-carousel-pro"),
            ],
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["activation"]["placedOnHome"], true);
    read.assert_hits_async(1).await;
    save.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_home_template_failure_does_not_fail_activation() {
    let app = TestApp::installed().await;
    let upload = app
        .shopify
        .mock_async(|when, then| {
            when.method(PUT)
                .path(admin_path(ASSETS))
                .body_contains("sections/3d-carousel-pro.liquid");
            then.status(200)
                .json_body(json!({"asset": {"key": "sections/3d-carousel-pro.liquid"}}));
        })
        .await;
    metafields::stored(&app.shopify, "installed_sections", None).await;
    let record = metafields::writable(&app.shopify, "installed_sections").await;
    app.shopify
        .mock_async(|when, then| {
            when.method(GET)
                .path(admin_path(ASSETS))
                .query_param("asset[key]", "templates/index.json");
            then.status(200).json_body(json!({
                "asset": {"key": "templates/index.json", "value": "{\"sections\":{},\"order\":[]}"}
            }));
        })
        .await;
    let save = app
        .shopify
        .mock_async(|when, then| {
            when.method(PUT)
                .path(admin_path(ASSETS))
                .body_contains("templates/index.json");
            then.status(500);
        })
        .await;

    let (status, _, body) = app
        .post_form(
            "/api/section",
            &[
                ("action", "activate"),
                ("themeId", "5"),
                ("sectionId", "3d-carousel-pro"),
            ],
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["activation"]["placedOnHome"], false);
    upload.assert_hits_async(1).await;
    record.assert_hits_async(1).await;
    save.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_contended_metafield_is_conflict() {
    let app = TestApp::installed().await;
    app.shopify
        .mock_async(|when, then| {
            when.method(PUT).path(admin_path(ASSETS));
            then.status(200)
                .json_body(json!({"asset": {"key": "sections/my-custom-section.liquid"}}));
        })
        .await;
    let read = metafields::stored(&app.shopify, "installed_sections", Some("[]")).await;
    let write = metafields::stale(&app.shopify, "installed_sections").await;

    let (status, _, body) = app
        .post_form(
            "/api/section",
            &[
                ("action", "activate"),
                ("themeId", "5"),
                ("sectionId", "my-custom-section"),
            ],
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("gave up after 3 attempts"));
    read.assert_hits_async(3).await;
    write.assert_hits_async(3).await;
}
