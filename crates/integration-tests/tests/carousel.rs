//! Carousel editor JSON and saves through `/app/carousel`.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use httpmock::Method::POST;
use serde_json::json;
use shopi_section_integration_tests::{TestApp, admin_path, metafields};

#[tokio::test]
async fn test_load_returns_stored_groups() {
    let app = TestApp::installed().await;
    metafields::stored(
        &app.shopify,
        "carousel_data",
        Some(r#"{"home":[{"title":"Summer","imageUrl":"https://cdn.example/a.jpg"}]}"#),
    )
    .await;

    let (status, body) = app.get_json("/app/carousel").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["carouselData"]["home"][0]["title"], "Summer");
    assert_eq!(
        body["carouselData"]["home"][0]["imageUrl"],
        "https://cdn.example/a.jpg"
    );
}

#[tokio::test]
async fn test_legacy_array_loads_as_default_group() {
    let app = TestApp::installed().await;
    metafields::stored(
        &app.shopify,
        "carousel_data",
        Some(r#"[{"title":"Old slide"}]"#),
    )
    .await;

    let (status, body) = app.get_json("/app/carousel").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["carouselData"]["default"][0]["title"], "Old slide");
}

#[tokio::test]
async fn test_missing_metafield_loads_empty() {
    let app = TestApp::installed().await;
    metafields::stored(&app.shopify, "carousel_data", None).await;

    let (status, body) = app.get_json("/app/carousel").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["carouselData"], json!({}));
}

#[tokio::test]
async fn test_save_writes_metafield() {
    let app = TestApp::installed().await;
    metafields::stored(&app.shopify, "carousel_data", None).await;
    let write = app
        .shopify
        .mock_async(|when, then| {
            when.method(POST)
                .path(admin_path("graphql.json"))
                .body_contains("MetafieldsSet")
                .body_contains("carousel_data")
                .body_contains("gid://shopify/Shop/1")
                .body_contains("Winter");
            then.status(200).json_body(json!({
                "data": {"metafieldsSet": {
                    "metafields": [{"namespace": "shopi_section", "key": "carousel_data", "value": "{}", "compareDigest": "d"}],
                    "userErrors": []
                }}
            }));
        })
        .await;

    let (status, _, body) = app
        .post_form(
            "/app/carousel",
            &[("carouselJson", r#"{"home":[{"title":"Winter"}]}"#)],
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "success"}));
    write.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_save_rejects_invalid_json() {
    let app = TestApp::installed().await;
    let write = metafields::writable(&app.shopify, "carousel_data").await;

    let (status, _, body) = app
        .post_form("/app/carousel", &[("carouselJson", "{not json")])
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert_eq!(body["errors"][0]["field"], json!(["carouselJson"]));
    write.assert_hits_async(0).await;

    let (status, _, body) = app.post_form("/app/carousel", &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["message"], "carouselJson is required");
}

#[tokio::test]
async fn test_save_reports_shopify_user_errors() {
    let app = TestApp::installed().await;
    metafields::stored(&app.shopify, "carousel_data", None).await;
    app.shopify
        .mock_async(|when, then| {
            when.method(POST)
                .path(admin_path("graphql.json"))
                .body_contains("MetafieldsSet");
            then.status(200).json_body(json!({
                "data": {"metafieldsSet": {
                    "metafields": [],
                    "userErrors": [{"field": ["metafields", "0", "value"], "code": "INVALID_VALUE", "message": "Value is too long"}]
                }}
            }));
        })
        .await;

    let (status, _, body) = app
        .post_form("/app/carousel", &[("carouselJson", r#"{"home":[]}"#)])
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");
    assert_eq!(body["errors"][0]["message"], "Value is too long");
}

#[tokio::test]
async fn test_null_slide_fields_round_trip() {
    let stored = r#"{"g":[{"title":null,"subtitle":"x","imageUrl":"","link":"/a"}]}"#;
    let app = TestApp::installed().await;
    metafields::stored(&app.shopify, "carousel_data", Some(stored)).await;
    let write = app
        .shopify
        .mock_async(|when, then| {
            when.method(POST)
                .path(admin_path("graphql.json"))
                .body_contains("MetafieldsSet")
                .body_contains(r#"\"title\":null"#);
            then.status(200).json_body(json!({
                "data": {"metafieldsSet": {
                    "metafields": [{"namespace": "shopi_section", "key": "carousel_data", "value": "{}", "compareDigest": "d"}],
                    "userErrors": []
                }}
            }));
        })
        .await;

    let (status, body) = app.get_json("/app/carousel").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["carouselData"],
        serde_json::from_str::<serde_json::Value>(stored).unwrap()
    );

    let (status, _, body) = app
        .post_form("/app/carousel", &[("carouselJson", stored)])
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "success"}));
    write.assert_hits_async(1).await;
}
