//! Security headers for an app embedded in the Shopify admin.
//!
//! The admin renders app pages in an iframe, so `X-Frame-Options` cannot be
//! used. Framing is limited with `frame-ancestors` to the shop's own admin
//! and `admin.shopify.com` instead.

use axum::{
    extract::Request,
    http::{
        HeaderName, HeaderValue,
        header::{CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS},
    },
    middleware::Next,
    response::Response,
};
use shopi_section_core::ShopDomain;

/// `frame-ancestors` policy for a request, scoped to the shop when known.
#[must_use]
pub fn frame_ancestors(shop: Option<&ShopDomain>) -> String {
    shop.map_or_else(
        || "frame-ancestors https://admin.shopify.com".to_string(),
        |shop| format!("frame-ancestors https://{shop} https://admin.shopify.com"),
    )
}

/// Shop named by the `shop` query parameter, if it is a valid domain.
pub(crate) fn shop_from_query(query: Option<&str>) -> Option<ShopDomain> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(k, _)| k == "shop")
        .and_then(|(_, v)| ShopDomain::parse(&v).ok())
}

/// Add security headers to all responses.
///
/// Headers applied:
/// - `Content-Security-Policy: frame-ancestors ...` - Embedding only by the admin
/// - `X-Content-Type-Options: nosniff` - Prevent MIME sniffing
/// - `Referrer-Policy: strict-origin-when-cross-origin`
/// - `Cache-Control: no-store` - Pages carry shop data
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let shop = shop_from_query(request.uri().query());
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    if let Ok(policy) = HeaderValue::from_str(&frame_ancestors(shop.as_ref())) {
        headers.insert(CONTENT_SECURITY_POLICY, policy);
    }

    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(
        REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        HeaderName::from_static("cache-control"),
        HeaderValue::from_static("no-store"),
    );

    response
}
