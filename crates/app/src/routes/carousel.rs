//! Carousel editor route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::ShopContext;
use crate::models::{CarouselData, Slide};
use crate::services::{MetafieldError, carousel};
use crate::shopify::AdminShopifyError;
use crate::state::AppState;

/// Build the carousel router.
pub fn router() -> Router<AppState> {
    Router::new().route("/app/carousel", get(show).post(save))
}

/// Slide group view for templates.
#[derive(Debug, Clone)]
pub struct GroupView {
    pub id: String,
    pub slides: Vec<Slide>,
}

/// Carousel editor page template.
#[derive(Template, WebTemplate)]
#[template(path = "carousel.html")]
pub struct CarouselTemplate {
    pub api_key: String,
    pub shop: String,
    pub embedded_query: String,
    pub groups: Vec<GroupView>,
    pub slide_count: usize,
    /// Pretty-printed value for the JSON editor.
    pub carousel_json: String,
}

/// Form posted by the editor.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarouselForm {
    pub carousel_json: Option<String>,
}

/// GET /app/carousel - Editor page, or `{"carouselData": ...}` for JSON
/// callers.
#[instrument(skip(state, ctx), fields(shop = %ctx.shop))]
pub async fn show(State(state): State<AppState>, ctx: ShopContext) -> Response {
    let data = match ctx.guard(carousel::load(&ctx.admin).await).await {
        Ok(data) => data,
        Err(e) => return ctx.error_response(e),
    };

    if ctx.wants_json {
        return Json(json!({ "carouselData": data })).into_response();
    }

    let carousel_json = match serde_json::to_string_pretty(&data) {
        Ok(json) => json,
        Err(e) => return ctx.error_response(AppError::Internal(e.to_string())),
    };

    CarouselTemplate {
        api_key: state.config().shopify.api_key.clone(),
        shop: ctx.shop.to_string(),
        embedded_query: ctx.embedded_query(),
        slide_count: data.slide_count(),
        groups: data
            .0
            .into_iter()
            .map(|(id, slides)| GroupView { id, slides })
            .collect(),
        carousel_json,
    }
    .into_response()
}

/// POST /app/carousel - Replace the carousel data.
///
/// Answers `{"status":"success"}`, or `{"status":"error","errors":[...]}`
/// with 400 when `carouselJson` is missing or not valid carousel JSON.
///
/// # Errors
///
/// Returns 401 with reauthorize headers if Shopify rejects the token.
#[instrument(skip(ctx, form), fields(shop = %ctx.shop))]
pub async fn save(
    ctx: ShopContext,
    Form(form): Form<CarouselForm>,
) -> Result<Response, AppError> {
    let Some(raw) = form.carousel_json.filter(|s| !s.trim().is_empty()) else {
        return Ok(rejected(StatusCode::BAD_REQUEST, "carouselJson is required"));
    };

    let data = match CarouselData::parse(&raw) {
        Ok(data) => data,
        Err(e) => {
            return Ok(rejected(
                StatusCode::BAD_REQUEST,
                &format!("carouselJson is not valid carousel data: {e}"),
            ));
        }
    };

    match carousel::save(&ctx.admin, &data).await {
        Ok(()) => Ok(Json(json!({ "status": "success" })).into_response()),
        // Shopify refused the value itself; report it like a validation error
        Err(MetafieldError::Shopify(AdminShopifyError::UserError(message))) => {
            Ok(rejected(StatusCode::OK, &message))
        }
        Err(e) => Err(ctx.reject(e).await),
    }
}

fn rejected(status: StatusCode, message: &str) -> Response {
    let errors: Vec<Value> = vec![json!({ "field": ["carouselJson"], "message": message })];
    (status, Json(json!({ "status": "error", "errors": errors }))).into_response()
}
