//! Dashboard route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use tracing::instrument;

use crate::error::PageError;
use crate::middleware::ShopContext;
use crate::sections::CATALOG;
use crate::services::themes::{self, ThemeStatus};
use crate::shopify::ThemeRole;
use crate::state::AppState;

/// Build the dashboard router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/app", get(index))
}

/// Catalog card view for templates.
#[derive(Debug, Clone)]
pub struct SectionCard {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub installed: bool,
}

/// Theme option view for templates.
#[derive(Debug, Clone)]
pub struct ThemeOption {
    pub id: String,
    pub label: String,
    pub selected: bool,
}

impl From<&ThemeStatus> for ThemeOption {
    fn from(theme: &ThemeStatus) -> Self {
        Self {
            id: theme.id.to_string(),
            label: format!("{} ({})", theme.name, theme.role.as_str()),
            selected: theme.role == ThemeRole::Main,
        }
    }
}

/// Dashboard page template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub api_key: String,
    pub shop: String,
    pub embedded_query: String,
    pub sections: Vec<SectionCard>,
    pub themes: Vec<ThemeOption>,
}

/// GET / - Shopify opens the app URL; send it to the dashboard.
async fn root(Query(query): Query<Vec<(String, String)>>) -> Redirect {
    if query.is_empty() {
        return Redirect::to("/app");
    }
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    serializer.extend_pairs(query);
    Redirect::to(&format!("/app?{}", serializer.finish()))
}

/// GET /app - Catalog cards with activate and deactivate buttons.
///
/// # Errors
///
/// Redirects to the login page if the shop must reauthorize.
#[instrument(skip(state, ctx), fields(shop = %ctx.shop))]
pub async fn index(State(state): State<AppState>, ctx: ShopContext) -> Result<Response, PageError> {
    let listing = ctx
        .guard(themes::list(&ctx.admin, ctx.locks(), false).await)
        .await?;

    let sections = CATALOG
        .iter()
        .map(|s| SectionCard {
            id: s.id,
            name: s.name,
            description: s.description,
            installed: listing.installed_sections.iter().any(|id| id == s.id),
        })
        .collect();

    Ok(DashboardTemplate {
        api_key: state.config().shopify.api_key.clone(),
        shop: ctx.shop.to_string(),
        embedded_query: ctx.embedded_query(),
        sections,
        themes: listing.themes.iter().map(ThemeOption::from).collect(),
    }
    .into_response())
}
