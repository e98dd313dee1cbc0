//! Section activation endpoint.

use axum::{Form, Json};
use serde::{Deserialize, Serialize};
use shopi_section_core::{SectionAction, ThemeId};
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::ShopContext;
use crate::services::{Activation, Deactivation, SectionInstaller};

/// Form posted by the dashboard buttons.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionForm {
    #[serde(alias = "actionType")]
    pub action: Option<String>,
    pub theme_id: Option<String>,
    pub section_id: Option<String>,
}

/// Successful response.
#[derive(Debug, Serialize)]
pub struct SectionResponse {
    pub success: bool,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activation: Option<Activation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deactivation: Option<Deactivation>,
}

/// Validated form fields.
#[derive(Debug)]
struct SectionRequest {
    action: SectionAction,
    theme_id: ThemeId,
    section_id: String,
}

impl TryFrom<SectionForm> for SectionRequest {
    type Error = AppError;

    fn try_from(form: SectionForm) -> Result<Self, Self::Error> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let (Some(theme_id), Some(section_id)) =
            (non_empty(form.theme_id), non_empty(form.section_id))
        else {
            return Err(AppError::BadRequest(
                "Missing themeId or sectionId".to_string(),
            ));
        };

        let action = form
            .action
            .as_deref()
            .unwrap_or_default()
            .parse::<SectionAction>()
            .map_err(|_| AppError::BadRequest("Invalid action".to_string()))?;
        let theme_id = theme_id
            .parse::<ThemeId>()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        Ok(Self {
            action,
            theme_id,
            section_id: section_id.trim().to_string(),
        })
    }
}

/// POST /api/section - Activate or deactivate a catalog section.
///
/// # Errors
///
/// - 400 for missing fields, an invalid action or an unknown section
/// - 401 with reauthorize headers if Shopify rejects the shop's token
/// - 409 if the installed-sections metafield keeps changing underneath us
/// - 502 if every upload method fails
#[instrument(skip(ctx, form), fields(shop = %ctx.shop))]
pub async fn section(
    ctx: ShopContext,
    Form(form): Form<SectionForm>,
) -> Result<Json<SectionResponse>, AppError> {
    let request = SectionRequest::try_from(form)?;
    let installer = SectionInstaller::new(&ctx.admin, ctx.locks());

    let response = match request.action {
        SectionAction::Activate => {
            let activation = ctx
                .guard(installer.activate(request.theme_id, &request.section_id).await)
                .await?;
            SectionResponse {
                success: true,
                message: "Section enabled and activated",
                activation: Some(activation),
                deactivation: None,
            }
        }
        SectionAction::Deactivate => {
            let deactivation = ctx
                .guard(installer.deactivate(request.theme_id, &request.section_id).await)
                .await?;
            SectionResponse {
                success: true,
                message: "Section disabled and removed",
                activation: None,
                deactivation: Some(deactivation),
            }
        }
    };

    Ok(Json(response))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(action: Option<&str>, theme: Option<&str>, section: Option<&str>) -> SectionForm {
        SectionForm {
            action: action.map(String::from),
            theme_id: theme.map(String::from),
            section_id: section.map(String::from),
        }
    }

    #[test]
    fn test_valid_request() {
        let req =
            SectionRequest::try_from(form(Some("activate"), Some("123"), Some("3d-carousel-pro")))
                .unwrap();
        assert_eq!(req.action, SectionAction::Activate);
        assert_eq!(req.theme_id.as_u64(), 123);
        assert_eq!(req.section_id, "3d-carousel-pro");
    }

    #[test]
    fn test_missing_fields() {
        for f in [
            form(Some("activate"), None, Some("x")),
            form(Some("activate"), Some("1"), None),
            form(Some("activate"), Some(""), Some("x")),
        ] {
            assert!(matches!(
                SectionRequest::try_from(f),
                Err(AppError::BadRequest(m)) if m == "Missing themeId or sectionId"
            ));
        }
    }

    #[test]
    fn test_invalid_action() {
        assert!(matches!(
            SectionRequest::try_from(form(Some("explode"), Some("1"), Some("x"))),
            Err(AppError::BadRequest(m)) if m == "Invalid action"
        ));
        assert!(SectionRequest::try_from(form(None, Some("1"), Some("x"))).is_err());
    }

    #[test]
    fn test_theme_gid_accepted() {
        let req = SectionRequest::try_from(form(
            Some("deactivate"),
            Some("gid://shopify/OnlineStoreTheme/987"),
            Some("x"),
        ))
        .unwrap();
        assert_eq!(req.theme_id.as_u64(), 987);
    }

    #[test]
    fn test_action_type_alias() {
        let f: SectionForm = parse_form("actionType=deactivate&themeId=1&sectionId=x");
        assert_eq!(f.action.as_deref(), Some("deactivate"));
    }

    fn parse_form(body: &str) -> SectionForm {
        let pairs: serde_json::Map<String, serde_json::Value> =
            url::form_urlencoded::parse(body.as_bytes())
                .map(|(k, v)| (k.into_owned(), serde_json::Value::String(v.into_owned())))
                .collect();
        serde_json::from_value(serde_json::Value::Object(pairs)).unwrap()
    }
}
