//! JSON API called by the embedded dashboard.
//!
//! Every route authenticates with an App Bridge session token
//! (`Authorization: Bearer`).

pub mod section;
pub mod test_upload;
pub mod themes;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Build the complete API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/section", post(section::section))
        .route("/api/themes", get(themes::list))
        .route("/api/test-upload", post(test_upload::test_upload))
}
