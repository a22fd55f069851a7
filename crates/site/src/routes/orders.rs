//! Order confirmation page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::Query, response::IntoResponse};
use serde::Deserialize;
use tracing::instrument;

use crate::filters;

/// Confirmation page query parameters.
#[derive(Debug, Deserialize)]
pub struct SuccessQuery {
    /// The human-facing order number from the submission.
    pub order: Option<i32>,
}

/// Order success template.
#[derive(Template, WebTemplate)]
#[template(path = "order_success.html")]
pub struct OrderSuccessTemplate {
    pub order_number: Option<i32>,
}

/// Render the post-submission confirmation page.
#[instrument]
pub async fn success(Query(query): Query<SuccessQuery>) -> impl IntoResponse {
    OrderSuccessTemplate {
        order_number: query.order,
    }
}
