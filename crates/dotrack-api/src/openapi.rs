//! # OpenAPI Document
//!
//! Collects the utoipa-annotated handlers into one document served at
//! `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some(
                            "Token of the form `{role}:{user_uuid}:{secret}`.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "dotrack API",
        version = "0.1.0",
        description = "Delivery-order tracking: staged forwarding, dual approval, issue blocking, and audit history."
    ),
    paths(
        crate::routes::orders::create_order,
        crate::routes::orders::list_orders,
        crate::routes::orders::get_order,
        crate::routes::orders::forward_order,
        crate::routes::orders::receive_order,
        crate::routes::orders::approve_order,
        crate::routes::orders::forward_to_road_sale,
        crate::routes::orders::archive_order,
        crate::routes::orders::order_history,
        crate::routes::issues::list_issues,
        crate::routes::issues::report_issue,
        crate::routes::issues::get_issue,
        crate::routes::issues::resolve_issue,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::orders::CreateOrderRequest,
        crate::routes::orders::ForwardRequest,
        crate::routes::orders::ApproveRequest,
        crate::routes::orders::NoteRequest,
        crate::routes::orders::OrderResponse,
        crate::routes::orders::HistoryEntryResponse,
        crate::routes::issues::ReportIssueRequest,
        crate::routes::issues::ResolveIssueRequest,
        crate::routes::issues::IssueResponse,
        crate::routes::issues::ResolutionResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "orders", description = "Delivery order lifecycle and audit trail"),
        (name = "issues", description = "Issues that block forwarding and approval"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
