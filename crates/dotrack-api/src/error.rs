//! # API Error Handling
//!
//! Maps every failure to an HTTP status and a structured JSON body:
//!
//! ```json
//! { "error": { "code": "BLOCKED_BY_OPEN_ISSUES", "message": "...", "details": { ... } } }
//! ```
//!
//! Workflow failures keep their machine code from
//! [`WorkflowError::kind`]. Internal failures are logged and replaced by a
//! generic message before they reach the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dotrack_core::ValidationError;
use dotrack_state::GateDenial;
use dotrack_workflow::WorkflowError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

/// Structured error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Error detail within the response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Stable machine-readable code, e.g. `INVALID_TRANSITION`.
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type for HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A workflow operation failed. Status and code follow the error kind.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

impl AppError {
    /// HTTP status and machine code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Workflow(err) => (workflow_status(err), err.kind()),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Workflow(WorkflowError::Denied(denial)) => match denial {
                GateDenial::BlockedByOpenIssues { open_issues, .. } => {
                    Some(json!({ "open_issues": open_issues }))
                }
                GateDenial::InvalidTransition { from, to, .. } => {
                    Some(json!({ "from": from, "to": to }))
                }
                GateDenial::ApprovalsIncomplete {
                    project_approved,
                    cisf_approved,
                } => Some(json!({
                    "project_approved": project_approved,
                    "cisf_approved": cisf_approved,
                })),
                GateDenial::TerminalState { status, .. } => Some(json!({ "status": status })),
                GateDenial::Archived { .. } | GateDenial::Forbidden { .. } => None,
            },
            Self::Workflow(WorkflowError::Validation(err)) => {
                err.field().map(|field| json!({ "field": field }))
            }
            _ => None,
        }
    }
}

fn workflow_status(err: &WorkflowError) -> StatusCode {
    match err {
        WorkflowError::OrderNotFound(_) | WorkflowError::IssueNotFound(_) => StatusCode::NOT_FOUND,
        WorkflowError::Denied(GateDenial::Forbidden { .. }) => StatusCode::FORBIDDEN,
        WorkflowError::Denied(_)
        | WorkflowError::DuplicateOrderNumber(_)
        | WorkflowError::AlreadyResolved(_)
        | WorkflowError::Conflict { .. } => StatusCode::CONFLICT,
        WorkflowError::Validation(_) | WorkflowError::EmptyResolution(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        WorkflowError::CorruptHistory(_) | WorkflowError::Store(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal error messages to clients.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "internal server error");
            "An internal error occurred".to_string()
        } else {
            match &self {
                Self::Workflow(err) => err.to_string(),
                other => other.to_string(),
            }
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Workflow(WorkflowError::Validation(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dotrack_core::{IssueId, OrderId, Role};
    use dotrack_state::OrderStatus;
    use http_body_util::BodyExt;

    async fn response_parts(err: AppError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[test]
    fn plain_variants_map_to_status() {
        let cases = [
            (AppError::Validation("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
        ];
        for (err, expected) in cases {
            assert_eq!(err.status_and_code().0, expected, "{err}");
        }
    }

    #[test]
    fn workflow_errors_keep_their_kind() {
        let err = AppError::from(WorkflowError::Denied(GateDenial::Forbidden {
            role: Role::Cisf,
            operation: "forward",
        }));
        assert_eq!(err.status_and_code(), (StatusCode::FORBIDDEN, "FORBIDDEN"));

        let err = AppError::from(WorkflowError::Conflict {
            order_id: OrderId::new(),
        });
        assert_eq!(err.status_and_code(), (StatusCode::CONFLICT, "CONFLICT"));

        let err = AppError::from(WorkflowError::EmptyResolution(IssueId::new()));
        assert_eq!(
            err.status_and_code(),
            (StatusCode::UNPROCESSABLE_ENTITY, "EMPTY_RESOLUTION")
        );

        let err = AppError::from(WorkflowError::OrderNotFound(OrderId::new()));
        assert_eq!(err.status_and_code(), (StatusCode::NOT_FOUND, "NOT_FOUND"));
    }

    #[tokio::test]
    async fn blocked_response_lists_open_issues() {
        let open = vec![IssueId::new(), IssueId::new()];
        let err = AppError::from(WorkflowError::Denied(GateDenial::BlockedByOpenIssues {
            order_id: OrderId::new(),
            open_issues: open.clone(),
        }));
        let (status, body) = response_parts(err).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.error.code, "BLOCKED_BY_OPEN_ISSUES");
        let listed = body.error.details.unwrap()["open_issues"].clone();
        assert_eq!(listed, serde_json::to_value(&open).unwrap());
    }

    #[tokio::test]
    async fn invalid_transition_reports_endpoints() {
        let err = AppError::from(WorkflowError::Denied(GateDenial::InvalidTransition {
            from: OrderStatus::Created,
            to: Some(OrderStatus::AtRoadSale),
            reason: "not a forward edge".into(),
        }));
        let (status, body) = response_parts(err).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.error.code, "INVALID_TRANSITION");
        let details = body.error.details.unwrap();
        assert_eq!(details["from"], "created");
        assert_eq!(details["to"], "at_road_sale");
    }

    #[tokio::test]
    async fn validation_error_names_field() {
        let err = AppError::from(ValidationError::MissingField {
            field: "authorized_person",
        });
        let (status, body) = response_parts(err).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.error.code, "VALIDATION_ERROR");
        assert_eq!(body.error.details.unwrap()["field"], "authorized_person");
    }

    #[tokio::test]
    async fn store_failure_is_not_echoed() {
        let err = AppError::from(WorkflowError::Store("connection refused on 10.0.0.5".into()));
        let (status, body) = response_parts(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.code, "STORE_ERROR");
        assert_eq!(body.error.message, "An internal error occurred");
        assert!(body.error.details.is_none());
    }
}
