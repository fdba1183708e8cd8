//! # Issue API
//!
//! Reporting and resolving issues against delivery orders. An open issue
//! blocks forwarding and approval of its order until resolved.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use dotrack_core::{IssueId, OrderId};
use dotrack_state::{Issue, IssueReport};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_path, required};
use crate::state::AppState;

/// Request to raise an issue. `description` is required.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReportIssueRequest {
    #[serde(default)]
    pub description: Option<String>,
    /// Defaults to `general`.
    #[serde(default)]
    pub category: Option<String>,
}

/// Request to resolve an issue.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ResolveIssueRequest {
    pub resolution: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResolutionResponse {
    pub resolved_by: Uuid,
    pub text: String,
    pub resolved_at: DateTime<Utc>,
}

/// An issue as returned by the API.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IssueResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub description: String,
    pub category: String,
    /// `OPEN` or `RESOLVED`.
    pub status: String,
    pub reported_by: Uuid,
    pub reported_at: DateTime<Utc>,
    pub resolution: Option<ResolutionResponse>,
}

impl From<Issue> for IssueResponse {
    fn from(issue: Issue) -> Self {
        Self {
            id: *issue.id.as_uuid(),
            order_id: *issue.order_id.as_uuid(),
            description: issue.description,
            category: issue.category,
            status: issue.status.as_str().to_string(),
            reported_by: *issue.reported_by.as_uuid(),
            reported_at: issue.reported_at.into_datetime(),
            resolution: issue.resolution.map(|r| ResolutionResponse {
                resolved_by: *r.resolved_by.as_uuid(),
                text: r.text,
                resolved_at: r.resolved_at.into_datetime(),
            }),
        }
    }
}

/// Build the issues router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/orders/{id}/issues", get(list_issues).post(report_issue))
        .route("/v1/issues/{id}", get(get_issue))
        .route("/v1/issues/{id}/resolve", post(resolve_issue))
}

/// GET /v1/orders/{id}/issues: All issues of an order, oldest first.
#[utoipa::path(
    get,
    path = "/v1/orders/{id}/issues",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Issues of the order", body = Vec<IssueResponse>),
        (status = 404, description = "No such order", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "issues"
)]
pub async fn list_issues(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Vec<IssueResponse>>, AppError> {
    let id = OrderId::from_uuid(extract_path(id)?);
    let issues = state.engine.issues(id).await?;
    Ok(Json(issues.into_iter().map(IssueResponse::from).collect()))
}

/// POST /v1/orders/{id}/issues: Raise an issue against an order.
#[utoipa::path(
    post,
    path = "/v1/orders/{id}/issues",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = ReportIssueRequest,
    responses(
        (status = 201, description = "Issue opened", body = IssueResponse),
        (status = 403, description = "Order stage is not visible to the caller", body = crate::error::ErrorBody),
        (status = 404, description = "No such order", body = crate::error::ErrorBody),
        (status = 409, description = "Order is archived", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid input", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "issues"
)]
pub async fn report_issue(
    State(state): State<AppState>,
    caller: CallerIdentity,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<ReportIssueRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<IssueResponse>), AppError> {
    let id = OrderId::from_uuid(extract_path(id)?);
    let req = extract_json(body)?;
    let report = IssueReport {
        description: required("description", req.description)?,
        category: req.category,
    };
    let issue = state
        .engine
        .report_issue(id, report, &caller.actor)
        .await?;
    Ok((StatusCode::CREATED, Json(issue.into())))
}

/// GET /v1/issues/{id}: One issue.
#[utoipa::path(
    get,
    path = "/v1/issues/{id}",
    params(("id" = Uuid, Path, description = "Issue id")),
    responses(
        (status = 200, description = "The issue", body = IssueResponse),
        (status = 404, description = "No such issue", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "issues"
)]
pub async fn get_issue(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<IssueResponse>, AppError> {
    let id = IssueId::from_uuid(extract_path(id)?);
    let issue = state.engine.issue(id).await?;
    Ok(Json(issue.into()))
}

/// POST /v1/issues/{id}/resolve: Close an open issue.
#[utoipa::path(
    post,
    path = "/v1/issues/{id}/resolve",
    params(("id" = Uuid, Path, description = "Issue id")),
    request_body = ResolveIssueRequest,
    responses(
        (status = 200, description = "Issue resolved", body = IssueResponse),
        (status = 404, description = "No such issue", body = crate::error::ErrorBody),
        (status = 409, description = "Already resolved", body = crate::error::ErrorBody),
        (status = 422, description = "Blank resolution", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "issues"
)]
pub async fn resolve_issue(
    State(state): State<AppState>,
    caller: CallerIdentity,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<ResolveIssueRequest>, JsonRejection>,
) -> Result<Json<IssueResponse>, AppError> {
    let id = IssueId::from_uuid(extract_path(id)?);
    let req = extract_json(body)?;
    let issue = state
        .engine
        .resolve_issue(id, &req.resolution, &caller.actor)
        .await?;
    Ok(Json(issue.into()))
}
