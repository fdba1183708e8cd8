//! # Delivery Order API
//!
//! Order creation, listing, the five workflow operations, and the audit
//! trail. Every handler acts as the caller resolved by the auth middleware;
//! the engine decides what that caller may do.

use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use dotrack_core::{OrderId, OrderNumber, PartyId, Timestamp};
use dotrack_state::{ApprovalAuthority, DeliveryOrder, HistoryEntry, NewOrder, OrderStatus};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_optional_json, extract_path, required};
use crate::state::AppState;

// -- DTOs ---------------------------------------------------------------------

/// Request to create a delivery order.
///
/// Every field except `notes` is required. Fields are optional at the JSON
/// level so that an absent one is reported as a validation error naming it.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct CreateOrderRequest {
    /// Unique business identifier, e.g. `DO-2026-0042`.
    pub order_number: Option<String>,
    pub party_id: Option<Uuid>,
    pub authorized_person: Option<String>,
    /// RFC 3339 timestamp.
    pub valid_from: Option<String>,
    /// RFC 3339 timestamp, not before `valid_from`.
    pub valid_to: Option<String>,
    pub notes: Option<String>,
}

impl CreateOrderRequest {
    fn into_new_order(self) -> Result<NewOrder, AppError> {
        let order_number = required("order_number", self.order_number)?;
        let valid_from = required("valid_from", self.valid_from)?;
        let valid_to = required("valid_to", self.valid_to)?;
        Ok(NewOrder {
            order_number: OrderNumber::new(&order_number)?,
            party_id: PartyId::from_uuid(required("party_id", self.party_id)?),
            authorized_person: required("authorized_person", self.authorized_person)?,
            valid_from: Timestamp::parse_lenient("valid_from", &valid_from)?,
            valid_to: Timestamp::parse_lenient("valid_to", &valid_to)?,
            notes: self.notes,
        })
    }
}

/// Simple forward to another stage.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ForwardRequest {
    /// Target status, e.g. `at_project_office`.
    pub to_status: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// Approval by one of the two authorities.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ApproveRequest {
    /// `project_office` or `cisf`.
    pub authority: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// Optional audit note for operations without other input.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct NoteRequest {
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListOrdersQuery {
    /// Only orders in this status.
    pub status: Option<String>,
}

/// A delivery order as returned by the API.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub party_id: Uuid,
    pub authorized_person: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub status: String,
    pub status_label: String,
    pub project_approved: bool,
    pub cisf_approved: bool,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
    /// Number of audit entries.
    pub revision: u64,
    /// Concurrency token.
    pub version: u64,
}

impl From<DeliveryOrder> for OrderResponse {
    fn from(o: DeliveryOrder) -> Self {
        Self {
            id: *o.id.as_uuid(),
            order_number: o.order_number.as_str().to_string(),
            party_id: *o.party_id.as_uuid(),
            authorized_person: o.authorized_person,
            valid_from: o.valid_from.into_datetime(),
            valid_to: o.valid_to.into_datetime(),
            status: o.status.as_str().to_string(),
            status_label: o.status.label().to_string(),
            project_approved: o.project_approved,
            cisf_approved: o.cisf_approved,
            notes: o.notes,
            created_by: *o.created_by.as_uuid(),
            created_at: o.created_at.into_datetime(),
            updated_at: o.updated_at.into_datetime(),
            archived_at: o.archived_at.map(Timestamp::into_datetime),
            revision: o.revision,
            version: o.version,
        }
    }
}

/// One audit trail entry.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoryEntryResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub sequence: u64,
    pub from_status: String,
    pub to_status: String,
    pub actor: Uuid,
    pub actor_role: String,
    pub note: String,
    pub recorded_at: DateTime<Utc>,
}

impl From<HistoryEntry> for HistoryEntryResponse {
    fn from(e: HistoryEntry) -> Self {
        Self {
            id: *e.id.as_uuid(),
            order_id: *e.order_id.as_uuid(),
            sequence: e.sequence,
            from_status: e.from_status.as_str().to_string(),
            to_status: e.to_status.as_str().to_string(),
            actor: *e.actor.as_uuid(),
            actor_role: e.actor_role.as_str().to_string(),
            note: e.note,
            recorded_at: e.recorded_at.into_datetime(),
        }
    }
}

fn parse_authority(name: &str) -> Result<ApprovalAuthority, AppError> {
    match name.trim() {
        "project_office" => Ok(ApprovalAuthority::ProjectOffice),
        "cisf" => Ok(ApprovalAuthority::Cisf),
        other => Err(AppError::Validation(format!(
            "unknown approval authority {other:?}; expected \"project_office\" or \"cisf\""
        ))),
    }
}

fn optional_note(body: &Bytes) -> Result<Option<String>, AppError> {
    Ok(extract_optional_json::<NoteRequest>(body)?.and_then(|req| req.note))
}

// -- Router -------------------------------------------------------------------

/// Build the orders router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/orders", post(create_order).get(list_orders))
        .route("/v1/orders/{id}", get(get_order))
        .route("/v1/orders/{id}/forward", post(forward_order))
        .route("/v1/orders/{id}/receive", post(receive_order))
        .route("/v1/orders/{id}/approve", post(approve_order))
        .route("/v1/orders/{id}/road-sale", post(forward_to_road_sale))
        .route("/v1/orders/{id}/archive", post(archive_order))
        .route("/v1/orders/{id}/history", get(order_history))
}

// -- Handlers -----------------------------------------------------------------

/// POST /v1/orders: Create a delivery order in `created`.
#[utoipa::path(
    post,
    path = "/v1/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 403, description = "Role may not create orders", body = crate::error::ErrorBody),
        (status = 409, description = "Order number already exists", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid input", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    let new = extract_json(body)?.into_new_order()?;
    let order = state.engine.create(new, &caller.actor).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /v1/orders: Non-archived orders the caller's role can see.
#[utoipa::path(
    get,
    path = "/v1/orders",
    params(ListOrdersQuery),
    responses(
        (status = 200, description = "Visible orders, newest first", body = Vec<OrderResponse>),
        (status = 422, description = "Unknown status filter", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    caller: CallerIdentity,
    query: Result<Query<ListOrdersQuery>, QueryRejection>,
) -> Result<Json<Vec<OrderResponse>>, AppError> {
    let Query(query) = query.map_err(|err| AppError::BadRequest(err.body_text()))?;
    let status = query
        .status
        .as_deref()
        .map(OrderStatus::from_name)
        .transpose()?;
    let orders = state.engine.visible_orders(&caller.actor, status).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// GET /v1/orders/{id}: One order.
#[utoipa::path(
    get,
    path = "/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "The order", body = OrderResponse),
        (status = 404, description = "No such order", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<OrderResponse>, AppError> {
    let id = OrderId::from_uuid(extract_path(id)?);
    let order = state.engine.order(id).await?;
    Ok(Json(order.into()))
}

/// POST /v1/orders/{id}/forward: Simple forward to another stage.
#[utoipa::path(
    post,
    path = "/v1/orders/{id}/forward",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = ForwardRequest,
    responses(
        (status = 200, description = "Order forwarded", body = OrderResponse),
        (status = 403, description = "Role may not forward from this stage", body = crate::error::ErrorBody),
        (status = 404, description = "No such order", body = crate::error::ErrorBody),
        (status = 409, description = "Blocked, terminal, archived, illegal target, or concurrent change", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn forward_order(
    State(state): State<AppState>,
    caller: CallerIdentity,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<ForwardRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, AppError> {
    let id = OrderId::from_uuid(extract_path(id)?);
    let req = extract_json(body)?;
    let to = OrderStatus::from_name(req.to_status.trim())?;
    let order = state
        .engine
        .forward(id, to, &caller.actor, req.note.as_deref())
        .await?;
    Ok(Json(order.into()))
}

/// POST /v1/orders/{id}/receive: Project Office acknowledges receipt.
#[utoipa::path(
    post,
    path = "/v1/orders/{id}/receive",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body(content = NoteRequest, description = "Optional; the body may be omitted"),
    responses(
        (status = 200, description = "Order received", body = OrderResponse),
        (status = 403, description = "Role may not receive", body = crate::error::ErrorBody),
        (status = 409, description = "Order is not at the Project Office", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn receive_order(
    State(state): State<AppState>,
    caller: CallerIdentity,
    id: Result<Path<Uuid>, PathRejection>,
    body: Bytes,
) -> Result<Json<OrderResponse>, AppError> {
    let id = OrderId::from_uuid(extract_path(id)?);
    let note = optional_note(&body)?;
    let order = state
        .engine
        .receive(id, &caller.actor, note.as_deref())
        .await?;
    Ok(Json(order.into()))
}

/// POST /v1/orders/{id}/approve: Record a Project Office or CISF approval.
#[utoipa::path(
    post,
    path = "/v1/orders/{id}/approve",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = ApproveRequest,
    responses(
        (status = 200, description = "Approval recorded", body = OrderResponse),
        (status = 403, description = "Role may not give this approval", body = crate::error::ErrorBody),
        (status = 409, description = "Blocked by open issues or not in an approval stage", body = crate::error::ErrorBody),
        (status = 422, description = "Unknown authority", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn approve_order(
    State(state): State<AppState>,
    caller: CallerIdentity,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<ApproveRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, AppError> {
    let id = OrderId::from_uuid(extract_path(id)?);
    let req = extract_json(body)?;
    let authority = parse_authority(&req.authority)?;
    let order = state
        .engine
        .approve(
            id,
            authority,
            &caller.actor,
            req.note.as_deref(),
        )
        .await?;
    Ok(Json(order.into()))
}

/// POST /v1/orders/{id}/road-sale: Release the order to Road Sale.
#[utoipa::path(
    post,
    path = "/v1/orders/{id}/road-sale",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body(content = NoteRequest, description = "Optional; the body may be omitted"),
    responses(
        (status = 200, description = "Order at Road Sale", body = OrderResponse),
        (status = 403, description = "Role may not release", body = crate::error::ErrorBody),
        (status = 409, description = "Approvals incomplete or blocked by open issues", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn forward_to_road_sale(
    State(state): State<AppState>,
    caller: CallerIdentity,
    id: Result<Path<Uuid>, PathRejection>,
    body: Bytes,
) -> Result<Json<OrderResponse>, AppError> {
    let id = OrderId::from_uuid(extract_path(id)?);
    let note = optional_note(&body)?;
    let order = state
        .engine
        .forward_to_road_sale(id, &caller.actor, note.as_deref())
        .await?;
    Ok(Json(order.into()))
}

/// POST /v1/orders/{id}/archive: Withdraw an order that never left `created`.
#[utoipa::path(
    post,
    path = "/v1/orders/{id}/archive",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body(content = NoteRequest, description = "Optional; the body may be omitted"),
    responses(
        (status = 200, description = "Order archived", body = OrderResponse),
        (status = 403, description = "Role may not archive", body = crate::error::ErrorBody),
        (status = 409, description = "Order already left `created` or is archived", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn archive_order(
    State(state): State<AppState>,
    caller: CallerIdentity,
    id: Result<Path<Uuid>, PathRejection>,
    body: Bytes,
) -> Result<Json<OrderResponse>, AppError> {
    let id = OrderId::from_uuid(extract_path(id)?);
    let note = optional_note(&body)?;
    let order = state
        .engine
        .archive(id, &caller.actor, note.as_deref())
        .await?;
    Ok(Json(order.into()))
}

/// GET /v1/orders/{id}/history: The audit trail, oldest first.
#[utoipa::path(
    get,
    path = "/v1/orders/{id}/history",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Audit trail", body = Vec<HistoryEntryResponse>),
        (status = 404, description = "No such order", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn order_history(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Vec<HistoryEntryResponse>>, AppError> {
    let id = OrderId::from_uuid(extract_path(id)?);
    let entries = state.engine.history(id).await?;
    Ok(Json(entries.into_iter().map(HistoryEntryResponse::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authority_names() {
        assert_eq!(
            parse_authority("project_office").unwrap(),
            ApprovalAuthority::ProjectOffice
        );
        assert_eq!(parse_authority(" cisf ").unwrap(), ApprovalAuthority::Cisf);
        assert!(matches!(
            parse_authority("area_office"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn create_request_rejects_bad_timestamp() {
        let req = CreateOrderRequest {
            order_number: Some("DO-1".into()),
            party_id: Some(Uuid::new_v4()),
            authorized_person: Some("R. Iyer".into()),
            valid_from: Some("yesterday".into()),
            valid_to: Some("2026-08-01T00:00:00Z".into()),
            notes: None,
        };
        let err = req.into_new_order().unwrap_err();
        assert_eq!(err.status_and_code().0, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn create_request_accepts_offsets() {
        let req = CreateOrderRequest {
            order_number: Some("  DO-2 ".into()),
            party_id: Some(Uuid::new_v4()),
            authorized_person: Some("R. Iyer".into()),
            valid_from: Some("2026-08-01T05:30:00+05:30".into()),
            valid_to: Some("2026-08-31T00:00:00Z".into()),
            notes: None,
        };
        let new = req.into_new_order().unwrap();
        assert_eq!(new.order_number.as_str(), "DO-2");
        assert_eq!(new.valid_from.to_rfc3339(), "2026-08-01T00:00:00.000000Z");
    }

    #[test]
    fn create_request_names_absent_field() {
        let req: CreateOrderRequest = serde_json::from_value(serde_json::json!({
            "order_number": "DO-3",
            "party_id": Uuid::new_v4(),
            "valid_from": "2026-08-01T00:00:00Z",
            "valid_to": "2026-08-31T00:00:00Z",
        }))
        .unwrap();
        let err = req.into_new_order().unwrap_err();
        assert!(matches!(
            err,
            AppError::Workflow(dotrack_workflow::WorkflowError::Validation(
                dotrack_core::ValidationError::MissingField {
                    field: "authorized_person"
                }
            ))
        ));

        let err = CreateOrderRequest::default().into_new_order().unwrap_err();
        assert_eq!(
            err.status_and_code(),
            (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR")
        );
    }

    #[test]
    fn missing_note_body_is_none() {
        assert_eq!(optional_note(&Bytes::new()).unwrap(), None);
        assert_eq!(
            optional_note(&Bytes::from_static(br#"{"note":"checked seals"}"#)).unwrap(),
            Some("checked seals".to_string())
        );
    }
}
