//! # Workflow Store
//!
//! The persistence seam of the engine. Every method is one atomic unit of
//! work; implementations never expose a half-applied write.
//!
//! ## Optimistic Concurrency
//!
//! [`WorkflowStore::commit_transition`] writes the new order state only if
//! the stored `version` still equals the version the engine loaded, and
//! appends the history entry in the same unit of work. Otherwise it returns
//! [`StoreError::VersionConflict`] and writes nothing.
//!
//! [`WorkflowStore::insert_issue`] bumps the order's `version` in the same
//! unit of work as the insert, so a transition gated on a stale open-issue
//! set fails its version check.
//!
//! ## Thread Safety
//!
//! Implementations must be `Send + Sync + 'static` to live in axum
//! application state behind an `Arc`.

use async_trait::async_trait;
use dotrack_core::{IssueId, OrderId};
use dotrack_state::{DeliveryOrder, HistoryEntry, Issue, OrderStatus};
use thiserror::Error;

/// Errors a store implementation can return.
#[derive(Error, Debug)]
pub enum StoreError {
    /// An order with this order number already exists.
    #[error("order number {0} already exists")]
    DuplicateOrderNumber(String),

    /// The order changed since it was loaded.
    #[error("order {order_id} was modified concurrently: expected version {expected_version}")]
    VersionConflict {
        /// The order.
        order_id: OrderId,
        /// The version the writer loaded.
        expected_version: u64,
    },

    /// The issue was resolved by someone else first.
    #[error("issue {0} is already resolved")]
    IssueAlreadyResolved(IssueId),

    /// No order with this id.
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    /// No issue with this id.
    #[error("issue {0} not found")]
    IssueNotFound(IssueId),

    /// Connection, encoding or other backend failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Durable storage for orders, issues and history.
#[async_trait]
pub trait WorkflowStore: Send + Sync + 'static {
    /// Insert a new order together with its creation entry.
    ///
    /// Returns [`StoreError::DuplicateOrderNumber`] if the order number is
    /// taken.
    async fn insert_order(&self, order: &DeliveryOrder, entry: &HistoryEntry)
        -> Result<(), StoreError>;

    /// Read an order.
    async fn get_order(&self, id: OrderId) -> Result<Option<DeliveryOrder>, StoreError>;

    /// Non-archived orders, optionally restricted to one status, newest first.
    async fn list_orders(&self, status: Option<OrderStatus>)
        -> Result<Vec<DeliveryOrder>, StoreError>;

    /// Persist `order` and append `entry`, if the stored version is still
    /// `expected_version`.
    async fn commit_transition(
        &self,
        order: &DeliveryOrder,
        expected_version: u64,
        entry: &HistoryEntry,
    ) -> Result<(), StoreError>;

    /// Ids of the order's open issues, oldest first.
    async fn open_issue_ids(&self, order_id: OrderId) -> Result<Vec<IssueId>, StoreError>;

    /// Insert a new issue and bump its order's version.
    async fn insert_issue(&self, issue: &Issue) -> Result<(), StoreError>;

    /// Read an issue.
    async fn get_issue(&self, id: IssueId) -> Result<Option<Issue>, StoreError>;

    /// Persist a resolved issue, if the stored issue is still open.
    ///
    /// Returns [`StoreError::IssueAlreadyResolved`] otherwise.
    async fn commit_resolution(&self, issue: &Issue) -> Result<(), StoreError>;

    /// All issues of an order, oldest first.
    async fn issues_for_order(&self, order_id: OrderId) -> Result<Vec<Issue>, StoreError>;

    /// The order's history, by ascending sequence.
    async fn history_for_order(&self, order_id: OrderId) -> Result<Vec<HistoryEntry>, StoreError>;

    /// Cheap liveness check of the backend.
    async fn ping(&self) -> Result<(), StoreError>;
}
