//! Caller-facing error taxonomy of the workflow engine.

use dotrack_core::{IssueId, OrderId, ValidationError};
use dotrack_state::{AuditError, GateDenial, IssueError};
use thiserror::Error;

use crate::store::StoreError;

/// Everything a workflow operation can fail with.
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// No order with this id.
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    /// No issue with this id.
    #[error("issue {0} not found")]
    IssueNotFound(IssueId),

    /// The gate refused the operation.
    #[error(transparent)]
    Denied(#[from] GateDenial),

    /// Malformed input.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The order number is already taken.
    #[error("order number {0} already exists")]
    DuplicateOrderNumber(String),

    /// The issue is already resolved.
    #[error("issue {0} is already resolved")]
    AlreadyResolved(IssueId),

    /// The resolution text is blank.
    #[error("resolution text for issue {0} must not be empty")]
    EmptyResolution(IssueId),

    /// The order changed between load and commit. Nothing was written.
    #[error("order {order_id} was modified concurrently; reload and retry")]
    Conflict {
        /// The order.
        order_id: OrderId,
    },

    /// The stored history does not account for the order's state.
    #[error("audit trail is inconsistent: {0}")]
    CorruptHistory(#[from] AuditError),

    /// Backend failure.
    #[error("store error: {0}")]
    Store(String),
}

impl WorkflowError {
    /// Stable machine-readable code.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OrderNotFound(_) | Self::IssueNotFound(_) => "NOT_FOUND",
            Self::Denied(denial) => match denial {
                GateDenial::Archived { .. } => "ARCHIVED",
                GateDenial::Forbidden { .. } => "FORBIDDEN",
                GateDenial::TerminalState { .. } => "TERMINAL_STATE",
                GateDenial::BlockedByOpenIssues { .. } => "BLOCKED_BY_OPEN_ISSUES",
                GateDenial::InvalidTransition { .. } => "INVALID_TRANSITION",
                GateDenial::ApprovalsIncomplete { .. } => "APPROVALS_INCOMPLETE",
            },
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::DuplicateOrderNumber(_) => "DUPLICATE_ORDER_NUMBER",
            Self::AlreadyResolved(_) => "ALREADY_RESOLVED",
            Self::EmptyResolution(_) => "EMPTY_RESOLUTION",
            Self::Conflict { .. } => "CONFLICT",
            Self::CorruptHistory(_) => "CORRUPT_HISTORY",
            Self::Store(_) => "STORE_ERROR",
        }
    }
}

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateOrderNumber(number) => Self::DuplicateOrderNumber(number),
            StoreError::VersionConflict { order_id, .. } => Self::Conflict { order_id },
            StoreError::IssueAlreadyResolved(id) => Self::AlreadyResolved(id),
            StoreError::OrderNotFound(id) => Self::OrderNotFound(id),
            StoreError::IssueNotFound(id) => Self::IssueNotFound(id),
            StoreError::Backend(msg) => Self::Store(msg),
        }
    }
}

impl From<IssueError> for WorkflowError {
    fn from(err: IssueError) -> Self {
        match err {
            IssueError::AlreadyResolved { issue_id } => Self::AlreadyResolved(issue_id),
            IssueError::EmptyResolution { issue_id } => Self::EmptyResolution(issue_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dotrack_core::Role;

    #[test]
    fn version_conflict_becomes_conflict() {
        let order_id = OrderId::new();
        let err: WorkflowError = StoreError::VersionConflict {
            order_id,
            expected_version: 3,
        }
        .into();
        assert!(matches!(err, WorkflowError::Conflict { order_id: id } if id == order_id));
        assert_eq!(err.kind(), "CONFLICT");
    }

    #[test]
    fn denial_kinds() {
        let err = WorkflowError::from(GateDenial::Forbidden {
            role: Role::RoadSale,
            operation: "forward",
        });
        assert_eq!(err.kind(), "FORBIDDEN");
        assert_eq!(err.to_string(), "role 'road_sale' may not forward");

        let err = WorkflowError::from(GateDenial::BlockedByOpenIssues {
            order_id: OrderId::new(),
            open_issues: vec![IssueId::new(), IssueId::new()],
        });
        assert_eq!(err.kind(), "BLOCKED_BY_OPEN_ISSUES");
        assert!(err.to_string().contains("2 open issue(s)"));
    }

    #[test]
    fn issue_errors_map_one_to_one() {
        let issue_id = IssueId::new();
        let err = WorkflowError::from(IssueError::EmptyResolution { issue_id });
        assert!(matches!(err, WorkflowError::EmptyResolution(id) if id == issue_id));
    }
}
