//! # Workflow Operations
//!
//! What a caller can ask the engine to do to an existing order, and the
//! [`PlannedTransition`] the gate hands back when it allows the request.
//! Creation has no prior order and is handled separately
//! (see [`crate::gate::authorize_create`]).

use dotrack_core::Role;
use serde::{Deserialize, Serialize};

use crate::status::OrderStatus;
use crate::transition::{ApprovalAuthority, ApprovalFlags};

/// Roles allowed to create and archive orders.
pub const AREA_OFFICE_ROLES: &[Role] = &[Role::AreaOffice, Role::Admin];

/// Roles allowed to acknowledge receipt at the Project Office.
pub const RECEIVE_ROLES: &[Role] = &[Role::ProjectOffice, Role::Admin];

/// Roles allowed to release a dual-approved order to Road Sale.
pub const ROAD_SALE_RELEASE_ROLES: &[Role] = &[Role::ProjectOffice, Role::Cisf, Role::Admin];

/// A request to change an existing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Operation {
    /// Simple forward along the transition table.
    Forward {
        /// Requested target status.
        to: OrderStatus,
    },
    /// Project Office acknowledges receipt (`at_project_office → received_at_project_office`).
    Receive,
    /// Set one of the two approval flags and recompute the status.
    Approve {
        /// Whose sign-off this is.
        authority: ApprovalAuthority,
    },
    /// Release a dual-approved order (`both_approved → at_road_sale`).
    ForwardToRoadSale,
    /// Soft-delete an order that has not left `created`.
    Archive,
}

impl Operation {
    /// Short verb used in messages and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Forward { .. } => "forward",
            Self::Receive => "receive",
            Self::Approve { .. } => "approve",
            Self::ForwardToRoadSale => "forward_to_road_sale",
            Self::Archive => "archive",
        }
    }

    /// Roles allowed to request this operation on an order in `current`.
    pub fn allowed_roles(&self, current: OrderStatus) -> &'static [Role] {
        match self {
            Self::Forward { .. } => current.forwarding_roles(),
            Self::Receive => RECEIVE_ROLES,
            Self::Approve { authority } => authority.roles(),
            Self::ForwardToRoadSale => ROAD_SALE_RELEASE_ROLES,
            Self::Archive => AREA_OFFICE_ROLES,
        }
    }

    /// Whether an open issue on the order blocks this operation.
    ///
    /// Forwarding and approval are blocked. Receipt and archival are not.
    pub fn is_blocked_by_open_issues(&self) -> bool {
        match self {
            Self::Forward { .. } | Self::Approve { .. } | Self::ForwardToRoadSale => true,
            Self::Receive | Self::Archive => false,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Forward { to } => write!(f, "forward to {to}"),
            Self::Approve { authority } => write!(f, "approve as {authority}"),
            other => f.write_str(other.name()),
        }
    }
}

/// An allowed operation, resolved to its effect on the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedTransition {
    /// The operation that was allowed.
    pub operation: Operation,
    /// Status before.
    pub from: OrderStatus,
    /// Status after.
    pub to: OrderStatus,
    /// Approval flags after.
    pub approvals: ApprovalFlags,
    /// Whether the order becomes archived.
    pub archives: bool,
}

impl PlannedTransition {
    /// Machine-generated audit note used when the caller gives none.
    pub fn default_note(&self) -> String {
        match self.operation {
            Operation::Forward { .. } => format!("Forwarded from {} to {}", self.from, self.to),
            Operation::Receive => "Received at Project Office".to_string(),
            Operation::Approve { authority } => format!("Approved by {}", authority.label()),
            Operation::ForwardToRoadSale => format!(
                "Forwarded from {} to {} after dual approval",
                self.from, self.to
            ),
            Operation::Archive => "Delivery order archived".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_roles_follow_the_stage() {
        let op = Operation::Forward {
            to: OrderStatus::AtProjectOffice,
        };
        assert!(Role::AreaOffice.is_one_of(op.allowed_roles(OrderStatus::AtAreaOffice)));
        assert!(!Role::AreaOffice.is_one_of(op.allowed_roles(OrderStatus::AtProjectOffice)));
    }

    #[test]
    fn receipt_is_not_issue_gated() {
        assert!(!Operation::Receive.is_blocked_by_open_issues());
        assert!(Operation::ForwardToRoadSale.is_blocked_by_open_issues());
        assert!(Operation::Approve {
            authority: ApprovalAuthority::Cisf
        }
        .is_blocked_by_open_issues());
    }

    #[test]
    fn serde_is_tagged() {
        let op = Operation::Forward {
            to: OrderStatus::AtAreaOffice,
        };
        let json = serde_json::to_value(op).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"operation": "forward", "to": "at_area_office"})
        );
    }

    #[test]
    fn default_notes() {
        let planned = PlannedTransition {
            operation: Operation::Forward {
                to: OrderStatus::AtProjectOffice,
            },
            from: OrderStatus::AtAreaOffice,
            to: OrderStatus::AtProjectOffice,
            approvals: ApprovalFlags::default(),
            archives: false,
        };
        assert_eq!(
            planned.default_note(),
            "Forwarded from at_area_office to at_project_office"
        );
    }
}
