//! # Gate Evaluator
//!
//! Decides whether an operation may proceed. Pure: it reads the order, the
//! ids of the order's open issues and the actor, and either returns the
//! [`PlannedTransition`] to apply or a [`GateDenial`].
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. archived order → [`GateDenial::Archived`]
//! 2. role → [`GateDenial::Forbidden`]
//! 3. terminal status → [`GateDenial::TerminalState`]
//! 4. open issues (forward and approval only) → [`GateDenial::BlockedByOpenIssues`]
//! 5. legality → [`GateDenial::InvalidTransition`] or [`GateDenial::ApprovalsIncomplete`]

use dotrack_core::{Actor, IssueId, OrderId, Role};
use thiserror::Error;

use crate::operation::{Operation, PlannedTransition, AREA_OFFICE_ROLES};
use crate::order::DeliveryOrder;
use crate::status::OrderStatus;
use crate::transition::approval_outcome;

/// Why the gate refused an operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateDenial {
    /// The order has been archived and is immutable.
    #[error("order {order_id} is archived")]
    Archived {
        /// The order.
        order_id: OrderId,
    },

    /// The actor's role may not perform the operation.
    #[error("role '{role}' may not {operation}")]
    Forbidden {
        /// The actor's role.
        role: Role,
        /// The refused operation.
        operation: &'static str,
    },

    /// The order is in a terminal status.
    #[error("order {order_id} is in terminal status {status}")]
    TerminalState {
        /// The order.
        order_id: OrderId,
        /// Its status.
        status: OrderStatus,
    },

    /// The order has unresolved issues.
    #[error("order {order_id} has {} open issue(s)", open_issues.len())]
    BlockedByOpenIssues {
        /// The order.
        order_id: OrderId,
        /// Ids of the open issues.
        open_issues: Vec<IssueId>,
    },

    /// The requested move is not legal from the current status.
    #[error("invalid transition from {from}: {reason}")]
    InvalidTransition {
        /// Current status.
        from: OrderStatus,
        /// Requested target, when the operation names one.
        to: Option<OrderStatus>,
        /// What is wrong.
        reason: String,
    },

    /// Release to Road Sale was requested without both approvals.
    #[error(
        "both approvals are required (project_approved={project_approved}, cisf_approved={cisf_approved})"
    )]
    ApprovalsIncomplete {
        /// Project Office flag.
        project_approved: bool,
        /// CISF flag.
        cisf_approved: bool,
    },
}

/// Decide whether `actor` may perform `operation` on `order`.
///
/// `open_issues` must be the ids of the order's issues that are currently
/// open, read in the same unit of work as `order`.
pub fn evaluate(
    order: &DeliveryOrder,
    open_issues: &[IssueId],
    operation: Operation,
    actor: &Actor,
) -> Result<PlannedTransition, GateDenial> {
    if order.is_archived() {
        return Err(GateDenial::Archived { order_id: order.id });
    }
    if !actor.role.is_one_of(operation.allowed_roles(order.status)) {
        return Err(GateDenial::Forbidden {
            role: actor.role,
            operation: operation.name(),
        });
    }
    if order.status.is_terminal() {
        return Err(GateDenial::TerminalState {
            order_id: order.id,
            status: order.status,
        });
    }
    if operation.is_blocked_by_open_issues() && !open_issues.is_empty() {
        return Err(GateDenial::BlockedByOpenIssues {
            order_id: order.id,
            open_issues: open_issues.to_vec(),
        });
    }
    plan(order, operation)
}

/// Whether `actor` may create orders.
pub fn authorize_create(actor: &Actor) -> Result<(), GateDenial> {
    if actor.role.is_one_of(AREA_OFFICE_ROLES) {
        Ok(())
    } else {
        Err(GateDenial::Forbidden {
            role: actor.role,
            operation: "create",
        })
    }
}

/// Whether `actor` may report an issue against `order`.
///
/// The order must not be archived and its stage must be visible to the
/// actor's role.
pub fn authorize_report(order: &DeliveryOrder, actor: &Actor) -> Result<(), GateDenial> {
    if order.is_archived() {
        return Err(GateDenial::Archived { order_id: order.id });
    }
    if !order.status.is_visible_to(actor.role) {
        return Err(GateDenial::Forbidden {
            role: actor.role,
            operation: "report_issue",
        });
    }
    Ok(())
}

/// Legality check: resolve `operation` against the transition table.
fn plan(order: &DeliveryOrder, operation: Operation) -> Result<PlannedTransition, GateDenial> {
    let from = order.status;
    let flags = order.approvals();
    let planned = |to, approvals, archives| PlannedTransition {
        operation,
        from,
        to,
        approvals,
        archives,
    };

    match operation {
        Operation::Forward { to } => {
            if !from.can_forward_to(to) {
                let permitted: Vec<&str> = from.forward_targets().iter().map(|s| s.as_str()).collect();
                return Err(GateDenial::InvalidTransition {
                    from,
                    to: Some(to),
                    reason: format!("{to} is not a forward target (permitted: {permitted:?})"),
                });
            }
            if from == OrderStatus::BothApproved && !flags.complete() {
                return Err(incomplete(order));
            }
            Ok(planned(to, flags, false))
        }
        Operation::Receive => {
            if from != OrderStatus::AtProjectOffice {
                return Err(GateDenial::InvalidTransition {
                    from,
                    to: Some(OrderStatus::ReceivedAtProjectOffice),
                    reason: "only an order at_project_office can be received".to_string(),
                });
            }
            Ok(planned(OrderStatus::ReceivedAtProjectOffice, flags, false))
        }
        Operation::Approve { authority } => {
            if !from.accepts_approval() {
                return Err(GateDenial::InvalidTransition {
                    from,
                    to: None,
                    reason: "approvals are accepted only after receipt and before both_approved"
                        .to_string(),
                });
            }
            if flags.has(authority) {
                return Err(GateDenial::InvalidTransition {
                    from,
                    to: None,
                    reason: format!("{} approval is already recorded", authority.label()),
                });
            }
            Ok(planned(
                approval_outcome(flags, authority),
                flags.with(authority),
                false,
            ))
        }
        Operation::ForwardToRoadSale => match from {
            OrderStatus::BothApproved if flags.complete() => {
                Ok(planned(OrderStatus::AtRoadSale, flags, false))
            }
            OrderStatus::BothApproved
            | OrderStatus::ReceivedAtProjectOffice
            | OrderStatus::ProjectApproved
            | OrderStatus::CisfApproved => Err(incomplete(order)),
            _ => Err(GateDenial::InvalidTransition {
                from,
                to: Some(OrderStatus::AtRoadSale),
                reason: "release to road sale requires both_approved".to_string(),
            }),
        },
        Operation::Archive => {
            if from != OrderStatus::Created {
                return Err(GateDenial::InvalidTransition {
                    from,
                    to: None,
                    reason: "only an order still in created can be archived".to_string(),
                });
            }
            Ok(planned(OrderStatus::Created, flags, true))
        }
    }
}

fn incomplete(order: &DeliveryOrder) -> GateDenial {
    GateDenial::ApprovalsIncomplete {
        project_approved: order.project_approved,
        cisf_approved: order.cisf_approved,
    }
}
