//! # dotrack-state: Delivery Order State Machine
//!
//! Everything about a delivery order's lifecycle that can be decided
//! without I/O.
//!
//! ## Modules
//!
//! - **Status** (`status.rs`): the nine order statuses, their labels, and
//!   which roles can see each stage. `at_road_sale` is terminal.
//!
//! - **Transition** (`transition.rs`): the simple-forward table and the
//!   dual-approval side path (`received_at_project_office → project_approved
//!   / cisf_approved → both_approved → at_road_sale`).
//!
//! - **Gate** (`gate.rs`): role, terminal-state, open-issue and legality
//!   checks. Returns a [`PlannedTransition`] or a [`GateDenial`].
//!
//! - **Order** (`order.rs`), **Issue** (`issue.rs`), **History**
//!   (`history.rs`): the aggregates and the append-only audit entry.
//!
//! ## Design
//!
//! Status is an enum with validated transitions, not a typestate: the
//! status of a stored order is only known at runtime. Every change goes
//! through [`DeliveryOrder::apply`], which hands back the
//! [`HistoryEntry`] the store must persist alongside the new state.

pub mod gate;
pub mod history;
pub mod issue;
pub mod operation;
pub mod order;
pub mod status;
pub mod transition;

pub use gate::{authorize_create, authorize_report, evaluate, GateDenial};
pub use history::{normalize_note, verify_audit_trail, AuditError, HistoryEntry};
pub use issue::{Issue, IssueError, IssueReport, Resolution};
pub use operation::{Operation, PlannedTransition};
pub use order::{DeliveryOrder, NewOrder};
pub use status::{IssueStatus, OrderStatus};
pub use transition::{approval_outcome, ApprovalAuthority, ApprovalFlags};
