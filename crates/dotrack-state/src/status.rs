//! # Status Taxonomy
//!
//! The statuses a delivery order moves through and the two statuses of an
//! issue. Pure data: which moves are legal lives in [`crate::transition`].
//!
//! ```text
//! created ──▶ at_area_office ──▶ at_project_office ──▶ received_at_project_office
//!                                                         │          │
//!                                    (legacy direct path) │          │ dual approval
//!                                                         │          ▼
//!                                                         │   project_approved / cisf_approved
//!                                                         │          │
//!                                                         │          ▼
//!                                                         │    both_approved
//!                                                         ▼          │
//!                                                    at_road_sale ◀──┘  (terminal)
//! ```
//!
//! `pending_approval` is declared in the label table but no operation
//! produces it and it has no exits.

use dotrack_core::{Role, ValidationError};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a delivery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Freshly created by the Area Office.
    Created,
    /// Held at the Area Office.
    AtAreaOffice,
    /// Dispatched to the Project Office, not yet acknowledged.
    AtProjectOffice,
    /// Acknowledged by the Project Office.
    ReceivedAtProjectOffice,
    /// Reserved. Never produced.
    PendingApproval,
    /// Project Office signed off; CISF approval outstanding.
    ProjectApproved,
    /// CISF signed off; Project Office approval outstanding.
    CisfApproved,
    /// Both approvals present.
    BothApproved,
    /// Released to Road Sale. Terminal.
    AtRoadSale,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [OrderStatus; 9] = [
        OrderStatus::Created,
        OrderStatus::AtAreaOffice,
        OrderStatus::AtProjectOffice,
        OrderStatus::ReceivedAtProjectOffice,
        OrderStatus::PendingApproval,
        OrderStatus::ProjectApproved,
        OrderStatus::CisfApproved,
        OrderStatus::BothApproved,
        OrderStatus::AtRoadSale,
    ];

    /// Wire name (matches the serde representation).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::AtAreaOffice => "at_area_office",
            Self::AtProjectOffice => "at_project_office",
            Self::ReceivedAtProjectOffice => "received_at_project_office",
            Self::PendingApproval => "pending_approval",
            Self::ProjectApproved => "project_approved",
            Self::CisfApproved => "cisf_approved",
            Self::BothApproved => "both_approved",
            Self::AtRoadSale => "at_road_sale",
        }
    }

    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::AtAreaOffice => "At Area Office",
            Self::AtProjectOffice => "At Project Office",
            Self::ReceivedAtProjectOffice => "Received at Project Office",
            Self::PendingApproval => "Pending Approval",
            Self::ProjectApproved => "Project Approved",
            Self::CisfApproved => "CISF Approved",
            Self::BothApproved => "Both Approved",
            Self::AtRoadSale => "At Road Sale",
        }
    }

    /// Parse a wire name. Only names in the taxonomy are accepted.
    pub fn from_name(name: &str) -> Result<Self, ValidationError> {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == name)
            .ok_or_else(|| ValidationError::UnknownStatus(name.to_string()))
    }

    /// Whether no further operation may be requested.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::AtRoadSale)
    }

    /// Whether the order sits in the dual-approval stretch of the lifecycle.
    pub fn is_approval_stage(&self) -> bool {
        matches!(
            self,
            Self::ReceivedAtProjectOffice
                | Self::ProjectApproved
                | Self::CisfApproved
                | Self::BothApproved
        )
    }

    /// Whether an order in this status is visible to `role`.
    ///
    /// Visibility decides who may report issues against an order and which
    /// orders show up in a role's listing.
    pub fn is_visible_to(&self, role: Role) -> bool {
        match role {
            Role::Admin => true,
            Role::AreaOffice => matches!(self, Self::Created | Self::AtAreaOffice),
            Role::ProjectOffice => {
                matches!(self, Self::AtProjectOffice) || self.is_approval_stage()
            }
            Role::Cisf => self.is_approval_stage(),
            Role::RoadSale => matches!(self, Self::BothApproved | Self::AtRoadSale),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

/// Status of an issue. `Open → Resolved` happens exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueStatus {
    /// Unresolved; blocks forwarding and approval.
    Open,
    /// Resolved. Terminal.
    Resolved,
}

impl IssueStatus {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Resolved => "RESOLVED",
        }
    }

    /// Parse a wire name.
    pub fn from_name(name: &str) -> Result<Self, ValidationError> {
        match name {
            "OPEN" => Ok(Self::Open),
            "RESOLVED" => Ok(Self::Resolved),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
