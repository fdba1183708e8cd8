//! # Transition Table
//!
//! Declarative description of legal status changes.
//!
//! Two paths coexist:
//!
//! - **Simple forward**: a fixed successor per status, see
//!   [`OrderStatus::forward_targets`]. Includes the legacy
//!   `received_at_project_office → at_road_sale` shortcut.
//! - **Dual approval**: from the approval stages, Project Office and CISF
//!   each set their own flag. The resulting status is computed by
//!   [`approval_outcome`]; `both_approved` then forwards to Road Sale.
//!
//! Neither path checks roles or open issues; that is the gate's job.

use dotrack_core::Role;
use serde::{Deserialize, Serialize};

use crate::status::OrderStatus;

impl OrderStatus {
    /// Permitted targets of a simple forward from this status.
    pub fn forward_targets(&self) -> &'static [OrderStatus] {
        match self {
            Self::Created => &[Self::AtAreaOffice],
            Self::AtAreaOffice => &[Self::AtProjectOffice],
            Self::AtProjectOffice => &[Self::ReceivedAtProjectOffice],
            Self::ReceivedAtProjectOffice => &[Self::AtRoadSale],
            Self::BothApproved => &[Self::AtRoadSale],
            Self::PendingApproval | Self::ProjectApproved | Self::CisfApproved | Self::AtRoadSale => {
                &[]
            }
        }
    }

    /// Whether `self → target` is in the simple-forward table.
    pub fn can_forward_to(&self, target: OrderStatus) -> bool {
        self.forward_targets().contains(&target)
    }

    /// Whether an approval flag may be set while the order is in this status.
    pub fn accepts_approval(&self) -> bool {
        matches!(
            self,
            Self::ReceivedAtProjectOffice | Self::ProjectApproved | Self::CisfApproved
        )
    }

    /// Roles allowed to forward an order out of this status.
    ///
    /// The stage holding the order owns the forward.
    pub fn forwarding_roles(&self) -> &'static [Role] {
        match self {
            Self::Created | Self::AtAreaOffice => &[Role::AreaOffice, Role::Admin],
            Self::AtProjectOffice | Self::ReceivedAtProjectOffice => {
                &[Role::ProjectOffice, Role::Admin]
            }
            Self::ProjectApproved | Self::CisfApproved | Self::BothApproved => {
                &[Role::ProjectOffice, Role::Cisf, Role::Admin]
            }
            Self::PendingApproval | Self::AtRoadSale => &[Role::Admin],
        }
    }
}

/// The two independent sign-offs of the dual-approval path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalAuthority {
    /// Sets `project_approved`.
    ProjectOffice,
    /// Sets `cisf_approved`.
    Cisf,
}

impl ApprovalAuthority {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectOffice => "project_office",
            Self::Cisf => "cisf",
        }
    }

    /// Roles allowed to give this approval.
    pub fn roles(&self) -> &'static [Role] {
        match self {
            Self::ProjectOffice => &[Role::ProjectOffice, Role::Admin],
            Self::Cisf => &[Role::Cisf, Role::Admin],
        }
    }

    /// Label used in audit notes.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ProjectOffice => "Project Office",
            Self::Cisf => "CISF",
        }
    }
}

impl std::fmt::Display for ApprovalAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two approval flags of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApprovalFlags {
    /// Project Office has signed off.
    pub project_approved: bool,
    /// CISF has signed off.
    pub cisf_approved: bool,
}

impl ApprovalFlags {
    /// Whether `authority` has already signed off.
    pub fn has(&self, authority: ApprovalAuthority) -> bool {
        match authority {
            ApprovalAuthority::ProjectOffice => self.project_approved,
            ApprovalAuthority::Cisf => self.cisf_approved,
        }
    }

    /// Flags after `authority` signs off. Flags never reset.
    pub fn with(self, authority: ApprovalAuthority) -> Self {
        match authority {
            ApprovalAuthority::ProjectOffice => Self {
                project_approved: true,
                ..self
            },
            ApprovalAuthority::Cisf => Self {
                cisf_approved: true,
                ..self
            },
        }
    }

    /// Whether both sign-offs are present.
    pub fn complete(&self) -> bool {
        self.project_approved && self.cisf_approved
    }
}

/// Status that results from `authority` signing off on an order whose flags
/// are currently `flags`.
pub fn approval_outcome(flags: ApprovalFlags, authority: ApprovalAuthority) -> OrderStatus {
    if flags.with(authority).complete() {
        return OrderStatus::BothApproved;
    }
    match authority {
        ApprovalAuthority::ProjectOffice => OrderStatus::ProjectApproved,
        ApprovalAuthority::Cisf => OrderStatus::CisfApproved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_matrix_is_exhaustive() {
        let expected = [
            (OrderStatus::Created, OrderStatus::AtAreaOffice),
            (OrderStatus::AtAreaOffice, OrderStatus::AtProjectOffice),
            (OrderStatus::AtProjectOffice, OrderStatus::ReceivedAtProjectOffice),
            (OrderStatus::ReceivedAtProjectOffice, OrderStatus::AtRoadSale),
            (OrderStatus::BothApproved, OrderStatus::AtRoadSale),
        ];
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                assert_eq!(
                    from.can_forward_to(to),
                    expected.contains(&(from, to)),
                    "forward {from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn road_sale_reachable_only_from_two_statuses() {
        let sources: Vec<_> = OrderStatus::ALL
            .into_iter()
            .filter(|s| s.can_forward_to(OrderStatus::AtRoadSale))
            .collect();
        assert_eq!(
            sources,
            vec![OrderStatus::ReceivedAtProjectOffice, OrderStatus::BothApproved]
        );
    }

    #[test]
    fn pending_approval_has_no_exit() {
        assert!(OrderStatus::PendingApproval.forward_targets().is_empty());
        assert!(!OrderStatus::PendingApproval.accepts_approval());
    }

    #[test]
    fn single_approval_waits_for_the_other() {
        let none = ApprovalFlags::default();
        assert_eq!(
            approval_outcome(none, ApprovalAuthority::ProjectOffice),
            OrderStatus::ProjectApproved
        );
        assert_eq!(approval_outcome(none, ApprovalAuthority::Cisf), OrderStatus::CisfApproved);
    }

    #[test]
    fn second_approval_completes() {
        let project = ApprovalFlags::default().with(ApprovalAuthority::ProjectOffice);
        assert_eq!(
            approval_outcome(project, ApprovalAuthority::Cisf),
            OrderStatus::BothApproved
        );
        let cisf = ApprovalFlags::default().with(ApprovalAuthority::Cisf);
        assert_eq!(
            approval_outcome(cisf, ApprovalAuthority::ProjectOffice),
            OrderStatus::BothApproved
        );
    }

    #[test]
    fn flags_are_monotonic() {
        let flags = ApprovalFlags::default()
            .with(ApprovalAuthority::Cisf)
            .with(ApprovalAuthority::ProjectOffice)
            .with(ApprovalAuthority::Cisf);
        assert!(flags.complete());
    }

    #[test]
    fn approval_roles() {
        assert!(Role::ProjectOffice.is_one_of(ApprovalAuthority::ProjectOffice.roles()));
        assert!(!Role::Cisf.is_one_of(ApprovalAuthority::ProjectOffice.roles()));
        assert!(Role::Admin.is_one_of(ApprovalAuthority::Cisf.roles()));
    }
}
