//! # Organizational Roles
//!
//! The closed set of roles a user can hold. Roles decide which workflow
//! operations a user may request; the workflow crate matches on them
//! exhaustively, so adding a role forces every authorization decision to be
//! revisited.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::UserId;

/// A user's organizational role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Unrestricted operator.
    Admin,
    /// Creates orders and forwards them out of the Area Office stage.
    AreaOffice,
    /// Receives orders, gives the Project Office approval.
    ProjectOffice,
    /// Gives the CISF approval.
    Cisf,
    /// Final destination of released orders.
    RoadSale,
}

impl Role {
    /// Every role, in declaration order.
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::AreaOffice,
        Role::ProjectOffice,
        Role::Cisf,
        Role::RoadSale,
    ];

    /// Wire name of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::AreaOffice => "area_office",
            Self::ProjectOffice => "project_office",
            Self::Cisf => "cisf",
            Self::RoadSale => "road_sale",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::AreaOffice => "Area Office",
            Self::ProjectOffice => "Project Office",
            Self::Cisf => "CISF",
            Self::RoadSale => "Road Sale",
        }
    }

    /// Parse a wire name.
    pub fn from_name(name: &str) -> Result<Self, ValidationError> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == name)
            .ok_or_else(|| ValidationError::UnknownRole(name.to_string()))
    }

    /// Whether this role is one of `allowed`.
    pub fn is_one_of(&self, allowed: &[Role]) -> bool {
        allowed.contains(self)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The user on whose behalf an operation runs.
///
/// Passed explicitly into every workflow operation; there is no ambient
/// current-user state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// The acting user.
    pub user_id: UserId,
    /// The role the user acts in.
    pub role: Role,
}

impl Actor {
    /// Create an actor.
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }
}
