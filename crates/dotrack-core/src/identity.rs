//! # Identifier Newtypes
//!
//! Newtype wrappers for every identifier in the system. An `IssueId` cannot
//! be passed where an `OrderId` is expected, and the human-assigned
//! [`OrderNumber`] is a distinct type from the internal [`OrderId`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{require_text, ValidationError};

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

uuid_id!(
    /// Internal, stable identifier of a delivery order.
    OrderId,
    "order"
);

uuid_id!(
    /// Identifier of an issue reported against a delivery order.
    IssueId,
    "issue"
);

uuid_id!(
    /// Identifier of a single workflow history (audit) entry.
    HistoryId,
    "history"
);

uuid_id!(
    /// Identifier of a user. Users are owned by an external directory.
    UserId,
    "user"
);

uuid_id!(
    /// Identifier of the party a delivery order is assigned to.
    PartyId,
    "party"
);

/// Human-assigned delivery order number, unique across all orders.
///
/// Trimmed on construction; blank numbers are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Maximum length of an order number.
    pub const MAX_LEN: usize = 64;

    /// Create a validated order number.
    pub fn new(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        require_text("order_number", value.as_ref(), Self::MAX_LEN).map(Self)
    }

    /// The order number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for OrderNumber {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OrderNumber> for String {
    fn from(value: OrderNumber) -> Self {
        value.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
