//! # dotrack-core: Foundational Types
//!
//! The leaf of the dotrack crate graph. Defines the primitives every other
//! crate speaks in:
//!
//! 1. **Identifier newtypes.** `OrderId`, `IssueId`, `HistoryId`, `UserId`,
//!    `PartyId` wrap UUIDs; `OrderNumber` wraps the human-assigned order
//!    number. You cannot pass an `IssueId` where an `OrderId` is expected.
//!
//! 2. **UTC-only timestamps.** [`Timestamp`] is always UTC, truncated to
//!    microseconds so it survives a round trip through PostgreSQL unchanged.
//!
//! 3. **Closed role set.** [`Role`] enumerates the five organizational roles.
//!    Every authorization decision matches on it exhaustively.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `dotrack-*` crates.
//! - No I/O, no `unsafe`, no `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod role;
pub mod temporal;

pub use error::ValidationError;
pub use identity::{HistoryId, IssueId, OrderId, OrderNumber, PartyId, UserId};
pub use role::{Actor, Role};
pub use temporal::Timestamp;
