//! # Route Modules
//!
//! - [`orders`]: order lifecycle and audit trail (`/v1/orders/*`)
//! - [`issues`]: issue reporting and resolution
//! - [`health`]: liveness and readiness probes, unauthenticated

pub mod health;
pub mod issues;
pub mod orders;
