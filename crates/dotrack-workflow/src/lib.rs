//! # dotrack-workflow: Workflow Engine and Stores
//!
//! Runs delivery-order operations end to end: load, gate, apply, commit.
//!
//! ## Architecture
//!
//! The engine ([`WorkflowEngine`]) owns no state of its own. Everything
//! lives behind the [`WorkflowStore`] trait, which has two implementations:
//!
//! - [`MemoryStore`]: process memory under one `parking_lot::RwLock`. Used
//!   when `DATABASE_URL` is absent, and by the tests.
//! - [`PgStore`]: PostgreSQL via `sqlx`, with embedded migrations.
//!
//! Both enforce the same contract: a status change and its history entry
//! are committed together or not at all, and a write based on a stale
//! order version is refused.

pub mod engine;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use engine::WorkflowEngine;
pub use error::WorkflowError;
pub use memory::MemoryStore;
pub use postgres::{init_pool, PgStore};
pub use store::{StoreError, WorkflowStore};
