//! In-memory [`WorkflowStore`].
//!
//! All tables sit behind a single `parking_lot::RwLock`. Each store call
//! takes the lock once and releases it before returning, so it is never
//! held across an `.await`. Used when no `DATABASE_URL` is configured and
//! throughout the test suites.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dotrack_core::{IssueId, OrderId};
use dotrack_state::{DeliveryOrder, HistoryEntry, Issue, OrderStatus};
use parking_lot::RwLock;

use crate::store::{StoreError, WorkflowStore};

#[derive(Debug, Default)]
struct Tables {
    orders: HashMap<OrderId, DeliveryOrder>,
    order_numbers: HashMap<String, OrderId>,
    issues: HashMap<IssueId, Issue>,
    history: HashMap<OrderId, Vec<HistoryEntry>>,
}

/// Store holding everything in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowStore for MemoryStore {
    async fn insert_order(
        &self,
        order: &DeliveryOrder,
        entry: &HistoryEntry,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let number = order.order_number.as_str().to_string();
        if tables.order_numbers.contains_key(&number) {
            return Err(StoreError::DuplicateOrderNumber(number));
        }
        tables.order_numbers.insert(number, order.id);
        tables.orders.insert(order.id, order.clone());
        tables.history.insert(order.id, vec![entry.clone()]);
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<DeliveryOrder>, StoreError> {
        Ok(self.tables.read().orders.get(&id).cloned())
    }

    async fn list_orders(
        &self,
        status: Option<OrderStatus>,
    ) -> Result<Vec<DeliveryOrder>, StoreError> {
        let tables = self.tables.read();
        let mut orders: Vec<DeliveryOrder> = tables
            .orders
            .values()
            .filter(|o| !o.is_archived())
            .filter(|o| status.map_or(true, |s| o.status == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn commit_transition(
        &self,
        order: &DeliveryOrder,
        expected_version: u64,
        entry: &HistoryEntry,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let stored = tables
            .orders
            .get_mut(&order.id)
            .ok_or(StoreError::OrderNotFound(order.id))?;
        if stored.version != expected_version {
            return Err(StoreError::VersionConflict {
                order_id: order.id,
                expected_version,
            });
        }
        *stored = order.clone();
        tables
            .history
            .entry(order.id)
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    async fn open_issue_ids(&self, order_id: OrderId) -> Result<Vec<IssueId>, StoreError> {
        let tables = self.tables.read();
        let mut open: Vec<&Issue> = tables
            .issues
            .values()
            .filter(|i| i.order_id == order_id && i.is_open())
            .collect();
        open.sort_by_key(|i| (i.reported_at, *i.id.as_uuid()));
        Ok(open.into_iter().map(|i| i.id).collect())
    }

    async fn insert_issue(&self, issue: &Issue) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let order = tables
            .orders
            .get_mut(&issue.order_id)
            .ok_or(StoreError::OrderNotFound(issue.order_id))?;
        order.version += 1;
        tables.issues.insert(issue.id, issue.clone());
        Ok(())
    }

    async fn get_issue(&self, id: IssueId) -> Result<Option<Issue>, StoreError> {
        Ok(self.tables.read().issues.get(&id).cloned())
    }

    async fn commit_resolution(&self, issue: &Issue) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let stored = tables
            .issues
            .get_mut(&issue.id)
            .ok_or(StoreError::IssueNotFound(issue.id))?;
        if !stored.is_open() {
            return Err(StoreError::IssueAlreadyResolved(issue.id));
        }
        *stored = issue.clone();
        Ok(())
    }

    async fn issues_for_order(&self, order_id: OrderId) -> Result<Vec<Issue>, StoreError> {
        let tables = self.tables.read();
        let mut issues: Vec<Issue> = tables
            .issues
            .values()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect();
        issues.sort_by_key(|i| (i.reported_at, *i.id.as_uuid()));
        Ok(issues)
    }

    async fn history_for_order(&self, order_id: OrderId) -> Result<Vec<HistoryEntry>, StoreError> {
        Ok(self
            .tables
            .read()
            .history
            .get(&order_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
