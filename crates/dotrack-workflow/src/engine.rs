//! # Workflow Engine
//!
//! Drives every change to an order through the same four steps:
//!
//! 1. load the order and the ids of its open issues from the store
//! 2. ask the gate ([`dotrack_state::evaluate`]) for a decision
//! 3. apply the planned transition to a copy of the order
//! 4. commit the new state and its history entry as one unit, guarded by
//!    the version loaded in step 1
//!
//! A denial is returned unchanged and nothing is written. A lost race in
//! step 4 surfaces as [`WorkflowError::Conflict`]; the engine does not retry.

use std::sync::Arc;

use dotrack_core::{Actor, IssueId, OrderId, Timestamp};
use dotrack_state::{
    authorize_create, authorize_report, evaluate, normalize_note, verify_audit_trail,
    ApprovalAuthority, DeliveryOrder, GateDenial, HistoryEntry, Issue, IssueReport, NewOrder,
    Operation, OrderStatus,
};
use tracing::{debug, info, instrument, warn};

use crate::error::WorkflowError;
use crate::store::{StoreError, WorkflowStore};

/// The workflow engine. Cheap to clone; clones share the store.
#[derive(Clone)]
pub struct WorkflowEngine {
    store: Arc<dyn WorkflowStore>,
}

impl std::fmt::Debug for WorkflowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowEngine").finish_non_exhaustive()
    }
}

fn denied(denial: GateDenial) -> WorkflowError {
    debug!(%denial, "operation denied");
    WorkflowError::Denied(denial)
}

impl WorkflowEngine {
    /// Create an engine over `store`.
    pub fn new(store: Arc<dyn WorkflowStore>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn WorkflowStore> {
        &self.store
    }

    // ── Commands ────────────────────────────────────────────────────

    /// Create an order in `created` with its `created → created` entry.
    #[instrument(skip_all, fields(order_number = %new.order_number, actor = %actor.user_id, role = %actor.role))]
    pub async fn create(&self, new: NewOrder, actor: &Actor) -> Result<DeliveryOrder, WorkflowError> {
        authorize_create(actor).map_err(denied)?;
        let (order, entry) = DeliveryOrder::create(new, actor, Timestamp::now())?;
        self.store.insert_order(&order, &entry).await?;
        info!(order_id = %order.id, "delivery order created");
        Ok(order)
    }

    /// Run `operation` against an existing order.
    ///
    /// A non-blank `note` replaces the operation's default audit note.
    #[instrument(skip_all, fields(order_id = %order_id, operation = %operation, actor = %actor.user_id, role = %actor.role))]
    pub async fn execute(
        &self,
        order_id: OrderId,
        operation: Operation,
        actor: &Actor,
        note: Option<&str>,
    ) -> Result<DeliveryOrder, WorkflowError> {
        let note = normalize_note(note)?;
        let mut order = self.load(order_id).await?;
        let open_issues = self.store.open_issue_ids(order_id).await?;

        let planned = evaluate(&order, &open_issues, operation, actor).map_err(denied)?;

        let expected_version = order.version;
        let entry = order.apply(&planned, actor, note.as_deref(), Timestamp::now());

        match self
            .store
            .commit_transition(&order, expected_version, &entry)
            .await
        {
            Ok(()) => {}
            Err(StoreError::VersionConflict { .. }) => {
                warn!(expected_version, "order modified concurrently; transition discarded");
                return Err(WorkflowError::Conflict { order_id });
            }
            Err(err) => return Err(err.into()),
        }

        info!(
            from = %planned.from,
            to = %planned.to,
            sequence = entry.sequence,
            "transition committed"
        );
        Ok(order)
    }

    /// Simple forward to `to`.
    pub async fn forward(
        &self,
        order_id: OrderId,
        to: OrderStatus,
        actor: &Actor,
        note: Option<&str>,
    ) -> Result<DeliveryOrder, WorkflowError> {
        self.execute(order_id, Operation::Forward { to }, actor, note)
            .await
    }

    /// Project Office receipt.
    pub async fn receive(
        &self,
        order_id: OrderId,
        actor: &Actor,
        note: Option<&str>,
    ) -> Result<DeliveryOrder, WorkflowError> {
        self.execute(order_id, Operation::Receive, actor, note).await
    }

    /// Record `authority`'s approval.
    pub async fn approve(
        &self,
        order_id: OrderId,
        authority: ApprovalAuthority,
        actor: &Actor,
        note: Option<&str>,
    ) -> Result<DeliveryOrder, WorkflowError> {
        self.execute(order_id, Operation::Approve { authority }, actor, note)
            .await
    }

    /// Release a dual-approved order to Road Sale.
    pub async fn forward_to_road_sale(
        &self,
        order_id: OrderId,
        actor: &Actor,
        note: Option<&str>,
    ) -> Result<DeliveryOrder, WorkflowError> {
        self.execute(order_id, Operation::ForwardToRoadSale, actor, note)
            .await
    }

    /// Archive an order that is still in `created`.
    pub async fn archive(
        &self,
        order_id: OrderId,
        actor: &Actor,
        note: Option<&str>,
    ) -> Result<DeliveryOrder, WorkflowError> {
        self.execute(order_id, Operation::Archive, actor, note).await
    }

    /// Raise an issue against an order. The issue blocks forwarding and
    /// approval until resolved.
    #[instrument(skip_all, fields(order_id = %order_id, actor = %actor.user_id, role = %actor.role))]
    pub async fn report_issue(
        &self,
        order_id: OrderId,
        report: IssueReport,
        actor: &Actor,
    ) -> Result<Issue, WorkflowError> {
        let order = self.load(order_id).await?;
        authorize_report(&order, actor).map_err(denied)?;
        let issue = Issue::report(order_id, report, actor, Timestamp::now())?;
        self.store.insert_issue(&issue).await?;
        info!(issue_id = %issue.id, category = %issue.category, "issue reported");
        Ok(issue)
    }

    /// Resolve an open issue. Any role may resolve.
    #[instrument(skip_all, fields(issue_id = %issue_id, actor = %actor.user_id))]
    pub async fn resolve_issue(
        &self,
        issue_id: IssueId,
        resolution: &str,
        actor: &Actor,
    ) -> Result<Issue, WorkflowError> {
        let mut issue = self
            .store
            .get_issue(issue_id)
            .await?
            .ok_or(WorkflowError::IssueNotFound(issue_id))?;
        issue.resolve(resolution, actor, Timestamp::now())?;
        self.store.commit_resolution(&issue).await?;
        info!(order_id = %issue.order_id, "issue resolved");
        Ok(issue)
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// One order.
    pub async fn order(&self, order_id: OrderId) -> Result<DeliveryOrder, WorkflowError> {
        self.load(order_id).await
    }

    /// The order's audit trail, oldest first.
    pub async fn history(&self, order_id: OrderId) -> Result<Vec<HistoryEntry>, WorkflowError> {
        self.load(order_id).await?;
        Ok(self.store.history_for_order(order_id).await?)
    }

    /// The order's issues, oldest first.
    pub async fn issues(&self, order_id: OrderId) -> Result<Vec<Issue>, WorkflowError> {
        self.load(order_id).await?;
        Ok(self.store.issues_for_order(order_id).await?)
    }

    /// One issue.
    pub async fn issue(&self, issue_id: IssueId) -> Result<Issue, WorkflowError> {
        self.store
            .get_issue(issue_id)
            .await?
            .ok_or(WorkflowError::IssueNotFound(issue_id))
    }

    /// Non-archived orders whose stage `actor` can see, newest first.
    pub async fn visible_orders(
        &self,
        actor: &Actor,
        status: Option<OrderStatus>,
    ) -> Result<Vec<DeliveryOrder>, WorkflowError> {
        if status.is_some_and(|s| !s.is_visible_to(actor.role)) {
            return Ok(Vec::new());
        }
        let orders = self.store.list_orders(status).await?;
        Ok(orders
            .into_iter()
            .filter(|o| o.status.is_visible_to(actor.role))
            .collect())
    }

    /// Check that the stored history replays to the order's current state.
    pub async fn verify_history(&self, order_id: OrderId) -> Result<(), WorkflowError> {
        let order = self.load(order_id).await?;
        let entries = self.store.history_for_order(order_id).await?;
        verify_audit_trail(&order, &entries)?;
        Ok(())
    }

    async fn load(&self, order_id: OrderId) -> Result<DeliveryOrder, WorkflowError> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or(WorkflowError::OrderNotFound(order_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use dotrack_core::{OrderNumber, PartyId, Role, UserId};

    fn engine() -> WorkflowEngine {
        WorkflowEngine::new(Arc::new(MemoryStore::new()))
    }

    fn actor(role: Role) -> Actor {
        Actor::new(UserId::new(), role)
    }

    fn new_order(number: &str) -> NewOrder {
        NewOrder {
            order_number: OrderNumber::new(number).unwrap(),
            party_id: PartyId::new(),
            authorized_person: "S. Das".into(),
            valid_from: Timestamp::parse("valid_from", "2026-05-01T00:00:00Z").unwrap(),
            valid_to: Timestamp::parse("valid_to", "2026-05-31T00:00:00Z").unwrap(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn create_then_read() {
        let engine = engine();
        let order = engine
            .create(new_order("DO-100"), &actor(Role::AreaOffice))
            .await
            .unwrap();
        let loaded = engine.order(order.id).await.unwrap();
        assert_eq!(loaded, order);
        let history = engine.history(order.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].from_status, OrderStatus::Created);
        assert_eq!(history[0].to_status, OrderStatus::Created);
    }

    #[tokio::test]
    async fn cisf_cannot_create() {
        let err = engine()
            .create(new_order("DO-101"), &actor(Role::Cisf))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "FORBIDDEN");
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let engine = engine();
        let missing = OrderId::new();
        let err = engine
            .receive(missing, &actor(Role::Admin), None)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::OrderNotFound(id) if id == missing));
        assert!(matches!(
            engine.history(missing).await,
            Err(WorkflowError::OrderNotFound(_))
        ));
    }

    #[tokio::test]
    async fn denial_writes_nothing() {
        let engine = engine();
        let order = engine
            .create(new_order("DO-102"), &actor(Role::AreaOffice))
            .await
            .unwrap();
        let err = engine
            .forward(order.id, OrderStatus::AtProjectOffice, &actor(Role::Admin), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "INVALID_TRANSITION");
        assert_eq!(engine.order(order.id).await.unwrap(), order);
        assert_eq!(engine.history(order.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn custom_note_replaces_default() {
        let engine = engine();
        let area = actor(Role::AreaOffice);
        let order = engine.create(new_order("DO-103"), &area).await.unwrap();
        engine
            .forward(order.id, OrderStatus::AtAreaOffice, &area, Some("  handed over  "))
            .await
            .unwrap();
        engine
            .forward(order.id, OrderStatus::AtProjectOffice, &area, Some("   "))
            .await
            .unwrap();
        let notes: Vec<String> = engine
            .history(order.id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.note)
            .collect();
        assert_eq!(
            notes,
            vec![
                "Delivery order created".to_string(),
                "handed over".to_string(),
                "Forwarded from at_area_office to at_project_office".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn archive_hides_order_and_freezes_it() {
        let engine = engine();
        let area = actor(Role::AreaOffice);
        let order = engine.create(new_order("DO-104"), &area).await.unwrap();
        let archived = engine.archive(order.id, &area, None).await.unwrap();
        assert!(archived.is_archived());
        assert!(engine.visible_orders(&area, None).await.unwrap().is_empty());

        let err = engine
            .forward(order.id, OrderStatus::AtAreaOffice, &area, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "ARCHIVED");
        let err = engine
            .report_issue(
                order.id,
                IssueReport {
                    description: "late".into(),
                    category: None,
                },
                &area,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "ARCHIVED");
        engine.verify_history(order.id).await.unwrap();
    }

    #[tokio::test]
    async fn visible_orders_follow_role() {
        let engine = engine();
        let area = actor(Role::AreaOffice);
        let first = engine.create(new_order("DO-105"), &area).await.unwrap();
        let second = engine.create(new_order("DO-106"), &area).await.unwrap();
        engine
            .forward(second.id, OrderStatus::AtAreaOffice, &area, None)
            .await
            .unwrap();
        engine
            .forward(second.id, OrderStatus::AtProjectOffice, &area, None)
            .await
            .unwrap();

        let project = actor(Role::ProjectOffice);
        let seen: Vec<OrderId> = engine
            .visible_orders(&project, None)
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(seen, vec![second.id]);

        let area_seen = engine.visible_orders(&area, None).await.unwrap();
        assert_eq!(area_seen.len(), 1);
        assert_eq!(area_seen[0].id, first.id);

        assert!(engine
            .visible_orders(&area, Some(OrderStatus::AtProjectOffice))
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            engine
                .visible_orders(&actor(Role::Admin), None)
                .await
                .unwrap()
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn overlong_note_is_validation_error() {
        let engine = engine();
        let area = actor(Role::AreaOffice);
        let order = engine.create(new_order("DO-107"), &area).await.unwrap();
        let note = "n".repeat(5000);
        let err = engine
            .forward(order.id, OrderStatus::AtAreaOffice, &area, Some(&note))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "VALIDATION_ERROR");
    }
}
