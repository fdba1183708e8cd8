//! Property tests: random operation sequences through the engine never
//! break the audit trail or the approval invariants.

use std::sync::Arc;

use dotrack_core::{Actor, OrderNumber, PartyId, Role, Timestamp, UserId};
use dotrack_state::{ApprovalAuthority, IssueReport, NewOrder, Operation, OrderStatus};
use dotrack_workflow::{MemoryStore, WorkflowEngine};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Step {
    Execute(Operation, Role),
    Report(Role),
    ResolveOldest(Role),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    let role = || prop::sample::select(Role::ALL.to_vec());
    let status = prop::sample::select(OrderStatus::ALL.to_vec());
    let authority =
        prop::sample::select(vec![ApprovalAuthority::ProjectOffice, ApprovalAuthority::Cisf]);
    let operation = prop_oneof![
        4 => status.prop_map(|to| Operation::Forward { to }),
        2 => Just(Operation::Receive),
        3 => authority.prop_map(|authority| Operation::Approve { authority }),
        2 => Just(Operation::ForwardToRoadSale),
        1 => Just(Operation::Archive),
    ];
    prop_oneof![
        6 => (operation, role()).prop_map(|(op, r)| Step::Execute(op, r)),
        1 => role().prop_map(Step::Report),
        1 => role().prop_map(Step::ResolveOldest),
    ]
}

fn run(steps: Vec<Step>) -> Result<(), TestCaseError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .map_err(|e| TestCaseError::fail(e.to_string()))?;
    runtime.block_on(async move {
        let engine = WorkflowEngine::new(Arc::new(MemoryStore::new()));
        let creator = Actor::new(UserId::new(), Role::AreaOffice);
        let new = NewOrder {
            order_number: OrderNumber::new("DO-PROP").unwrap(),
            party_id: PartyId::new(),
            authorized_person: "P. Nair".into(),
            valid_from: Timestamp::parse("valid_from", "2026-07-01T00:00:00Z").unwrap(),
            valid_to: Timestamp::parse("valid_to", "2026-07-31T00:00:00Z").unwrap(),
            notes: None,
        };
        let order = engine.create(new, &creator).await.unwrap();

        for step in steps {
            let before = engine.order(order.id).await.unwrap();
            let open_before = engine
                .issues(order.id)
                .await
                .unwrap()
                .iter()
                .filter(|i| i.is_open())
                .count();

            match step {
                Step::Execute(operation, role) => {
                    let actor = Actor::new(UserId::new(), role);
                    let result = engine.execute(order.id, operation, &actor, None).await;
                    if result.is_ok() && operation.is_blocked_by_open_issues() {
                        prop_assert_eq!(open_before, 0);
                    }
                    if result.is_err() {
                        prop_assert_eq!(&engine.order(order.id).await.unwrap(), &before);
                    }
                }
                Step::Report(role) => {
                    let actor = Actor::new(UserId::new(), role);
                    let _ = engine
                        .report_issue(
                            order.id,
                            IssueReport {
                                description: "random issue".into(),
                                category: None,
                            },
                            &actor,
                        )
                        .await;
                }
                Step::ResolveOldest(role) => {
                    let open = engine
                        .issues(order.id)
                        .await
                        .unwrap()
                        .into_iter()
                        .find(|i| i.is_open());
                    if let Some(issue) = open {
                        let actor = Actor::new(UserId::new(), role);
                        let resolved = engine.resolve_issue(issue.id, "handled", &actor).await;
                        prop_assert!(resolved.is_ok());
                    }
                }
            }

            let after = engine.order(order.id).await.unwrap();
            prop_assert!(after.project_approved >= before.project_approved);
            prop_assert!(after.cisf_approved >= before.cisf_approved);
            if after.status == OrderStatus::BothApproved {
                prop_assert!(after.project_approved && after.cisf_approved);
            }
            if after.status == OrderStatus::AtRoadSale && before.status != OrderStatus::AtRoadSale {
                prop_assert!(matches!(
                    before.status,
                    OrderStatus::BothApproved | OrderStatus::ReceivedAtProjectOffice
                ));
            }
            prop_assert_ne!(after.status, OrderStatus::PendingApproval);
            prop_assert!(engine.verify_history(order.id).await.is_ok());
        }
        Ok(())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn audit_invariant_holds(steps in prop::collection::vec(step_strategy(), 1..30)) {
        run(steps)?;
    }
}
