//! # Delivery Order
//!
//! The order aggregate. Mutation goes through two entry points only:
//! [`DeliveryOrder::create`] and [`DeliveryOrder::apply`]. Both return the
//! [`HistoryEntry`] that must be persisted together with the new order
//! state, so an order never changes status without a matching audit entry.

use dotrack_core::{
    error::require_text, Actor, HistoryId, OrderId, OrderNumber, PartyId, Timestamp, UserId,
    ValidationError,
};
use serde::{Deserialize, Serialize};

use crate::history::HistoryEntry;
use crate::operation::PlannedTransition;
use crate::status::OrderStatus;
use crate::transition::ApprovalFlags;

/// Maximum length of the authorized person's name.
pub const AUTHORIZED_PERSON_MAX_LEN: usize = 255;

/// Maximum length of free-form order notes.
pub const NOTES_MAX_LEN: usize = 2000;

/// Input for creating an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    /// Business identifier.
    pub order_number: OrderNumber,
    /// Party the goods are released to.
    pub party_id: PartyId,
    /// Person authorized to collect.
    pub authorized_person: String,
    /// Start of the validity window.
    pub valid_from: Timestamp,
    /// End of the validity window.
    pub valid_to: Timestamp,
    /// Free-form notes.
    pub notes: Option<String>,
}

/// A delivery order and its workflow state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOrder {
    /// Unique identifier.
    pub id: OrderId,
    /// Unique business identifier.
    pub order_number: OrderNumber,
    /// Party the goods are released to.
    pub party_id: PartyId,
    /// Person authorized to collect.
    pub authorized_person: String,
    /// Start of the validity window.
    pub valid_from: Timestamp,
    /// End of the validity window.
    pub valid_to: Timestamp,
    /// Current workflow status.
    pub status: OrderStatus,
    /// Project Office has signed off.
    pub project_approved: bool,
    /// CISF has signed off.
    pub cisf_approved: bool,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Creating user.
    pub created_by: UserId,
    /// Creation time.
    pub created_at: Timestamp,
    /// Time of the last accepted operation.
    pub updated_at: Timestamp,
    /// Set once the order is archived. Archived orders are immutable.
    pub archived_at: Option<Timestamp>,
    /// Number of history entries; the sequence of the latest one.
    pub revision: u64,
    /// Optimistic-concurrency token. Bumped by every transition and by
    /// every issue report against the order.
    pub version: u64,
}

impl DeliveryOrder {
    /// Validate `new` and build an order in `created`, with its creation entry.
    ///
    /// Authorization is the gate's concern
    /// (see [`crate::gate::authorize_create`]).
    pub fn create(
        new: NewOrder,
        actor: &Actor,
        now: Timestamp,
    ) -> Result<(Self, HistoryEntry), ValidationError> {
        let authorized_person = require_text(
            "authorized_person",
            &new.authorized_person,
            AUTHORIZED_PERSON_MAX_LEN,
        )?;
        if new.valid_to < new.valid_from {
            return Err(ValidationError::InvertedWindow {
                valid_from: new.valid_from.to_rfc3339(),
                valid_to: new.valid_to.to_rfc3339(),
            });
        }
        let notes = match new.notes.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(text) => Some(require_text("notes", text, NOTES_MAX_LEN)?),
        };

        let order = Self {
            id: OrderId::new(),
            order_number: new.order_number,
            party_id: new.party_id,
            authorized_person,
            valid_from: new.valid_from,
            valid_to: new.valid_to,
            status: OrderStatus::Created,
            project_approved: false,
            cisf_approved: false,
            notes,
            created_by: actor.user_id,
            created_at: now,
            updated_at: now,
            archived_at: None,
            revision: 1,
            version: 1,
        };
        let entry = HistoryEntry {
            id: HistoryId::new(),
            order_id: order.id,
            sequence: 1,
            from_status: OrderStatus::Created,
            to_status: OrderStatus::Created,
            actor: actor.user_id,
            actor_role: actor.role,
            note: "Delivery order created".to_string(),
            recorded_at: now,
        };
        Ok((order, entry))
    }

    /// Current approval flags.
    pub fn approvals(&self) -> ApprovalFlags {
        ApprovalFlags {
            project_approved: self.project_approved,
            cisf_approved: self.cisf_approved,
        }
    }

    /// Whether the order has been archived.
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }

    /// Apply a transition the gate allowed and return its history entry.
    ///
    /// `note` should already be normalized
    /// (see [`crate::history::normalize_note`]); `None` uses the default note.
    pub fn apply(
        &mut self,
        planned: &PlannedTransition,
        actor: &Actor,
        note: Option<&str>,
        now: Timestamp,
    ) -> HistoryEntry {
        let note = note
            .map(str::to_string)
            .unwrap_or_else(|| planned.default_note());

        self.status = planned.to;
        self.project_approved = planned.approvals.project_approved;
        self.cisf_approved = planned.approvals.cisf_approved;
        if planned.archives {
            self.archived_at = Some(now);
        }
        self.updated_at = now;
        self.revision += 1;
        self.version += 1;

        HistoryEntry {
            id: HistoryId::new(),
            order_id: self.id,
            sequence: self.revision,
            from_status: planned.from,
            to_status: planned.to,
            actor: actor.user_id,
            actor_role: actor.role,
            note,
            recorded_at: now,
        }
    }
}
