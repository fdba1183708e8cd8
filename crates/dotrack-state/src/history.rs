//! # Workflow History
//!
//! Append-only audit log of status changes. One entry per accepted
//! operation (creation included), numbered by a per-order `sequence` that
//! starts at 1. Entries are never updated or deleted.
//!
//! [`verify_audit_trail`] checks that an order's log replays to its current
//! status.

use dotrack_core::{HistoryId, OrderId, Role, Timestamp, UserId, ValidationError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::order::DeliveryOrder;
use crate::status::OrderStatus;

/// Maximum length of an audit note.
pub const NOTE_MAX_LEN: usize = 2000;

/// One status change of one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Entry identifier.
    pub id: HistoryId,
    /// The order this entry belongs to.
    pub order_id: OrderId,
    /// Position in the order's log, starting at 1.
    pub sequence: u64,
    /// Status before the change. Equals `to_status` for creation and archival.
    pub from_status: OrderStatus,
    /// Status after the change.
    pub to_status: OrderStatus,
    /// Who made the change.
    pub actor: UserId,
    /// The role they acted in.
    pub actor_role: Role,
    /// Caller-supplied or machine-generated note.
    pub note: String,
    /// When the change was committed.
    pub recorded_at: Timestamp,
}

/// Trim a caller-supplied note. Blank notes count as absent.
pub fn normalize_note(note: Option<&str>) -> Result<Option<String>, ValidationError> {
    match note.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) if text.chars().count() > NOTE_MAX_LEN => Err(ValidationError::TooLong {
            field: "note",
            max: NOTE_MAX_LEN,
        }),
        Some(text) => Ok(Some(text.to_string())),
    }
}

/// A history log that does not account for the order's current state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuditError {
    /// The order has no history at all.
    #[error("order {order_id} has no history")]
    Empty {
        /// The order.
        order_id: OrderId,
    },

    /// The first entry is not a creation entry.
    #[error("first history entry of order {order_id} is {from} -> {to}, expected created -> created")]
    MissingCreation {
        /// The order.
        order_id: OrderId,
        /// `from_status` of the first entry.
        from: OrderStatus,
        /// `to_status` of the first entry.
        to: OrderStatus,
    },

    /// An entry belongs to another order.
    #[error("history entry {sequence} belongs to order {found}, not {order_id}")]
    ForeignEntry {
        /// The order being verified.
        order_id: OrderId,
        /// Sequence of the stray entry.
        sequence: u64,
        /// The order the entry names.
        found: OrderId,
    },

    /// Sequence numbers are not 1, 2, 3, ...
    #[error("history sequence gap: expected {expected}, found {found}")]
    SequenceGap {
        /// Expected sequence.
        expected: u64,
        /// Sequence found.
        found: u64,
    },

    /// An entry does not start where the previous one ended.
    #[error("history entry {sequence} starts at {found}, previous entry ended at {expected}")]
    Discontinuity {
        /// Sequence of the offending entry.
        sequence: u64,
        /// `to_status` of the previous entry.
        expected: OrderStatus,
        /// `from_status` of the offending entry.
        found: OrderStatus,
    },

    /// The last entry does not end at the order's status.
    #[error("history ends at {history}, order is at {current}")]
    StatusMismatch {
        /// `to_status` of the last entry.
        history: OrderStatus,
        /// The order's current status.
        current: OrderStatus,
    },

    /// The order's revision does not match the number of entries.
    #[error("order revision is {revision} but history has {entries} entries")]
    RevisionMismatch {
        /// The order's revision.
        revision: u64,
        /// Number of entries.
        entries: u64,
    },
}

/// Check that `entries` (in sequence order) is a complete log of `order`.
///
/// The log must start with a `created → created` entry, be gap-free and
/// contiguous, and end at the order's current status.
pub fn verify_audit_trail(order: &DeliveryOrder, entries: &[HistoryEntry]) -> Result<(), AuditError> {
    let first = entries.first().ok_or(AuditError::Empty { order_id: order.id })?;
    if first.from_status != OrderStatus::Created || first.to_status != OrderStatus::Created {
        return Err(AuditError::MissingCreation {
            order_id: order.id,
            from: first.from_status,
            to: first.to_status,
        });
    }

    let mut previous: Option<&HistoryEntry> = None;
    for (expected, entry) in (1u64..).zip(entries) {
        if entry.order_id != order.id {
            return Err(AuditError::ForeignEntry {
                order_id: order.id,
                sequence: entry.sequence,
                found: entry.order_id,
            });
        }
        if entry.sequence != expected {
            return Err(AuditError::SequenceGap {
                expected,
                found: entry.sequence,
            });
        }
        if let Some(prev) = previous {
            if entry.from_status != prev.to_status {
                return Err(AuditError::Discontinuity {
                    sequence: entry.sequence,
                    expected: prev.to_status,
                    found: entry.from_status,
                });
            }
        }
        previous = Some(entry);
    }

    let last = previous.unwrap_or(first);
    if last.to_status != order.status {
        return Err(AuditError::StatusMismatch {
            history: last.to_status,
            current: order.status,
        });
    }
    let count = entries.len() as u64;
    if order.revision != count {
        return Err(AuditError::RevisionMismatch {
            revision: order.revision,
            entries: count,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::evaluate;
    use crate::operation::Operation;
    use crate::order::tests::{area_office, sample_order};

    #[test]
    fn blank_notes_are_absent() {
        assert_eq!(normalize_note(None).unwrap(), None);
        assert_eq!(normalize_note(Some("   ")).unwrap(), None);
        assert_eq!(normalize_note(Some(" ok ")).unwrap(), Some("ok".into()));
    }

    #[test]
    fn overlong_note_rejected() {
        let note = "x".repeat(NOTE_MAX_LEN + 1);
        assert!(normalize_note(Some(&note)).is_err());
    }

    #[test]
    fn fresh_order_verifies() {
        let (order, entry) = sample_order();
        verify_audit_trail(&order, &[entry]).unwrap();
    }

    #[test]
    fn transitions_keep_trail_valid() {
        let (mut order, created) = sample_order();
        let actor = area_office();
        let planned = evaluate(
            &order,
            &[],
            Operation::Forward {
                to: OrderStatus::AtAreaOffice,
            },
            &actor,
        )
        .unwrap();
        let forwarded = order.apply(&planned, &actor, None, Timestamp::now());
        verify_audit_trail(&order, &[created, forwarded]).unwrap();
    }

    #[test]
    fn missing_entry_detected() {
        let (mut order, _) = sample_order();
        let actor = area_office();
        let planned = evaluate(
            &order,
            &[],
            Operation::Forward {
                to: OrderStatus::AtAreaOffice,
            },
            &actor,
        )
        .unwrap();
        let forwarded = order.apply(&planned, &actor, None, Timestamp::now());
        let err = verify_audit_trail(&order, &[forwarded]).unwrap_err();
        assert!(matches!(err, AuditError::MissingCreation { .. }));
    }

    #[test]
    fn empty_history_detected() {
        let (order, _) = sample_order();
        assert_eq!(
            verify_audit_trail(&order, &[]),
            Err(AuditError::Empty { order_id: order.id })
        );
    }

    #[test]
    fn status_drift_detected() {
        let (mut order, entry) = sample_order();
        order.status = OrderStatus::AtProjectOffice;
        let err = verify_audit_trail(&order, &[entry]).unwrap_err();
        assert!(matches!(err, AuditError::StatusMismatch { .. }));
    }
}
