//! # Issues
//!
//! A problem raised against an order. While any issue on an order is
//! [`IssueStatus::Open`], forwarding and approval of that order are refused.
//! An issue is resolved at most once and never reopened.

use dotrack_core::{error::require_text, Actor, IssueId, OrderId, Timestamp, UserId, ValidationError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::status::IssueStatus;

/// Category used when the reporter gives none.
pub const DEFAULT_CATEGORY: &str = "general";

/// Maximum length of an issue description.
pub const TEXT_MAX_LEN: usize = 2000;

/// Maximum length of a category.
pub const CATEGORY_MAX_LEN: usize = 64;

/// Input for reporting an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueReport {
    /// What is wrong.
    pub description: String,
    /// Optional classification.
    pub category: Option<String>,
}

/// How an issue was closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Resolving user.
    pub resolved_by: UserId,
    /// Resolution text.
    pub text: String,
    /// When it was resolved.
    pub resolved_at: Timestamp,
}

/// An issue raised against an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Unique identifier.
    pub id: IssueId,
    /// The order it is raised against.
    pub order_id: OrderId,
    /// What is wrong.
    pub description: String,
    /// Classification.
    pub category: String,
    /// Open or resolved.
    pub status: IssueStatus,
    /// Reporting user.
    pub reported_by: UserId,
    /// When it was reported.
    pub reported_at: Timestamp,
    /// Present exactly when `status` is `Resolved`.
    pub resolution: Option<Resolution>,
}

/// Errors from resolving an issue.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IssueError {
    /// The issue is already resolved.
    #[error("issue {issue_id} is already resolved")]
    AlreadyResolved {
        /// The issue.
        issue_id: IssueId,
    },

    /// The resolution text is blank.
    #[error("resolution text for issue {issue_id} must not be empty")]
    EmptyResolution {
        /// The issue.
        issue_id: IssueId,
    },
}

impl Issue {
    /// Validate `report` and build an open issue against `order_id`.
    pub fn report(
        order_id: OrderId,
        report: IssueReport,
        actor: &Actor,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        let description = require_text("description", &report.description, TEXT_MAX_LEN)?;
        let category = match report.category.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_CATEGORY.to_string(),
            Some(text) => require_text("category", text, CATEGORY_MAX_LEN)?,
        };
        Ok(Self {
            id: IssueId::new(),
            order_id,
            description,
            category,
            status: IssueStatus::Open,
            reported_by: actor.user_id,
            reported_at: now,
            resolution: None,
        })
    }

    /// Whether the issue still blocks its order.
    pub fn is_open(&self) -> bool {
        self.status == IssueStatus::Open
    }

    /// Close the issue with `text`.
    ///
    /// Any role may resolve. Fails if the issue is already resolved or the
    /// text is blank, in that order.
    pub fn resolve(&mut self, text: &str, actor: &Actor, now: Timestamp) -> Result<(), IssueError> {
        if !self.is_open() {
            return Err(IssueError::AlreadyResolved { issue_id: self.id });
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(IssueError::EmptyResolution { issue_id: self.id });
        }
        self.status = IssueStatus::Resolved;
        self.resolution = Some(Resolution {
            resolved_by: actor.user_id,
            text: text.to_string(),
            resolved_at: now,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dotrack_core::Role;

    fn actor(role: Role) -> Actor {
        Actor::new(UserId::new(), role)
    }

    fn open_issue() -> Issue {
        Issue::report(
            OrderId::new(),
            IssueReport {
                description: "Quantity mismatch".into(),
                category: None,
            },
            &actor(Role::ProjectOffice),
            Timestamp::now(),
        )
        .unwrap()
    }

    #[test]
    fn report_defaults_category() {
        let issue = open_issue();
        assert_eq!(issue.category, DEFAULT_CATEGORY);
        assert!(issue.is_open());
        assert!(issue.resolution.is_none());
    }

    #[test]
    fn report_requires_description() {
        let err = Issue::report(
            OrderId::new(),
            IssueReport {
                description: " ".into(),
                category: Some("weight".into()),
            },
            &actor(Role::Cisf),
            Timestamp::now(),
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::MissingField { field: "description" });
    }

    #[test]
    fn resolve_once() {
        let mut issue = open_issue();
        let resolver = actor(Role::RoadSale);
        issue.resolve("  recounted  ", &resolver, Timestamp::now()).unwrap();
        assert_eq!(issue.status, IssueStatus::Resolved);
        let resolution = issue.resolution.as_ref().unwrap();
        assert_eq!(resolution.text, "recounted");
        assert_eq!(resolution.resolved_by, resolver.user_id);

        let err = issue.resolve("again", &resolver, Timestamp::now()).unwrap_err();
        assert_eq!(err, IssueError::AlreadyResolved { issue_id: issue.id });
    }

    #[test]
    fn blank_resolution_rejected() {
        let mut issue = open_issue();
        let err = issue
            .resolve("\n", &actor(Role::Admin), Timestamp::now())
            .unwrap_err();
        assert_eq!(err, IssueError::EmptyResolution { issue_id: issue.id });
        assert!(issue.is_open());
    }

    #[test]
    fn already_resolved_checked_first() {
        let mut issue = open_issue();
        issue.resolve("done", &actor(Role::Admin), Timestamp::now()).unwrap();
        let err = issue.resolve("", &actor(Role::Admin), Timestamp::now()).unwrap_err();
        assert!(matches!(err, IssueError::AlreadyResolved { .. }));
    }
}
