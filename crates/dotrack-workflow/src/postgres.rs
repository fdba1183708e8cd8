//! # PostgreSQL Store
//!
//! [`WorkflowStore`] over a `sqlx` connection pool. Every write runs in one
//! SQL transaction; dropping the transaction without commit rolls it back.
//!
//! Transitions use `UPDATE delivery_orders ... WHERE id = $1 AND version = $2`.
//! Zero affected rows means another writer got there first: the transaction
//! is rolled back before the history row is written.
//!
//! Statuses are stored as their wire names and parsed back through the
//! taxonomy; a value outside it surfaces as [`StoreError::Backend`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dotrack_core::{
    HistoryId, IssueId, OrderId, OrderNumber, PartyId, Role, Timestamp, UserId,
};
use dotrack_state::{DeliveryOrder, HistoryEntry, Issue, IssueStatus, OrderStatus, Resolution};
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use crate::store::{StoreError, WorkflowStore};

/// SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Connect to `url`, apply the embedded migrations and return the pool.
pub async fn init_pool(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .connect(url)
        .await?;
    tracing::info!("connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database migrations applied");

    Ok(pool)
}

/// Store backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool. Migrations must already be applied.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ─── Column codecs ──────────────────────────────────────────────────

fn to_db_int(field: &'static str, value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::Backend(format!("{field} {value} exceeds BIGINT")))
}

fn from_db_int(field: &'static str, value: i64) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::Backend(format!("negative {field} {value} in database")))
}

fn parse_status(value: &str) -> Result<OrderStatus, StoreError> {
    OrderStatus::from_name(value).map_err(|e| StoreError::Backend(e.to_string()))
}

fn ts(value: DateTime<Utc>) -> Timestamp {
    Timestamp::from_utc(value)
}

// ─── Rows ───────────────────────────────────────────────────────────

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    party_id: Uuid,
    authorized_person: String,
    valid_from: DateTime<Utc>,
    valid_to: DateTime<Utc>,
    status: String,
    project_approved: bool,
    cisf_approved: bool,
    notes: Option<String>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    archived_at: Option<DateTime<Utc>>,
    revision: i64,
    version: i64,
}

impl OrderRow {
    fn into_record(self) -> Result<DeliveryOrder, StoreError> {
        Ok(DeliveryOrder {
            id: OrderId::from_uuid(self.id),
            order_number: OrderNumber::new(&self.order_number)
                .map_err(|e| StoreError::Backend(e.to_string()))?,
            party_id: PartyId::from_uuid(self.party_id),
            authorized_person: self.authorized_person,
            valid_from: ts(self.valid_from),
            valid_to: ts(self.valid_to),
            status: parse_status(&self.status)?,
            project_approved: self.project_approved,
            cisf_approved: self.cisf_approved,
            notes: self.notes,
            created_by: UserId::from_uuid(self.created_by),
            created_at: ts(self.created_at),
            updated_at: ts(self.updated_at),
            archived_at: self.archived_at.map(ts),
            revision: from_db_int("revision", self.revision)?,
            version: from_db_int("version", self.version)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct IssueRow {
    id: Uuid,
    order_id: Uuid,
    description: String,
    category: String,
    status: String,
    reported_by: Uuid,
    reported_at: DateTime<Utc>,
    resolved_by: Option<Uuid>,
    resolution: Option<String>,
    resolved_at: Option<DateTime<Utc>>,
}

impl IssueRow {
    fn into_record(self) -> Result<Issue, StoreError> {
        let status =
            IssueStatus::from_name(&self.status).map_err(|e| StoreError::Backend(e.to_string()))?;
        let resolution = match (self.resolved_by, self.resolution, self.resolved_at) {
            (Some(by), Some(text), Some(at)) => Some(Resolution {
                resolved_by: UserId::from_uuid(by),
                text,
                resolved_at: ts(at),
            }),
            _ => None,
        };
        Ok(Issue {
            id: IssueId::from_uuid(self.id),
            order_id: OrderId::from_uuid(self.order_id),
            description: self.description,
            category: self.category,
            status,
            reported_by: UserId::from_uuid(self.reported_by),
            reported_at: ts(self.reported_at),
            resolution,
        })
    }
}

#[derive(sqlx::FromRow)]
struct HistoryRow {
    id: Uuid,
    order_id: Uuid,
    sequence: i64,
    from_status: String,
    to_status: String,
    actor: Uuid,
    actor_role: String,
    note: String,
    recorded_at: DateTime<Utc>,
}

impl HistoryRow {
    fn into_record(self) -> Result<HistoryEntry, StoreError> {
        Ok(HistoryEntry {
            id: HistoryId::from_uuid(self.id),
            order_id: OrderId::from_uuid(self.order_id),
            sequence: from_db_int("sequence", self.sequence)?,
            from_status: parse_status(&self.from_status)?,
            to_status: parse_status(&self.to_status)?,
            actor: UserId::from_uuid(self.actor),
            actor_role: Role::from_name(&self.actor_role)
                .map_err(|e| StoreError::Backend(e.to_string()))?,
            note: self.note,
            recorded_at: ts(self.recorded_at),
        })
    }
}

const ORDER_COLUMNS: &str = "id, order_number, party_id, authorized_person, valid_from, valid_to, \
     status, project_approved, cisf_approved, notes, created_by, created_at, updated_at, \
     archived_at, revision, version";

const ISSUE_COLUMNS: &str = "id, order_id, description, category, status, reported_by, \
     reported_at, resolved_by, resolution, resolved_at";

async fn insert_history(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    entry: &HistoryEntry,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO workflow_history (id, order_id, sequence, from_status, to_status, actor,
         actor_role, note, recorded_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(*entry.id.as_uuid())
    .bind(*entry.order_id.as_uuid())
    .bind(to_db_int("sequence", entry.sequence)?)
    .bind(entry.from_status.as_str())
    .bind(entry.to_status.as_str())
    .bind(*entry.actor.as_uuid())
    .bind(entry.actor_role.as_str())
    .bind(&entry.note)
    .bind(entry.recorded_at.into_datetime())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some(UNIQUE_VIOLATION),
        _ => false,
    }
}

#[async_trait]
impl WorkflowStore for PgStore {
    async fn insert_order(
        &self,
        order: &DeliveryOrder,
        entry: &HistoryEntry,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let inserted = sqlx::query(
            "INSERT INTO delivery_orders (id, order_number, party_id, authorized_person,
             valid_from, valid_to, status, project_approved, cisf_approved, notes, created_by,
             created_at, updated_at, archived_at, revision, version)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
        )
        .bind(*order.id.as_uuid())
        .bind(order.order_number.as_str())
        .bind(*order.party_id.as_uuid())
        .bind(&order.authorized_person)
        .bind(order.valid_from.into_datetime())
        .bind(order.valid_to.into_datetime())
        .bind(order.status.as_str())
        .bind(order.project_approved)
        .bind(order.cisf_approved)
        .bind(&order.notes)
        .bind(*order.created_by.as_uuid())
        .bind(order.created_at.into_datetime())
        .bind(order.updated_at.into_datetime())
        .bind(order.archived_at.map(Timestamp::into_datetime))
        .bind(to_db_int("revision", order.revision)?)
        .bind(to_db_int("version", order.version)?)
        .execute(&mut *tx)
        .await;

        match inserted {
            Err(err) if is_unique_violation(&err) => {
                return Err(StoreError::DuplicateOrderNumber(
                    order.order_number.as_str().to_string(),
                ));
            }
            other => {
                other?;
            }
        }

        insert_history(&mut tx, entry).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<DeliveryOrder>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM delivery_orders WHERE id = $1"
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(OrderRow::into_record).transpose()
    }

    async fn list_orders(
        &self,
        status: Option<OrderStatus>,
    ) -> Result<Vec<DeliveryOrder>, StoreError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM delivery_orders
             WHERE archived_at IS NULL AND ($1::TEXT IS NULL OR status = $1)
             ORDER BY created_at DESC"
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(OrderRow::into_record).collect()
    }

    async fn commit_transition(
        &self,
        order: &DeliveryOrder,
        expected_version: u64,
        entry: &HistoryEntry,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "UPDATE delivery_orders
             SET status = $3, project_approved = $4, cisf_approved = $5, updated_at = $6,
                 archived_at = $7, revision = $8, version = $9
             WHERE id = $1 AND version = $2",
        )
        .bind(*order.id.as_uuid())
        .bind(to_db_int("version", expected_version)?)
        .bind(order.status.as_str())
        .bind(order.project_approved)
        .bind(order.cisf_approved)
        .bind(order.updated_at.into_datetime())
        .bind(order.archived_at.map(Timestamp::into_datetime))
        .bind(to_db_int("revision", order.revision)?)
        .bind(to_db_int("version", order.version)?)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StoreError::VersionConflict {
                order_id: order.id,
                expected_version,
            });
        }

        insert_history(&mut tx, entry).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn open_issue_ids(&self, order_id: OrderId) -> Result<Vec<IssueId>, StoreError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM issues WHERE order_id = $1 AND status = 'OPEN' ORDER BY reported_at ASC",
        )
        .bind(*order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        Ok(ids.into_iter().map(IssueId::from_uuid).collect())
    }

    async fn insert_issue(&self, issue: &Issue) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let bumped = sqlx::query("UPDATE delivery_orders SET version = version + 1 WHERE id = $1")
            .bind(*issue.order_id.as_uuid())
            .execute(&mut *tx)
            .await?;
        if bumped.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StoreError::OrderNotFound(issue.order_id));
        }

        sqlx::query(
            "INSERT INTO issues (id, order_id, description, category, status, reported_by,
             reported_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(*issue.id.as_uuid())
        .bind(*issue.order_id.as_uuid())
        .bind(&issue.description)
        .bind(&issue.category)
        .bind(issue.status.as_str())
        .bind(*issue.reported_by.as_uuid())
        .bind(issue.reported_at.into_datetime())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_issue(&self, id: IssueId) -> Result<Option<Issue>, StoreError> {
        let row = sqlx::query_as::<_, IssueRow>(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues WHERE id = $1"
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(IssueRow::into_record).transpose()
    }

    async fn commit_resolution(&self, issue: &Issue) -> Result<(), StoreError> {
        let resolution = issue
            .resolution
            .as_ref()
            .ok_or_else(|| StoreError::Backend(format!("issue {} has no resolution", issue.id)))?;
        let result = sqlx::query(
            "UPDATE issues
             SET status = 'RESOLVED', resolved_by = $2, resolution = $3, resolved_at = $4
             WHERE id = $1 AND status = 'OPEN'",
        )
        .bind(*issue.id.as_uuid())
        .bind(*resolution.resolved_by.as_uuid())
        .bind(&resolution.text)
        .bind(resolution.resolved_at.into_datetime())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM issues WHERE id = $1")
                .bind(*issue.id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;
            return Err(match exists {
                Some(_) => StoreError::IssueAlreadyResolved(issue.id),
                None => StoreError::IssueNotFound(issue.id),
            });
        }
        Ok(())
    }

    async fn issues_for_order(&self, order_id: OrderId) -> Result<Vec<Issue>, StoreError> {
        let rows = sqlx::query_as::<_, IssueRow>(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues WHERE order_id = $1 ORDER BY reported_at ASC"
        ))
        .bind(*order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(IssueRow::into_record).collect()
    }

    async fn history_for_order(&self, order_id: OrderId) -> Result<Vec<HistoryEntry>, StoreError> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            "SELECT id, order_id, sequence, from_status, to_status, actor, actor_role, note,
             recorded_at
             FROM workflow_history WHERE order_id = $1 ORDER BY sequence ASC",
        )
        .bind(*order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(HistoryRow::into_record).collect()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_codecs_reject_out_of_range() {
        assert!(to_db_int("version", u64::MAX).is_err());
        assert!(from_db_int("version", -1).is_err());
        assert_eq!(from_db_int("version", 7).unwrap(), 7);
    }

    #[test]
    fn unknown_status_is_a_backend_error() {
        assert!(matches!(parse_status("APPROVED"), Err(StoreError::Backend(_))));
    }

    #[test]
    fn resolution_requires_all_columns() {
        let row = IssueRow {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            description: "Torn invoice".into(),
            category: "general".into(),
            status: "OPEN".into(),
            reported_by: Uuid::new_v4(),
            reported_at: Utc::now(),
            resolved_by: None,
            resolution: None,
            resolved_at: None,
        };
        let issue = row.into_record().unwrap();
        assert!(issue.is_open());
        assert!(issue.resolution.is_none());
    }
}
