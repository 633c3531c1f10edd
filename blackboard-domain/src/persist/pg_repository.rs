//! Postgres 事件仓储（需启用 `infra-sqlx` 特性）
//!
//! 表结构由部署方维护，需至少包含以下列：
//! `sequence_number BIGSERIAL`, `event_type TEXT`, `event_subject UUID`,
//! `source_computer UUID`, `params TEXT NULL`, `recorded_at TIMESTAMPTZ`。
//!
use crate::error::DomainResult as Result;
use crate::persist::{EventRepository, StoredEvent};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

pub struct PgEventRepository {
    pool: PgPool,
    table: String,
}

impl PgEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self::with_table(pool, "blackboard_events")
    }

    pub fn with_table(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }

    fn decode(row: &PgRow) -> std::result::Result<StoredEvent, sqlx::Error> {
        let event = StoredEvent::builder()
            .sequence_number(row.try_get::<i64, _>("sequence_number")?)
            .event_type(row.try_get::<String, _>("event_type")?)
            .event_subject(row.try_get::<Uuid, _>("event_subject")?)
            .source_computer(row.try_get::<Uuid, _>("source_computer")?)
            .maybe_params(row.try_get::<Option<String>, _>("params")?)
            .recorded_at(row.try_get::<DateTime<Utc>, _>("recorded_at")?)
            .build();
        Ok(event)
    }
}

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn commit(&self, event: StoredEvent) -> Result<StoredEvent> {
        let sql = format!(
            "INSERT INTO {} (event_type, event_subject, source_computer, params, recorded_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING sequence_number",
            self.table
        );
        let row = sqlx::query(&sql)
            .bind(event.event_type())
            .bind(event.event_subject())
            .bind(event.source_computer())
            .bind(event.params())
            .bind(event.recorded_at())
            .fetch_one(&self.pool)
            .await?;
        let sequence_number: i64 = row.try_get("sequence_number")?;
        Ok(event.with_sequence_number(sequence_number))
    }

    async fn events_for(&self, subject: Uuid) -> Result<Vec<StoredEvent>> {
        let sql = format!(
            "SELECT sequence_number, event_type, event_subject, source_computer, params, recorded_at \
             FROM {} WHERE event_subject = $1 ORDER BY sequence_number",
            self.table
        );
        let rows = sqlx::query(&sql).bind(subject).fetch_all(&self.pool).await?;
        let events = rows
            .iter()
            .map(Self::decode)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(events)
    }

    async fn count(&self) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) AS total FROM {}", self.table);
        let row = sqlx::query(&sql).fetch_one(&self.pool).await?;
        let total: i64 = row.try_get("total")?;
        Ok(total.max(0) as usize)
    }
}
