use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{ServiceError, ServiceResult};
use crate::database::models::Meeting;
use crate::database::DatabaseManager;
use crate::types::MeetingType;

const MEETING_COLUMNS: &str = "id, title, date, type, notes, created_by, created_at";

/// Key of the volunteer meeting counter in `global_config`
pub const MEETING_COUNT_KEY: &str = "MEETING_COUNT";

#[derive(Debug, Clone)]
pub struct NewMeeting {
    pub title: String,
    pub date: DateTime<Utc>,
    pub meeting_type: MeetingType,
    pub notes: Option<String>,
    pub created_by: Option<String>,
}

pub struct MeetingService {
    pool: PgPool,
}

impl MeetingService {
    pub async fn new() -> ServiceResult<Self> {
        Ok(Self::with_pool(DatabaseManager::pool().await?))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All meetings, newest first, after marking past scheduled ones as held
    pub async fn list(&self, now: DateTime<Utc>) -> ServiceResult<Vec<Meeting>> {
        let held = sqlx::query("UPDATE meetings SET type = 'REALIZADA' WHERE type = 'AGENDADA' AND date < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        if held.rows_affected() > 0 {
            tracing::debug!("Marked {} meetings as held", held.rows_affected());
        }

        let sql = format!("SELECT {} FROM meetings ORDER BY date DESC", MEETING_COLUMNS);
        let meetings = sqlx::query_as::<_, Meeting>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(meetings)
    }

    pub async fn create(&self, new: NewMeeting) -> ServiceResult<Meeting> {
        let sql = format!(
            "INSERT INTO meetings (title, date, type, notes, created_by) VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            MEETING_COLUMNS
        );
        let meeting = sqlx::query_as::<_, Meeting>(&sql)
            .bind(&new.title)
            .bind(new.date)
            .bind(new.meeting_type)
            .bind(&new.notes)
            .bind(&new.created_by)
            .fetch_one(&self.pool)
            .await?;
        Ok(meeting)
    }

    pub async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        let result = sqlx::query("DELETE FROM meetings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound("Meeting not found".to_string()));
        }
        Ok(())
    }

    /// Counts per meeting type: (scheduled, held)
    pub async fn counts_by_type(&self) -> ServiceResult<(i64, i64)> {
        let rows: Vec<(MeetingType, i64)> =
            sqlx::query_as("SELECT type, COUNT(*) FROM meetings GROUP BY type")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().fold((0, 0), |(scheduled, held), (kind, n)| match kind {
            MeetingType::Agendada => (scheduled + n, held),
            MeetingType::Realizada => (scheduled, held + n),
        }))
    }

    pub async fn meeting_count(&self) -> ServiceResult<i64> {
        let value: Option<(String,)> = sqlx::query_as("SELECT value FROM global_config WHERE key = $1")
            .bind(MEETING_COUNT_KEY)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value.and_then(|(v,)| v.trim().parse().ok()).unwrap_or(0))
    }

    /// Atomically bump the counter and return the new value
    pub async fn increment_meeting_count(&self) -> ServiceResult<i64> {
        let (value,): (String,) = sqlx::query_as(
            "INSERT INTO global_config (key, value) VALUES ($1, '1') \
             ON CONFLICT (key) DO UPDATE SET value = ( \
               CASE WHEN global_config.value ~ '^[0-9]+$' THEN global_config.value::BIGINT ELSE 0 END + 1 \
             )::TEXT \
             RETURNING value",
        )
        .bind(MEETING_COUNT_KEY)
        .fetch_one(&self.pool)
        .await?;
        value
            .parse()
            .map_err(|_| ServiceError::Invalid(format!("Meeting counter holds a non-numeric value: {}", value)))
    }
}
