use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::{ServiceError, ServiceResult};
use crate::database::models::person::PERSON_COLUMNS;
use crate::database::models::{Checkpoint, ManualEntry, Person};
use crate::database::DatabaseManager;
use crate::types::{AgeGroup, CheckpointCategory, Gender, PersonType};

const MANUAL_ENTRY_COLUMNS: &str = "id, checkpoint_id, type, church, age_group, gender, quantity, \
     marketing_source, is_salvation, is_healing, is_deliverance, recorded_at";

/// Manual headcount as entered by staff
#[derive(Debug, Clone)]
pub struct NewManualEntry {
    pub checkpoint_id: Uuid,
    pub person_type: PersonType,
    pub church: String,
    pub quantity: i32,
    pub age_group: Option<AgeGroup>,
    pub gender: Option<Gender>,
    pub marketing_source: Option<String>,
    pub is_salvation: bool,
    pub is_healing: bool,
    pub is_deliverance: bool,
}

#[derive(Debug)]
pub enum CountOutcome {
    /// Same tap twice within the debounce window
    Ignored,
    Recorded { entry: ManualEntry, total_today: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanDecision {
    /// Scanned again within the debounce window
    Ignored,
    /// Already entered today at a checkpoint without re-entry
    Reentry,
    Success,
}

#[derive(Debug)]
pub struct ScanOutcome {
    pub decision: ScanDecision,
    pub person: Option<Person>,
}

/// What to do with a scan given the person's latest movement there today
pub fn scan_decision(
    latest_today: Option<DateTime<Utc>>,
    category: CheckpointCategory,
    now: DateTime<Utc>,
    debounce: Duration,
) -> ScanDecision {
    match latest_today {
        Some(at) if now - at < debounce => ScanDecision::Ignored,
        Some(_) if !category.allows_reentry() => ScanDecision::Reentry,
        _ => ScanDecision::Success,
    }
}

/// A repeat of the latest entry (same gender and age group) inside the debounce window
pub fn is_double_tap(
    latest: Option<&ManualEntry>,
    entry: &NewManualEntry,
    now: DateTime<Utc>,
    debounce: Duration,
) -> bool {
    match latest {
        Some(last) => {
            last.gender == entry.gender
                && last.age_group == entry.age_group
                && now - last.recorded_at < debounce
        }
        None => false,
    }
}

pub struct CheckpointService {
    pool: PgPool,
}

impl CheckpointService {
    pub async fn new() -> ServiceResult<Self> {
        Ok(Self::with_pool(DatabaseManager::pool().await?))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> ServiceResult<Vec<Checkpoint>> {
        let checkpoints = sqlx::query_as::<_, Checkpoint>(
            "SELECT id, name, category, created_at FROM checkpoints ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(checkpoints)
    }

    pub async fn find(&self, id: Uuid) -> ServiceResult<Option<Checkpoint>> {
        let checkpoint = sqlx::query_as::<_, Checkpoint>(
            "SELECT id, name, category, created_at FROM checkpoints WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(checkpoint)
    }

    /// Store a headcount unless it repeats the previous tap; `day` bounds "today"
    pub async fn record_count(
        &self,
        entry: NewManualEntry,
        now: DateTime<Utc>,
        debounce: Duration,
        day: (DateTime<Utc>, DateTime<Utc>),
    ) -> ServiceResult<CountOutcome> {
        if self.find(entry.checkpoint_id).await?.is_none() {
            return Err(ServiceError::NotFound("Checkpoint not found".to_string()));
        }

        let sql = format!(
            "SELECT {} FROM manual_entries WHERE checkpoint_id = $1 AND type = $2 \
             ORDER BY recorded_at DESC LIMIT 1",
            MANUAL_ENTRY_COLUMNS
        );
        let latest = sqlx::query_as::<_, ManualEntry>(&sql)
            .bind(entry.checkpoint_id)
            .bind(entry.person_type)
            .fetch_optional(&self.pool)
            .await?;

        if is_double_tap(latest.as_ref(), &entry, now, debounce) {
            tracing::debug!("Ignoring repeated count at checkpoint {}", entry.checkpoint_id);
            return Ok(CountOutcome::Ignored);
        }

        let sql = format!(
            "INSERT INTO manual_entries (checkpoint_id, type, church, age_group, gender, quantity, \
               marketing_source, is_salvation, is_healing, is_deliverance, recorded_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {}",
            MANUAL_ENTRY_COLUMNS
        );
        let stored = sqlx::query_as::<_, ManualEntry>(&sql)
            .bind(entry.checkpoint_id)
            .bind(entry.person_type)
            .bind(&entry.church)
            .bind(entry.age_group)
            .bind(entry.gender)
            .bind(entry.quantity)
            .bind(&entry.marketing_source)
            .bind(entry.is_salvation)
            .bind(entry.is_healing)
            .bind(entry.is_deliverance)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        let (total_today,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM manual_entries \
             WHERE checkpoint_id = $1 AND recorded_at >= $2 AND recorded_at < $3",
        )
        .bind(entry.checkpoint_id)
        .bind(day.0)
        .bind(day.1)
        .fetch_one(&self.pool)
        .await?;

        Ok(CountOutcome::Recorded {
            entry: stored,
            total_today,
        })
    }

    /// QR scan of a person at a checkpoint
    pub async fn track(
        &self,
        person_id: Uuid,
        checkpoint_id: Uuid,
        now: DateTime<Utc>,
        debounce: Duration,
        day: (DateTime<Utc>, DateTime<Utc>),
    ) -> ServiceResult<ScanOutcome> {
        let checkpoint = self
            .find(checkpoint_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Checkpoint not found".to_string()))?;

        let sql = format!("SELECT {} FROM people WHERE id = $1", PERSON_COLUMNS);
        let person = sqlx::query_as::<_, Person>(&sql)
            .bind(person_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Person not found".to_string()))?;

        let latest: Option<(DateTime<Utc>,)> = sqlx::query_as(
            "SELECT recorded_at FROM movements \
             WHERE person_id = $1 AND checkpoint_id = $2 AND recorded_at >= $3 AND recorded_at < $4 \
             ORDER BY recorded_at DESC LIMIT 1",
        )
        .bind(person_id)
        .bind(checkpoint_id)
        .bind(day.0)
        .bind(day.1)
        .fetch_optional(&self.pool)
        .await?;

        let decision = scan_decision(latest.map(|(at,)| at), checkpoint.category, now, debounce);
        match decision {
            ScanDecision::Ignored => {
                tracing::debug!("Ignoring repeated scan of {} at {}", person_id, checkpoint.name);
                Ok(ScanOutcome { decision, person: None })
            }
            ScanDecision::Reentry => Ok(ScanOutcome {
                decision,
                person: Some(person),
            }),
            ScanDecision::Success => {
                sqlx::query("INSERT INTO movements (person_id, checkpoint_id, recorded_at) VALUES ($1, $2, $3)")
                    .bind(person_id)
                    .bind(checkpoint_id)
                    .bind(now)
                    .execute(&self.pool)
                    .await?;
                Ok(ScanOutcome {
                    decision,
                    person: Some(person),
                })
            }
        }
    }
}
