use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::{AgeGroup, CheckpointCategory, Gender, PersonType};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub id: Uuid,
    pub name: String,
    pub category: CheckpointCategory,
    pub created_at: DateTime<Utc>,
}

/// A person scanning in at a checkpoint
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Movement {
    pub id: Uuid,
    pub person_id: Uuid,
    pub checkpoint_id: Uuid,
    #[serde(rename = "timestamp")]
    pub recorded_at: DateTime<Utc>,
}

/// Staff-entered headcount not tied to an identified person
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ManualEntry {
    pub id: Uuid,
    pub checkpoint_id: Uuid,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub person_type: PersonType,
    pub church: Option<String>,
    pub age_group: Option<AgeGroup>,
    pub gender: Option<Gender>,
    pub quantity: i32,
    pub marketing_source: Option<String>,
    pub is_salvation: bool,
    pub is_healing: bool,
    pub is_deliverance: bool,
    #[serde(rename = "timestamp")]
    pub recorded_at: DateTime<Utc>,
}
