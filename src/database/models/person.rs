use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::{Gender, PersonType, Role};

/// Column list shared by every query that loads a full person
pub const PERSON_COLUMNS: &str = "id, name, email, phone, age, type, role, department, church, \
     gender, marketing_source, created_at, updated_at";

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub age: Option<i32>,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub person_type: PersonType,
    pub role: Role,
    pub department: Option<String>,
    pub church: Option<String>,
    pub gender: Option<Gender>,
    pub marketing_source: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Search result that also tells the front desk whether the person is already inside
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PersonWithPresence {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub person: Person,
    pub has_entered: bool,
}
