// handlers/people.rs - Front-desk people lookup and registration

use axum::{
    extract::{Path, Query},
    response::Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::clock::day_bounds;
use crate::config::config;
use crate::database::models::{Person, PersonWithPresence};
use crate::error::{ApiError, ApiResult};
use crate::extract::{blank_as_none, digits_only, is_plausible_email, loose_age, parse_id, ValidJson};
use crate::services::{PersonService, PersonUpdate, QuickRegistration};
use crate::types::Gender;

const DECISIONS: [&str; 3] = ["ACEITOU", "RECONCILIACAO", "VISITANTE"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickRegisterRequest {
    pub name: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "loose_age")]
    pub age: Option<i32>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub guardian_name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub decision_type: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub department: Option<String>,
}

impl QuickRegisterRequest {
    fn validate(self) -> ApiResult<QuickRegistration> {
        let name = self.name.trim().to_string();
        if name.chars().count() < 3 {
            return Err(ApiError::invalid_field("name", "Name must have at least 3 characters"));
        }
        if let Some(email) = &self.email {
            if !is_plausible_email(email) {
                return Err(ApiError::invalid_field("email", "Invalid email"));
            }
        }
        if let Some(decision) = &self.decision_type {
            if !DECISIONS.contains(&decision.as_str()) {
                return Err(ApiError::invalid_field(
                    "decisionType",
                    "Expected ACEITOU, RECONCILIACAO or VISITANTE",
                ));
            }
        }
        if let Some(guardian) = &self.guardian_name {
            tracing::debug!("Quick registration of {} with guardian {}", name, guardian);
        }
        Ok(QuickRegistration {
            name,
            phone: self.phone.map(|p| digits_only(&p)).filter(|p| !p.is_empty()),
            email: self.email,
            age: self.age,
            decision: self.decision_type,
            department: self.department,
        })
    }
}

/**
 * POST /people/quick-register - Altar and kids-room registration
 *
 * Expected Input:
 * ```json
 * {
 *   "name": "string",            // Required: at least 3 characters
 *   "phone": "(61) 99999-0000",  // Optional: stored as digits
 *   "email": "string",           // Optional: upsert key when present
 *   "decisionType": "ACEITOU",   // Optional: ACEITOU, RECONCILIACAO, VISITANTE
 *   "department": "KIDS"         // Optional: also records a movement
 * }
 * ```
 */
pub async fn quick_register(ValidJson(body): ValidJson<QuickRegisterRequest>) -> ApiResult<Json<Value>> {
    let registration = body.validate()?;
    let person = PersonService::new().await?.quick_register(registration).await?;
    Ok(Json(json!({ "success": true, "person": person })))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: Option<String>,
}

/// GET /people/search?q= - up to 5 people by name or phone
pub async fn search(Query(query): Query<SearchQuery>) -> ApiResult<Json<Vec<Person>>> {
    let q = query.q.unwrap_or_default();
    let people = PersonService::new().await?.search(&q).await?;
    Ok(Json(people))
}

#[derive(Debug, Deserialize)]
pub struct PresenceQuery {
    #[serde(default)]
    pub search: Option<String>,
}

/// GET /people?search= - name search flagging who already entered today
pub async fn search_with_presence(
    Query(query): Query<PresenceQuery>,
) -> ApiResult<Json<Vec<PersonWithPresence>>> {
    let search = query.search.unwrap_or_default();
    if search.trim().is_empty() {
        return Ok(Json(Vec::new()));
    }
    let (start, end) = day_bounds(Utc::now(), config().event.offset());
    let people = PersonService::new()
        .await?
        .search_with_presence(&search, start, end)
        .await?;
    Ok(Json(people))
}

/// GET /people/incomplete
pub async fn incomplete() -> ApiResult<Json<Vec<Person>>> {
    let people = PersonService::new().await?.incomplete().await?;
    Ok(Json(people))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePersonRequest {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub marketing_source: Option<String>,
    #[serde(default, deserialize_with = "loose_age")]
    pub age: Option<i32>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub church: Option<String>,
}

impl From<UpdatePersonRequest> for PersonUpdate {
    fn from(body: UpdatePersonRequest) -> Self {
        PersonUpdate {
            gender: body.gender.as_deref().and_then(Gender::parse_loose),
            phone: body.phone.map(|p| digits_only(&p)).filter(|p| !p.is_empty()),
            marketing_source: body.marketing_source,
            age: body.age,
            church: body.church,
        }
    }
}

/// PUT /person/:id - complete missing registration data
pub async fn update_person(
    Path(id): Path<String>,
    ValidJson(body): ValidJson<UpdatePersonRequest>,
) -> ApiResult<Json<Person>> {
    let id = parse_id(&id, "Person")?;
    let person = PersonService::new().await?.update(id, body.into()).await?;
    Ok(Json(person))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(value: Value) -> QuickRegisterRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn phone_is_reduced_to_digits() {
        let reg = request(json!({ "name": "João Pedro", "phone": "(61) 98888-7777", "age": "9" }))
            .validate()
            .unwrap();
        assert_eq!(reg.phone.as_deref(), Some("61988887777"));
        assert_eq!(reg.age, Some(9));
        assert_eq!(reg.email, None);
    }

    #[test]
    fn unknown_decisions_are_rejected() {
        assert!(request(json!({ "name": "João Pedro", "decisionType": "TALVEZ" }))
            .validate()
            .is_err());
        assert!(request(json!({ "name": "João Pedro", "decisionType": "ACEITOU" }))
            .validate()
            .is_ok());
    }

    #[test]
    fn blank_update_fields_are_ignored() {
        let body: UpdatePersonRequest =
            serde_json::from_value(json!({ "gender": "", "church": "Ibmg Caldas", "age": "" })).unwrap();
        let update = PersonUpdate::from(body);
        assert_eq!(update.gender, None);
        assert_eq!(update.age, None);
        assert_eq!(update.church.as_deref(), Some("Ibmg Caldas"));
    }
}
