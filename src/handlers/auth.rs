// handlers/auth.rs - Staff login and participant registration
//
// Login is a plain email lookup restricted to STAFF accounts; there are no
// passwords or tokens in the back office.

use axum::{extract::Query, response::Json};
use serde::Deserialize;

use crate::database::models::Person;
use crate::error::{ApiError, ApiResult};
use crate::extract::{blank_as_none, is_plausible_email, loose_age, ValidJson};
use crate::services::{NewPerson, PersonService};
use crate::types::{Gender, PersonType};

#[derive(Debug, Deserialize)]
pub struct EmailBody {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub phone: Option<String>,
    #[serde(default, rename = "type")]
    pub person_type: Option<PersonType>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub department: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub church: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub marketing_source: Option<String>,
    #[serde(default, deserialize_with = "loose_age")]
    pub age: Option<i32>,
    #[serde(default)]
    pub is_staff: Option<bool>,
}

impl RegisterRequest {
    fn validate(self) -> ApiResult<NewPerson> {
        let name = self.name.trim().to_string();
        if name.chars().count() < 3 {
            return Err(ApiError::invalid_field("name", "Name must have at least 3 characters"));
        }
        if let Some(email) = &self.email {
            if !is_plausible_email(email) {
                return Err(ApiError::invalid_field("email", "Invalid email"));
            }
        }
        Ok(NewPerson {
            name,
            email: self.email,
            phone: self.phone,
            person_type: self.person_type.unwrap_or_default(),
            department: self.department,
            church: self.church,
            gender: self.gender.as_deref().and_then(Gender::parse_loose),
            marketing_source: self.marketing_source,
            age: self.age,
            is_staff: self.is_staff.unwrap_or(false),
        })
    }
}

/**
 * POST /auth/login - Back-office login
 *
 * Expected Input:
 * ```json
 * { "email": "ana@recepcao.com" }
 * ```
 *
 * Returns the STAFF person, 404 when the email has no staff account.
 */
pub async fn login(ValidJson(body): ValidJson<EmailBody>) -> ApiResult<Json<Person>> {
    let email = body
        .email
        .ok_or_else(|| ApiError::invalid_field("email", "Email is required"))?;

    let person = PersonService::new()
        .await?
        .find_staff_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::not_found("Access denied."))?;

    tracing::info!("Staff login: {}", person.name);
    Ok(Json(person))
}

/// GET /person/by-email?email=
pub async fn person_by_email(Query(query): Query<EmailQuery>) -> ApiResult<Json<Person>> {
    let email = query
        .email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::invalid_field("email", "Email is required"))?;

    PersonService::new()
        .await?
        .find_by_email(&email)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Person not found"))
}

/**
 * POST /register - Full participant (or staff) registration
 *
 * Expected Input:
 * ```json
 * {
 *   "name": "string",            // Required: at least 3 characters
 *   "email": "string",           // Optional: valid email or empty
 *   "type": "VISITOR",           // Optional: MEMBER, VISITOR, LEADER, PASTOR, STAFF
 *   "age": "32",                 // Optional: number or string
 *   "isStaff": false             // Optional: grants back-office access
 * }
 * ```
 */
pub async fn register(ValidJson(body): ValidJson<RegisterRequest>) -> ApiResult<Json<Person>> {
    let new_person = body.validate()?;
    let person = PersonService::new().await?.register(new_person).await?;
    Ok(Json(person))
}

/// POST /auth/make-admin - promote an existing person to STAFF
pub async fn make_admin(ValidJson(body): ValidJson<EmailBody>) -> ApiResult<Json<Person>> {
    let email = body
        .email
        .ok_or_else(|| ApiError::invalid_field("email", "Email is required"))?;
    let person = PersonService::new().await?.promote_staff(&email).await?;
    tracing::info!("Promoted {} to staff", email);
    Ok(Json(person))
}
