// handlers/operations/count.rs - POST /operations/count handler
// Manual headcount (+1 man, +1 woman) with double-tap protection

use axum::response::Json;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::clock::day_bounds;
use crate::config::config;
use crate::error::{ApiError, ApiResult};
use crate::extract::{blank_as_none, ValidJson};
use crate::services::{CheckpointService, CountOutcome, NewManualEntry};
use crate::types::{AgeGroup, Gender, PersonType};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountRequest {
    pub checkpoint_id: Uuid,
    #[serde(rename = "type")]
    pub person_type: PersonType,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub church: Option<String>,
    #[serde(default)]
    pub quantity: Option<i32>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub age_group: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub marketing_source: Option<String>,
    #[serde(default)]
    pub is_salvation: bool,
    #[serde(default)]
    pub is_healing: bool,
    #[serde(default)]
    pub is_deliverance: bool,
}

impl CountRequest {
    fn validate(self, default_church: &str) -> ApiResult<NewManualEntry> {
        if !matches!(self.person_type, PersonType::Member | PersonType::Visitor) {
            return Err(ApiError::invalid_field("type", "Expected MEMBER or VISITOR"));
        }
        let quantity = self.quantity.unwrap_or(1);
        if quantity < 1 {
            return Err(ApiError::invalid_field("quantity", "Quantity must be at least 1"));
        }
        let age_group = match self.age_group.as_deref() {
            Some(raw) => Some(
                AgeGroup::parse_loose(raw)
                    .ok_or_else(|| ApiError::invalid_field("ageGroup", "Expected CRIANCA, JOVEM or ADULTO"))?,
            ),
            None => None,
        };
        Ok(NewManualEntry {
            checkpoint_id: self.checkpoint_id,
            person_type: self.person_type,
            church: self.church.unwrap_or_else(|| default_church.to_string()),
            quantity,
            age_group,
            gender: self.gender.as_deref().and_then(Gender::parse_loose),
            marketing_source: self.marketing_source,
            is_salvation: self.is_salvation,
            is_healing: self.is_healing,
            is_deliverance: self.is_deliverance,
        })
    }
}

/**
 * POST /operations/count - Record a manual headcount
 *
 * Expected Input:
 * ```json
 * {
 *   "checkpointId": "uuid",     // Required
 *   "type": "VISITOR",          // Required: MEMBER or VISITOR
 *   "quantity": 1,              // Optional: defaults to 1
 *   "gender": "M",              // Optional: anything not starting with M counts as F
 *   "ageGroup": "JOVEM",        // Optional
 *   "isSalvation": false        // Optional, also isHealing / isDeliverance
 * }
 * ```
 *
 * A tap identical to the previous one within the debounce window is
 * acknowledged with `ignored: true` and not stored.
 */
pub async fn count(ValidJson(body): ValidJson<CountRequest>) -> ApiResult<Json<Value>> {
    let settings = config();
    let entry = body.validate(&settings.event.default_church)?;

    let now = Utc::now();
    let outcome = CheckpointService::new()
        .await?
        .record_count(
            entry,
            now,
            Duration::milliseconds(settings.tracking.count_debounce_ms),
            day_bounds(now, settings.event.offset()),
        )
        .await?;

    Ok(Json(match outcome {
        CountOutcome::Ignored => json!({ "success": true, "ignored": true }),
        CountOutcome::Recorded { entry, total_today } => json!({
            "success": true,
            "entry": entry,
            "totalToday": total_today
        }),
    }))
}
