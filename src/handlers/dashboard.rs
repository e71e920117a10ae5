// handlers/dashboard.rs - Event dashboard, meeting counter and consolidation cards

use axum::{extract::Query, response::Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::{config, parse_instant, EventConfig};
use crate::dashboard::DashboardReport;
use crate::error::{ApiError, ApiResult};
use crate::extract::{blank_as_none, digits_only, ValidJson};
use crate::services::{DashboardService, MeetingService, PersonService};

#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

impl WindowQuery {
    /// Configured event window, narrowed or widened by the query
    fn window(&self, event: &EventConfig) -> ApiResult<(DateTime<Utc>, DateTime<Utc>)> {
        let bound = |raw: &Option<String>, field: &str, default: DateTime<Utc>| match raw
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            Some(value) => parse_instant(value)
                .ok_or_else(|| ApiError::invalid_field(field, "Expected an RFC 3339 date")),
            None => Ok(default),
        };
        let start = bound(&self.start, "start", event.window_start)?;
        let end = bound(&self.end, "end", event.window_end)?;
        if start > end {
            return Err(ApiError::bad_request("start must not be after end"));
        }
        Ok((start, end))
    }
}

/// GET /dashboard?start=&end=
pub async fn dashboard(Query(query): Query<WindowQuery>) -> ApiResult<Json<DashboardReport>> {
    let event = &config().event;
    let (start, end) = query.window(event)?;
    let report = DashboardService::new()
        .await?
        .report(start, end, event.offset())
        .await?;
    Ok(Json(report))
}

/// GET /dashboard/meeting-count
pub async fn meeting_count() -> ApiResult<Json<Value>> {
    let count = MeetingService::new().await?.meeting_count().await?;
    Ok(Json(json!({ "count": count })))
}

/// POST /dashboard/meeting-count/increment
pub async fn increment_meeting_count() -> ApiResult<Json<Value>> {
    let count = MeetingService::new().await?.increment_meeting_count().await?;
    Ok(Json(json!({ "count": count })))
}

#[derive(Debug, Deserialize)]
pub struct ConsolidationRequest {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub decision: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub observer: Option<String>,
}

/**
 * POST /dashboard/consolidation/save - Consolidation card after an altar call
 *
 * Expected Input:
 * ```json
 * {
 *   "name": "string",        // Required
 *   "phone": "string",       // Optional
 *   "decision": "ACEITOU",   // Required
 *   "observer": "string"     // Optional: volunteer who filled the card
 * }
 * ```
 */
pub async fn save_consolidation(ValidJson(body): ValidJson<ConsolidationRequest>) -> ApiResult<Json<Value>> {
    let name = body
        .name
        .ok_or_else(|| ApiError::invalid_field("name", "Name is required"))?;
    let decision = body
        .decision
        .ok_or_else(|| ApiError::invalid_field("decision", "Decision is required"))?;
    let phone = body.phone.map(|p| digits_only(&p)).filter(|p| !p.is_empty());

    let person = PersonService::new()
        .await?
        .save_consolidation(&name, phone.as_deref(), &decision, body.observer.as_deref())
        .await?;
    tracing::info!("Consolidation card saved for {} ({})", person.name, decision);
    Ok(Json(json!({ "success": true, "person": person })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event() -> EventConfig {
        EventConfig {
            window_start: Utc.with_ymd_and_hms(2026, 2, 13, 0, 0, 0).unwrap(),
            window_end: Utc.with_ymd_and_hms(2026, 2, 16, 0, 0, 0).unwrap(),
            utc_offset_seconds: -10800,
            default_church: "Ibmg Sede".into(),
            churches: Vec::new(),
        }
    }

    #[test]
    fn window_defaults_to_the_event() {
        let (start, end) = WindowQuery::default().window(&event()).unwrap();
        assert_eq!(start, event().window_start);
        assert_eq!(end, event().window_end);
    }

    #[test]
    fn query_overrides_each_bound() {
        let query = WindowQuery {
            start: Some("2026-02-14T00:00:00-03:00".into()),
            end: None,
        };
        let (start, end) = query.window(&event()).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 2, 14, 3, 0, 0).unwrap());
        assert_eq!(end, event().window_end);
    }

    #[test]
    fn bad_windows_are_rejected() {
        let garbage = WindowQuery {
            start: Some("ontem".into()),
            end: None,
        };
        assert!(garbage.window(&event()).is_err());
        let reversed = WindowQuery {
            start: Some("2026-02-20".into()),
            end: Some("2026-02-14".into()),
        };
        assert!(reversed.window(&event()).is_err());
    }
}
