// handlers/meetings.rs - Volunteer meeting agenda

use axum::{extract::Path, response::Json};
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::{config, parse_instant};
use crate::database::models::Meeting;
use crate::error::{ApiError, ApiResult};
use crate::extract::{blank_as_none, parse_id, ValidJson};
use crate::services::{MeetingService, NewMeeting};
use crate::types::MeetingType;

/// RFC 3339, or a `datetime-local` form value read on the venue clock
fn parse_meeting_date(raw: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    parse_instant(raw).or_else(|| {
        ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw.trim(), fmt).ok())
            .and_then(|naive| offset.from_local_datetime(&naive).single())
            .map(|dt| dt.with_timezone(&Utc))
    })
}

/// GET /meetings - past scheduled meetings are marked as held first
pub async fn list_meetings() -> ApiResult<Json<Vec<Meeting>>> {
    let meetings = MeetingService::new().await?.list(Utc::now()).await?;
    Ok(Json(meetings))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMeetingRequest {
    pub title: String,
    pub date: String,
    #[serde(default, rename = "type")]
    pub meeting_type: Option<MeetingType>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub created_by: Option<String>,
}

impl CreateMeetingRequest {
    fn validate(self, offset: FixedOffset) -> ApiResult<NewMeeting> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(ApiError::invalid_field("title", "Title is required"));
        }
        let date = parse_meeting_date(&self.date, offset)
            .ok_or_else(|| ApiError::invalid_field("date", "Invalid date"))?;
        Ok(NewMeeting {
            title,
            date,
            meeting_type: self.meeting_type.unwrap_or_default(),
            notes: self.notes,
            created_by: self.created_by,
        })
    }
}

/**
 * POST /meetings - Schedule or log a meeting
 *
 * Expected Input:
 * ```json
 * {
 *   "title": "Alinhamento de voluntários",  // Required
 *   "date": "2026-02-10T19:30",             // Required: RFC 3339 or local venue time
 *   "type": "AGENDADA",                     // Optional: AGENDADA or REALIZADA
 *   "notes": "string",                      // Optional
 *   "createdBy": "string"                   // Optional
 * }
 * ```
 */
pub async fn create_meeting(ValidJson(body): ValidJson<CreateMeetingRequest>) -> ApiResult<Json<Value>> {
    let meeting = body.validate(config().event.offset())?;
    let meeting = MeetingService::new().await?.create(meeting).await?;
    Ok(Json(json!({ "success": true, "meeting": meeting })))
}

/// DELETE /meetings/:id
pub async fn delete_meeting(Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "Meeting")?;
    MeetingService::new().await?.delete(id).await?;
    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn venue() -> FixedOffset {
        FixedOffset::west_opt(3 * 3600).unwrap()
    }

    #[test]
    fn local_form_values_use_the_venue_clock() {
        let dt = parse_meeting_date("2026-02-10T19:30", venue()).unwrap();
        assert_eq!(dt.to_rfc3339(), "2026-02-10T22:30:00+00:00");
    }

    #[test]
    fn explicit_offsets_win() {
        let dt = parse_meeting_date("2026-02-10T19:30:00Z", venue()).unwrap();
        assert_eq!(dt.to_rfc3339(), "2026-02-10T19:30:00+00:00");
        assert!(parse_meeting_date("amanhã", venue()).is_none());
    }

    #[test]
    fn type_defaults_to_scheduled() {
        let body: CreateMeetingRequest =
            serde_json::from_value(json!({ "title": "Culto", "date": "2026-02-10" })).unwrap();
        let meeting = body.validate(venue()).unwrap();
        assert_eq!(meeting.meeting_type, MeetingType::Agendada);
    }
}
