// handlers/operations/track.rs - POST /operations/track handler

use axum::response::Json;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::clock::day_bounds;
use crate::config::config;
use crate::error::ApiResult;
use crate::extract::ValidJson;
use crate::services::{CheckpointService, ScanDecision, ScanOutcome};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRequest {
    pub person_id: Uuid,
    pub checkpoint_id: Uuid,
}

fn scan_response(outcome: ScanOutcome) -> Value {
    match outcome.decision {
        ScanDecision::Ignored => json!({
            "success": true,
            "status": outcome.decision,
            "message": "Scan already registered moments ago"
        }),
        ScanDecision::Reentry => json!({
            "success": true,
            "status": outcome.decision,
            "message": "Person already entered today",
            "person": outcome.person
        }),
        ScanDecision::Success => json!({
            "success": true,
            "status": outcome.decision,
            "person": outcome.person
        }),
    }
}

/**
 * POST /operations/track - QR code scan at a checkpoint
 *
 * Expected Input:
 * ```json
 * { "personId": "uuid", "checkpointId": "uuid" }
 * ```
 *
 * Status is IGNORED for a repeat inside the scan debounce, REENTRY at an
 * entrance the person already passed today, SUCCESS when a movement was stored.
 */
pub async fn track(ValidJson(body): ValidJson<TrackRequest>) -> ApiResult<Json<Value>> {
    let settings = config();
    let now = Utc::now();
    let outcome = CheckpointService::new()
        .await?
        .track(
            body.person_id,
            body.checkpoint_id,
            now,
            Duration::seconds(settings.tracking.scan_debounce_secs),
            day_bounds(now, settings.event.offset()),
        )
        .await?;
    Ok(Json(scan_response(outcome)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignored_scans_carry_no_person() {
        let body = scan_response(ScanOutcome {
            decision: ScanDecision::Ignored,
            person: None,
        });
        assert_eq!(body["status"], "IGNORED");
        assert!(body.get("person").is_none());
        assert!(body["message"].is_string());
    }

    #[test]
    fn success_has_no_message() {
        let body = scan_response(ScanOutcome {
            decision: ScanDecision::Success,
            person: None,
        });
        assert_eq!(body["status"], "SUCCESS");
        assert!(body.get("message").is_none());
    }
}
