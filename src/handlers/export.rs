// handlers/export.rs - GET /export handler
// CSV report of every registered person, newest first

use axum::{
    http::header,
    response::{IntoResponse, Response},
};

use crate::config::config;
use crate::error::{ApiError, ApiResult};
use crate::report::{people_csv, REPORT_FILE_NAME};
use crate::services::PersonService;

pub async fn export_people() -> ApiResult<Response> {
    let people = PersonService::new().await?.list_for_export().await?;
    let body = people_csv(&people, config().event.offset()).map_err(|e| {
        tracing::error!("Failed to render people report: {}", e);
        ApiError::internal_server_error("Failed to generate report")
    })?;

    tracing::info!("Exported {} people", people.len());
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", REPORT_FILE_NAME),
            ),
        ],
        body,
    )
        .into_response())
}
