// handlers/operations/mod.rs - Staff operations at the checkpoints
//
// Manual headcounts, QR scans and on-the-spot store sales.

use axum::response::Json;

use crate::database::models::Checkpoint;
use crate::error::ApiResult;
use crate::services::CheckpointService;

pub mod count;  // POST /operations/count
pub mod sales;  // POST /operations/sales
pub mod track;  // POST /operations/track

pub use count::count;
pub use sales::manual_sale;
pub use track::track;

/// GET /operations/checkpoints - every checkpoint, by name
pub async fn checkpoints() -> ApiResult<Json<Vec<Checkpoint>>> {
    let checkpoints = CheckpointService::new().await?.list().await?;
    Ok(Json(checkpoints))
}
