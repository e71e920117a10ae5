use serde_json::json;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::config::config;
use crate::database::{seed as fixtures, DatabaseManager};

pub async fn migrate(output_format: OutputFormat) -> anyhow::Result<()> {
    DatabaseManager::migrate().await?;
    output_success(&output_format, "Migrations applied", None)
}

pub async fn seed(output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::pool().await?;
    let summary = fixtures::seed(&pool, &config().event.default_church).await?;
    output_success(
        &output_format,
        &format!(
            "Seeded {} checkpoints, {} products and {} staff accounts",
            summary.checkpoints, summary.products, summary.staff
        ),
        Some(json!({
            "checkpoints": summary.checkpoints,
            "products": summary.products,
            "staff": summary.staff
        })),
    )
}

pub async fn reset_counts(confirmed: bool, output_format: OutputFormat) -> anyhow::Result<()> {
    if !confirmed {
        output_error(
            &output_format,
            "This deletes every headcount, sale and visitor. Re-run with --yes to confirm.",
            Some("CONFIRMATION_REQUIRED"),
        )?;
        anyhow::bail!("reset not confirmed");
    }

    let pool = DatabaseManager::pool().await?;
    let summary = fixtures::reset_counts(&pool).await?;
    output_success(
        &output_format,
        &format!(
            "Removed {} manual entries, {} sales and {} visitors; meetings and products kept",
            summary.manual_entries, summary.sales, summary.visitors
        ),
        Some(json!({
            "manual_entries": summary.manual_entries,
            "sales": summary.sales,
            "visitors": summary.visitors
        })),
    )
}
