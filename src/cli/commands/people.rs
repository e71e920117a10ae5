use anyhow::Context;
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::config::config;
use crate::report::people_csv;
use crate::services::{PersonService, ServiceError};

pub async fn export(output: Option<PathBuf>, output_format: OutputFormat) -> anyhow::Result<()> {
    let people = PersonService::new().await?.list_for_export().await?;
    let csv = people_csv(&people, config().event.offset())?;

    match output {
        Some(path) => {
            tokio::fs::write(&path, &csv)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            output_success(
                &output_format,
                &format!("Exported {} people to {}", people.len(), path.display()),
                Some(json!({ "count": people.len(), "path": path })),
            )
        }
        None => {
            std::io::stdout().write_all(&csv)?;
            Ok(())
        }
    }
}

pub async fn promote_staff(email: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    match PersonService::new().await?.promote_staff(email).await {
        Ok(person) => output_success(
            &output_format,
            &format!("{} <{}> is now staff", person.name, email),
            Some(json!({ "id": person.id })),
        ),
        Err(ServiceError::NotFound(msg)) => {
            output_error(&output_format, &msg, Some("NOT_FOUND"))?;
            anyhow::bail!("no person with email {}", email)
        }
        Err(e) => Err(e.into()),
    }
}
