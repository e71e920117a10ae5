//! Throwaway Postgres schemas for tests that need real SQL.
//!
//! Set `TEST_DATABASE_URL` to a database the tests may write to. Every test
//! gets its own schema with the migrations applied; without the variable the
//! tests return early.

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use uuid::Uuid;

use ekklesia_api::database::DatabaseManager;

pub struct TestDb {
    pub pool: PgPool,
    admin: PgPool,
    schema: String,
}

impl TestDb {
    /// Drop the schema and everything in it
    pub async fn teardown(self) -> Result<()> {
        self.pool.close().await;
        self.admin
            .execute(format!("DROP SCHEMA IF EXISTS {} CASCADE", self.schema).as_str())
            .await?;
        self.admin.close().await;
        Ok(())
    }
}

pub async fn test_db() -> Result<Option<TestDb>> {
    let url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => {
            eprintln!("TEST_DATABASE_URL not set, skipping database test");
            return Ok(None);
        }
    };

    let admin = PgPoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .context("failed to connect to TEST_DATABASE_URL")?;
    let schema = format!("ekklesia_test_{}", Uuid::new_v4().simple());
    admin
        .execute(format!("CREATE SCHEMA {}", schema).as_str())
        .await?;

    let search_path = format!("SET search_path TO {}", schema);
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .after_connect(move |conn, _meta| {
            let sql = search_path.clone();
            Box::pin(async move {
                conn.execute(sql.as_str()).await?;
                Ok(())
            })
        })
        .connect(&url)
        .await?;

    DatabaseManager::apply_migrations(&pool).await?;
    Ok(Some(TestDb { pool, admin, schema }))
}
