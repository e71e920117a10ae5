use chrono::{DateTime, FixedOffset, Utc};
use sqlx::PgPool;

use super::meeting_service::MeetingService;
use super::ServiceResult;
use crate::dashboard::{self, DashboardInputs, DashboardReport, ManualRecord, SaleRecord, ScanRecord, SoldItem};
use crate::database::DatabaseManager;

pub struct DashboardService {
    pool: PgPool,
}

impl DashboardService {
    pub async fn new() -> ServiceResult<Self> {
        Ok(Self::with_pool(DatabaseManager::pool().await?))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Aggregate everything recorded in `[start, end]`
    pub async fn report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        offset: FixedOffset,
    ) -> ServiceResult<DashboardReport> {
        let inputs = self.load(start, end).await?;
        tracing::debug!(
            "Dashboard over {} manual entries, {} scans, {} sales",
            inputs.manual.len(),
            inputs.scans.len(),
            inputs.sales.len()
        );
        Ok(dashboard::aggregate(inputs, offset))
    }

    async fn load(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> ServiceResult<DashboardInputs> {
        let meetings = MeetingService::with_pool(self.pool.clone());

        let manual = sqlx::query_as::<_, ManualRecord>(
            "SELECT m.recorded_at, c.name AS checkpoint_name, m.type, m.church, m.age_group, m.gender, \
               m.quantity, m.marketing_source, m.is_salvation, m.is_healing, m.is_deliverance \
             FROM manual_entries m LEFT JOIN checkpoints c ON c.id = m.checkpoint_id \
             WHERE m.recorded_at BETWEEN $1 AND $2",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool);

        let scans = sqlx::query_as::<_, ScanRecord>(
            "SELECT mv.recorded_at, c.name AS checkpoint_name, p.type AS person_type, p.gender, p.age, \
               p.church, p.marketing_source \
             FROM movements mv \
             JOIN people p ON p.id = mv.person_id \
             LEFT JOIN checkpoints c ON c.id = mv.checkpoint_id \
             WHERE mv.recorded_at BETWEEN $1 AND $2",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool);

        let sales = sqlx::query_as::<_, SaleRecord>(
            "SELECT id, buyer_type FROM sales \
             WHERE status IN ('PAID', 'DELIVERED') AND created_at BETWEEN $1 AND $2",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool);

        let sold_items = sqlx::query_as::<_, SoldItem>(
            "SELECT si.sale_id, si.quantity, si.price, p.category \
             FROM sale_items si \
             JOIN sales s ON s.id = si.sale_id \
             LEFT JOIN products p ON p.id = si.product_id \
             WHERE s.status IN ('PAID', 'DELIVERED') AND s.created_at BETWEEN $1 AND $2",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool);

        let consolidation = sqlx::query_as::<_, (i64,)>(
            "SELECT COUNT(*) FROM people WHERE marketing_source LIKE 'Decisão%'",
        )
        .fetch_one(&self.pool);

        let (manual, scans, sales, sold_items, (consolidation_count,), (scheduled, held)) = futures::try_join!(
            async { manual.await.map_err(super::ServiceError::from) },
            async { scans.await.map_err(super::ServiceError::from) },
            async { sales.await.map_err(super::ServiceError::from) },
            async { sold_items.await.map_err(super::ServiceError::from) },
            async { consolidation.await.map_err(super::ServiceError::from) },
            meetings.counts_by_type(),
        )?;

        Ok(DashboardInputs {
            manual,
            scans,
            sales,
            sold_items,
            meetings_scheduled: scheduled,
            meetings_held: held,
            consolidation_count,
        })
    }
}
