//! Postgres-backed catalog store.
//!
//! One table holds every domain; (domain, stable_id) is the upsert key. The
//! conflict clause only rewrites a row when something actually differs, so
//! the upserted/modified counts fall straight out of `RETURNING`.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::info;

use crate::catalog::{CatalogRecord, Domain, ResourceRefs};
use crate::error::StoreError;

use super::{BulkOutcome, CatalogStore, RecordPatch, StaleScope};

const UPSERT_SQL: &str = r#"
INSERT INTO catalog_records
    (domain, stable_id, display_name, description, icon, icon_small, icon_large,
     tier, tags, modes, version, is_active, extra)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
ON CONFLICT (domain, stable_id) DO UPDATE SET
    display_name = EXCLUDED.display_name,
    description = EXCLUDED.description,
    icon = EXCLUDED.icon,
    icon_small = EXCLUDED.icon_small,
    icon_large = EXCLUDED.icon_large,
    tier = EXCLUDED.tier,
    tags = EXCLUDED.tags,
    modes = (
        SELECT coalesce(array_agg(m ORDER BY first_ord), '{}')
        FROM (
            SELECT m, min(ord) AS first_ord
            FROM unnest(catalog_records.modes || EXCLUDED.modes) WITH ORDINALITY AS u(m, ord)
            GROUP BY m
        ) dedup
    ),
    version = EXCLUDED.version,
    is_active = EXCLUDED.is_active,
    extra = EXCLUDED.extra,
    updated_at = now()
WHERE catalog_records.display_name IS DISTINCT FROM EXCLUDED.display_name
   OR catalog_records.description IS DISTINCT FROM EXCLUDED.description
   OR catalog_records.icon IS DISTINCT FROM EXCLUDED.icon
   OR catalog_records.icon_small IS DISTINCT FROM EXCLUDED.icon_small
   OR catalog_records.icon_large IS DISTINCT FROM EXCLUDED.icon_large
   OR catalog_records.tier IS DISTINCT FROM EXCLUDED.tier
   OR catalog_records.tags IS DISTINCT FROM EXCLUDED.tags
   OR catalog_records.version IS DISTINCT FROM EXCLUDED.version
   OR catalog_records.is_active IS DISTINCT FROM EXCLUDED.is_active
   OR catalog_records.extra IS DISTINCT FROM EXCLUDED.extra
   OR NOT (catalog_records.modes @> EXCLUDED.modes)
RETURNING (xmax = 0) AS inserted
"#;

#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await?;
        info!("connected to catalog store");
        Ok(Self { pool })
    }

    /// Create the table and indexes when missing. Gated by the caller so
    /// read-only deployments never push DDL.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS catalog_records (
                id BIGSERIAL PRIMARY KEY,
                domain TEXT NOT NULL,
                stable_id TEXT NOT NULL,
                display_name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                icon TEXT NOT NULL DEFAULT '',
                icon_small TEXT NOT NULL DEFAULT '',
                icon_large TEXT NOT NULL DEFAULT '',
                tier TEXT,
                tags TEXT[] NOT NULL DEFAULT '{}',
                modes TEXT[] NOT NULL DEFAULT '{}',
                version TEXT,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                extra JSONB NOT NULL DEFAULT '{}'::jsonb,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                UNIQUE (domain, stable_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS catalog_records_domain_active_idx \
             ON catalog_records (domain, is_active)",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn record_from_row(row: &sqlx::postgres::PgRow) -> Result<CatalogRecord, sqlx::Error> {
        let extra: Value = row.try_get("extra")?;
        Ok(CatalogRecord {
            stable_id: row.try_get("stable_id")?,
            display_name: row.try_get("display_name")?,
            description: row.try_get("description")?,
            refs: ResourceRefs {
                icon: row.try_get("icon")?,
                icon_small: row.try_get("icon_small")?,
                icon_large: row.try_get("icon_large")?,
            },
            tier: row.try_get("tier")?,
            tags: row.try_get("tags")?,
            modes: row.try_get("modes")?,
            version: row.try_get("version")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get::<Option<DateTime<Utc>>, _>("created_at")?,
            updated_at: row.try_get::<Option<DateTime<Utc>>, _>("updated_at")?,
            extra: extra.as_object().cloned().unwrap_or_default(),
        })
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn list(
        &self,
        domain: Domain,
        only_active: bool,
    ) -> Result<Vec<CatalogRecord>, StoreError> {
        let sql = if only_active {
            "SELECT stable_id, display_name, description, icon, icon_small, icon_large, \
             tier, tags, modes, version, is_active, extra, created_at, updated_at \
             FROM catalog_records WHERE domain = $1 AND is_active ORDER BY stable_id"
        } else {
            "SELECT stable_id, display_name, description, icon, icon_small, icon_large, \
             tier, tags, modes, version, is_active, extra, created_at, updated_at \
             FROM catalog_records WHERE domain = $1 ORDER BY stable_id"
        };
        let rows = sqlx::query(sql)
            .persistent(false)
            .bind(domain.as_str())
            .fetch_all(&self.pool)
            .await?;
        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(Self::record_from_row(row)?);
        }
        Ok(records)
    }

    async fn bulk_upsert(
        &self,
        domain: Domain,
        records: &[CatalogRecord],
    ) -> Result<BulkOutcome, StoreError> {
        let mut outcome = BulkOutcome::default();
        for record in records {
            if record.stable_id.is_empty() {
                continue;
            }
            let row = sqlx::query(UPSERT_SQL)
                .persistent(false)
                .bind(domain.as_str())
                .bind(&record.stable_id)
                .bind(&record.display_name)
                .bind(&record.description)
                .bind(&record.refs.icon)
                .bind(&record.refs.icon_small)
                .bind(&record.refs.icon_large)
                .bind(&record.tier)
                .bind(&record.tags)
                .bind(&record.modes)
                .bind(&record.version)
                .bind(record.is_active)
                .bind(Value::Object(record.extra.clone()))
                .fetch_optional(&self.pool)
                .await?;
            match row {
                Some(row) => {
                    let inserted: bool = row.try_get("inserted").map_err(StoreError::from)?;
                    if inserted {
                        outcome.upserted += 1;
                    } else {
                        outcome.modified += 1;
                    }
                }
                // No row back means the conflict clause found nothing to change.
                None => {}
            }
        }
        Ok(outcome)
    }

    async fn deactivate_stale(
        &self,
        domain: Domain,
        scope: &StaleScope,
        keep: &HashSet<String>,
    ) -> Result<u64, StoreError> {
        let keep: Vec<String> = keep.iter().cloned().collect();
        let result = sqlx::query(
            "UPDATE catalog_records SET is_active = FALSE, updated_at = now() \
             WHERE domain = $1 AND is_active \
               AND NOT (stable_id = ANY($2)) \
               AND ($3::text IS NULL OR modes @> ARRAY[$3])",
        )
        .persistent(false)
        .bind(domain.as_str())
        .bind(&keep)
        .bind(scope.mode.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn clear_membership(&self, domain: Domain, mode: &str) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE catalog_records SET modes = array_remove(modes, $2), updated_at = now() \
             WHERE domain = $1 AND modes @> ARRAY[$2]",
        )
        .persistent(false)
        .bind(domain.as_str())
        .bind(mode)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn apply_patch(
        &self,
        domain: Domain,
        stable_id: &str,
        patch: &RecordPatch,
    ) -> Result<bool, StoreError> {
        if patch.is_empty() {
            return Ok(false);
        }
        let result = sqlx::query(
            "UPDATE catalog_records SET \
                icon = coalesce($3, icon), \
                icon_small = coalesce($4, icon_small), \
                icon_large = coalesce($5, icon_large), \
                is_active = coalesce($6, is_active), \
                updated_at = now() \
             WHERE domain = $1 AND stable_id = $2 \
               AND (icon IS DISTINCT FROM coalesce($3, icon) \
                 OR icon_small IS DISTINCT FROM coalesce($4, icon_small) \
                 OR icon_large IS DISTINCT FROM coalesce($5, icon_large) \
                 OR is_active IS DISTINCT FROM coalesce($6, is_active))",
        )
        .persistent(false)
        .bind(domain.as_str())
        .bind(stable_id)
        .bind(patch.icon.as_deref())
        .bind(patch.icon_small.as_deref())
        .bind(patch.icon_large.as_deref())
        .bind(patch.is_active)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
