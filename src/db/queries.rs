use crate::error::SinkError;
use crate::models::FillRateReport;
use chrono::Utc;
use sqlx::PgPool;
use std::time::{Duration, Instant};

/// 建表 (已存在则跳过)，主键 (vendor, week) 供 upsert 使用
pub async fn ensure_table(pool: &PgPool, table: &str) -> Result<(), sqlx::Error> {
    let ddl = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            vendor       TEXT             NOT NULL,
            week         TEXT             NOT NULL,
            ordered_qty  BIGINT           NOT NULL,
            shipped_qty  BIGINT           NOT NULL,
            fill_rate    DOUBLE PRECISION NOT NULL,
            updated_at   TIMESTAMPTZ      NOT NULL,
            PRIMARY KEY (vendor, week)
        )
        "#
    );
    sqlx::query(&ddl).execute(pool).await?;
    Ok(())
}

/// 写入或覆盖某供应商某周的满足率，超过 `timeout_secs` 视为失败
pub async fn upsert_fill_rate(
    pool: &PgPool,
    table: &str,
    report: &FillRateReport,
    timeout_secs: u64,
) -> Result<u64, SinkError> {
    let sql = format!(
        r#"
        INSERT INTO {table} (vendor, week, ordered_qty, shipped_qty, fill_rate, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (vendor, week) DO UPDATE SET
            ordered_qty = EXCLUDED.ordered_qty,
            shipped_qty = EXCLUDED.shipped_qty,
            fill_rate   = EXCLUDED.fill_rate,
            updated_at  = EXCLUDED.updated_at
        "#
    );

    let start_time = Instant::now();
    let execute_result = tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        sqlx::query(&sql)
            .bind(&report.vendor)
            .bind(&report.week)
            .bind(i64::try_from(report.ordered_qty).unwrap_or(i64::MAX))
            .bind(i64::try_from(report.shipped_qty).unwrap_or(i64::MAX))
            .bind(report.fill_rate)
            .bind(Utc::now())
            .execute(pool),
    )
    .await;

    match execute_result {
        Ok(Ok(result)) => {
            tracing::debug!(
                vendor = %report.vendor,
                rows = result.rows_affected(),
                "upsert finished in {:?}",
                start_time.elapsed()
            );
            Ok(result.rows_affected())
        }
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err(SinkError::Timeout(timeout_secs)),
    }
}
