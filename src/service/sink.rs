use crate::api::HttpReportSink;
use crate::config::{ReportConfig, SinkKind};
use crate::db;
use crate::error::SinkError;
use crate::models::FillRateReport;
use sqlx::PgPool;
use std::fs::{File, OpenOptions};
use std::future::Future;
use std::path::Path;
use std::sync::Mutex;

/// 写入确认
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub detail: String,
}

impl Ack {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// 报表输出端，每个供应商调用一次 `submit`，失败不重试
pub trait ReportSink: Send + Sync {
    fn name(&self) -> &'static str;

    fn submit(
        &self,
        report: &FillRateReport,
    ) -> impl Future<Output = Result<Ack, SinkError>> + Send;
}

/// PostgreSQL upsert，主键 (vendor, week)
pub struct PgReportSink {
    pool: PgPool,
    table: String,
    timeout_secs: u64,
}

impl PgReportSink {
    pub async fn connect(
        database_url: &str,
        table: &str,
        timeout_secs: u64,
    ) -> Result<Self, SinkError> {
        let pool = db::create_pool(database_url).await?;
        db::ensure_table(&pool, table).await?;
        tracing::info!(table, timeout_secs, "report table ready");
        Ok(Self {
            pool,
            table: table.to_string(),
            timeout_secs,
        })
    }
}

impl ReportSink for PgReportSink {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn submit(&self, report: &FillRateReport) -> Result<Ack, SinkError> {
        let rows =
            db::upsert_fill_rate(&self.pool, &self.table, report, self.timeout_secs).await?;
        Ok(Ack::new(format!("{} row(s) upserted", rows)))
    }
}

/// CSV 导出，表头为 JSON 字段名
pub struct CsvReportSink {
    writer: Mutex<csv::Writer<File>>,
}

impl CsvReportSink {
    /// 文件已存在且非空时追加，不重复写表头
    pub fn open(path: &Path) -> Result<Self, SinkError> {
        let has_content = path.metadata().map(|m| m.len() > 0).unwrap_or(false);
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let writer = csv::WriterBuilder::new()
            .has_headers(!has_content)
            .from_writer(file);
        Ok(Self {
            writer: Mutex::new(writer),
        })
    }

    fn write_row(&self, report: &FillRateReport) -> Result<(), SinkError> {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        writer.serialize(report)?;
        writer.flush()?;
        Ok(())
    }
}

impl ReportSink for CsvReportSink {
    fn name(&self) -> &'static str {
        "csv"
    }

    async fn submit(&self, report: &FillRateReport) -> Result<Ack, SinkError> {
        self.write_row(report)?;
        Ok(Ack::new("row written"))
    }
}

/// 仅写日志，用于试运行
#[derive(Debug, Default)]
pub struct LogReportSink;

impl ReportSink for LogReportSink {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn submit(&self, report: &FillRateReport) -> Result<Ack, SinkError> {
        tracing::info!(
            vendor = %report.vendor,
            week = %report.week,
            ordered = report.ordered_qty,
            shipped = report.shipped_qty,
            fill_rate = report.fill_rate,
            "fill rate"
        );
        Ok(Ack::new("logged"))
    }
}

/// 按配置选择的输出端
pub enum ReportTarget {
    Http(HttpReportSink),
    Postgres(PgReportSink),
    Csv(CsvReportSink),
    Log(LogReportSink),
}

impl ReportTarget {
    pub async fn from_config(config: &ReportConfig) -> Result<Self, SinkError> {
        let target = match config.sink {
            SinkKind::Http => ReportTarget::Http(HttpReportSink::new(config)?),
            SinkKind::Postgres => {
                let url = config.database_url.as_deref().unwrap_or_default();
                ReportTarget::Postgres(
                    PgReportSink::connect(url, &config.table, config.timeout_secs).await?,
                )
            }
            SinkKind::Csv => {
                let path = config.csv_path.as_deref().unwrap_or(Path::new("fill_rate.csv"));
                ReportTarget::Csv(CsvReportSink::open(path)?)
            }
            SinkKind::Log => ReportTarget::Log(LogReportSink),
        };
        Ok(target)
    }
}

impl ReportSink for ReportTarget {
    fn name(&self) -> &'static str {
        match self {
            ReportTarget::Http(sink) => sink.name(),
            ReportTarget::Postgres(sink) => sink.name(),
            ReportTarget::Csv(sink) => sink.name(),
            ReportTarget::Log(sink) => sink.name(),
        }
    }

    async fn submit(&self, report: &FillRateReport) -> Result<Ack, SinkError> {
        match self {
            ReportTarget::Http(sink) => sink.submit(report).await,
            ReportTarget::Postgres(sink) => sink.submit(report).await,
            ReportTarget::Csv(sink) => sink.submit(report).await,
            ReportTarget::Log(sink) => sink.submit(report).await,
        }
    }
}
