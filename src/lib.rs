pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod service;

pub use api::{HttpFulfillmentSource, HttpReportSink};
pub use config::AppConfig;
pub use error::{ConfigError, FetchError, SinkError};
pub use models::ReportWindow;
pub use service::{FillRateJob, ReportTarget, RunSummary};
