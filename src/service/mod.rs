pub mod aggregator;
pub mod export;
pub mod fetcher;
pub mod job;
pub mod resolver;
pub mod sink;

pub use aggregator::{aggregate, fill_rate, record_quantity};
pub use export::{detail_rows, export_detail_csv, DetailRow};
pub use fetcher::{FetchOptions, FetchOutcome, FulfillmentFetcher, FulfillmentSource, PageRequest};
pub use job::{FillRateJob, RunSummary};
pub use resolver::{VendorGroups, VendorResolver};
pub use sink::{Ack, CsvReportSink, LogReportSink, PgReportSink, ReportSink, ReportTarget};
