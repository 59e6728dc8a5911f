pub mod report;
pub mod upstream;

pub use report::HttpReportSink;
pub use upstream::HttpFulfillmentSource;
