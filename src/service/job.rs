use crate::config::AppConfig;
use crate::models::{FillRateReport, FulfillmentRecord, ReportWindow, VendorIdentityMap};
use crate::service::aggregator::{aggregate, fill_rate};
use crate::service::export::export_detail_csv;
use crate::service::fetcher::{FetchOptions, FulfillmentFetcher, FulfillmentSource};
use crate::service::resolver::VendorResolver;
use crate::service::sink::ReportSink;
use std::path::PathBuf;

/// 单次运行统计
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunSummary {
    pub week: String,
    pub pages: u32,
    pub fetched: usize,
    pub malformed: usize,
    pub out_of_window: usize,
    pub status_filtered: usize,
    pub unresolvable: usize,
    pub excluded: usize,
    pub vendors: usize,
    pub submitted: usize,
    pub failed: usize,
    /// 明细导出行数，未配置导出时为 None
    pub detail_rows: Option<usize>,
    pub fetch_aborted: bool,
    pub reports: Vec<FillRateReport>,
}

/// 周满足率任务: 拉取 -> 分组 -> 汇总 -> 逐个供应商输出
///
/// 全程顺序执行；拉取全部完成后才开始分组。
pub struct FillRateJob<S, R> {
    fetcher: FulfillmentFetcher<S>,
    resolver: VendorResolver,
    identities: VendorIdentityMap,
    sink: R,
    detail_csv: Option<PathBuf>,
}

impl<S: FulfillmentSource, R: ReportSink> FillRateJob<S, R> {
    pub fn new(config: &AppConfig, source: S, sink: R) -> Self {
        Self {
            fetcher: FulfillmentFetcher::new(source, FetchOptions::from_config(&config.upstream)),
            resolver: VendorResolver::new(config.vendors.allow_set()),
            identities: VendorIdentityMap::new(config.vendors.names.clone()),
            sink,
            detail_csv: config.report.detail_csv_path.clone(),
        }
    }

    pub async fn run(&self, window: &ReportWindow) -> RunSummary {
        let week = window.week_label();
        tracing::info!(
            week = %week,
            start = %window.start,
            end = %window.end,
            sink = self.sink.name(),
            "fill rate run started"
        );

        let fetched = self.fetcher.fetch(window).await;
        let mut summary = RunSummary {
            week: week.clone(),
            pages: fetched.pages,
            fetched: fetched.records.len(),
            malformed: fetched.malformed,
            out_of_window: fetched.out_of_window,
            status_filtered: fetched.status_filtered,
            fetch_aborted: fetched.aborted,
            ..RunSummary::default()
        };

        if let Some(path) = &self.detail_csv {
            match export_detail_csv(&fetched.records, path) {
                Ok(rows) => {
                    tracing::info!(path = %path.display(), rows, "order detail exported");
                    summary.detail_rows = Some(rows);
                }
                Err(e) => {
                    tracing::error!(path = %path.display(), "order detail export failed: {}", e);
                }
            }
        }

        if fetched.records.is_empty() {
            tracing::warn!(week = %week, aborted = fetched.aborted, "no fulfillment records in window");
        } else {
            self.report_vendors(fetched.records, &week, &mut summary).await;
        }

        tracing::info!(
            week = %summary.week,
            pages = summary.pages,
            fetched = summary.fetched,
            malformed = summary.malformed,
            out_of_window = summary.out_of_window,
            status_filtered = summary.status_filtered,
            unresolvable = summary.unresolvable,
            excluded = summary.excluded,
            vendors = summary.vendors,
            submitted = summary.submitted,
            failed = summary.failed,
            fetch_aborted = summary.fetch_aborted,
            "fill rate run finished"
        );
        summary
    }

    async fn report_vendors(
        &self,
        records: Vec<FulfillmentRecord>,
        week: &str,
        summary: &mut RunSummary,
    ) {
        let grouped = self.resolver.group(records);
        summary.unresolvable = grouped.unresolvable;
        summary.excluded = grouped.excluded;
        summary.vendors = grouped.groups.len();

        let labels = self.identities.unique_labels(grouped.groups.keys());
        for ((key, records), vendor) in grouped.groups.iter().zip(labels) {
            let totals = aggregate(key.clone(), records);
            let report = FillRateReport {
                vendor,
                ordered_qty: totals.ordered,
                shipped_qty: totals.shipped,
                fill_rate: fill_rate(totals.ordered, totals.shipped),
                week: week.to_string(),
            };

            match self.sink.submit(&report).await {
                Ok(ack) => {
                    tracing::info!(
                        vendor = %report.vendor,
                        records = totals.records,
                        ordered = report.ordered_qty,
                        shipped = report.shipped_qty,
                        fill_rate = report.fill_rate,
                        "submitted: {}",
                        ack.detail
                    );
                    summary.submitted += 1;
                }
                Err(e) => {
                    tracing::error!(vendor = %report.vendor, key = %key, "submission failed: {}", e);
                    summary.failed += 1;
                }
            }
            summary.reports.push(report);
        }
    }
}
