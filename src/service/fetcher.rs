use crate::config::UpstreamConfig;
use crate::error::FetchError;
use crate::models::{FulfillmentRecord, RawFulfillment, ReportWindow};
use serde_json::Value;
use std::collections::HashSet;
use std::future::Future;

/// 单页请求参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub start_date: String,
    pub end_date: String,
    pub statuses: Vec<String>,
    /// 从 0 开始
    pub page_index: u32,
    pub page_size: u32,
}

/// 履约记录来源，每次调用返回一页原始 JSON 记录
pub trait FulfillmentSource: Send + Sync {
    fn fetch_page(
        &self,
        request: &PageRequest,
    ) -> impl Future<Output = Result<Vec<Value>, FetchError>> + Send;
}

/// 拉取参数
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub page_size: u32,
    pub max_pages: u32,
    /// 原样发给服务端
    pub statuses: Vec<String>,
    /// 客户端过滤用，小写；None 表示不过滤
    pub status_filter: Option<HashSet<String>>,
}

impl FetchOptions {
    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self {
            page_size: config.page_size,
            max_pages: config.max_pages,
            statuses: config.statuses.clone(),
            status_filter: config.status_filter(),
        }
    }
}

/// 一次拉取的结果与计数
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub records: Vec<FulfillmentRecord>,
    pub pages: u32,
    pub malformed: usize,
    pub out_of_window: usize,
    pub status_filtered: usize,
    /// 某一页请求失败，之后的页未拉取
    pub aborted: bool,
    /// 达到 `max_pages` 仍未遇到短页
    pub truncated: bool,
}

/// 分页拉取履约记录
///
/// 服务端的日期过滤不可信，这里按 `sentAt` 再做一次客户端过滤。
pub struct FulfillmentFetcher<S> {
    source: S,
    options: FetchOptions,
}

impl<S: FulfillmentSource> FulfillmentFetcher<S> {
    pub fn new(source: S, options: FetchOptions) -> Self {
        Self { source, options }
    }

    pub async fn fetch(&self, window: &ReportWindow) -> FetchOutcome {
        let mut outcome = FetchOutcome::default();
        let page_size = self.options.page_size;

        for page_index in 0..self.options.max_pages {
            let request = PageRequest {
                start_date: window.start_date(),
                end_date: window.end_date(),
                statuses: self.options.statuses.clone(),
                page_index,
                page_size,
            };

            let page = match self.source.fetch_page(&request).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(
                        page = page_index,
                        kept = outcome.records.len(),
                        "fetch failed, keeping records from earlier pages: {}",
                        e
                    );
                    outcome.aborted = true;
                    return outcome;
                }
            };

            outcome.pages += 1;
            let received = page.len();
            tracing::debug!(page = page_index, received, "page received");

            for value in page {
                self.accept(value, window, &mut outcome);
            }

            if received < page_size as usize {
                return outcome;
            }
        }

        tracing::warn!(
            max_pages = self.options.max_pages,
            "stopped paging without reaching a short page, results may be incomplete"
        );
        outcome.truncated = true;
        outcome
    }

    fn accept(&self, value: Value, window: &ReportWindow, outcome: &mut FetchOutcome) {
        let record: FulfillmentRecord = match serde_json::from_value::<RawFulfillment>(value) {
            Ok(raw) => raw.into(),
            Err(e) => {
                tracing::warn!("skipping undecodable fulfillment record: {}", e);
                outcome.malformed += 1;
                return;
            }
        };

        match record.sent_at {
            Some(ts) if window.contains(ts) => {}
            Some(ts) => {
                tracing::debug!(ticket = record.ticket_or_unknown(), sent_at = %ts, "outside window");
                outcome.out_of_window += 1;
                return;
            }
            None => {
                tracing::warn!(
                    ticket = record.ticket_or_unknown(),
                    "record has no parseable sentAt, excluded"
                );
                outcome.out_of_window += 1;
                return;
            }
        }

        if let Some(allowed) = &self.options.status_filter {
            let included = record
                .status
                .as_deref()
                .is_some_and(|s| allowed.contains(&s.to_ascii_lowercase()));
            if !included {
                tracing::debug!(
                    ticket = record.ticket_or_unknown(),
                    status = record.status.as_deref().unwrap_or(""),
                    "status not in filter"
                );
                outcome.status_filtered += 1;
                return;
            }
        }

        outcome.records.push(record);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;
    use std::sync::Mutex;

    /// 内存中的分页来源，`None` 表示该页返回错误
    pub(crate) struct FakeSource {
        pages: Vec<Option<Vec<Value>>>,
        pub requests: Mutex<Vec<PageRequest>>,
    }

    impl FakeSource {
        pub(crate) fn new(pages: Vec<Option<Vec<Value>>>) -> Self {
            Self {
                pages,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl FulfillmentSource for FakeSource {
        async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<Value>, FetchError> {
            {
                self.requests.lock().unwrap().push(request.clone());
            }
            match self.pages.get(request.page_index as usize) {
                Some(Some(page)) => Ok(page.clone()),
                Some(None) => Err(FetchError::Status {
                    status: 502,
                    body: "bad gateway".into(),
                }),
                None => Ok(Vec::new()),
            }
        }
    }

    pub(crate) fn window() -> ReportWindow {
        ReportWindow::new(
            Utc.with_ymd_and_hms(2026, 10, 5, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 10, 12, 0, 0, 0).unwrap(),
        )
    }

    fn in_window(n: usize) -> Value {
        json!({
            "fulfillmentRequestNumber": format!("FR-{n}"),
            "sourceId": 1,
            "status": "Completed",
            "sentAt": "2026-10-08T12:00:00Z",
            "totalQuantity": 1,
            "shippedQuantity": 1
        })
    }

    fn page(from: usize, count: usize) -> Vec<Value> {
        (from..from + count).map(in_window).collect()
    }

    fn options_with(page_size: u32, max_pages: u32, statuses: &[&str]) -> FetchOptions {
        FetchOptions::from_config(&UpstreamConfig {
            page_size,
            max_pages,
            statuses: statuses.iter().map(|s| s.to_string()).collect(),
            ..UpstreamConfig::default()
        })
    }

    fn options(page_size: u32) -> FetchOptions {
        options_with(page_size, 50, &[])
    }

    #[tokio::test]
    async fn test_stops_after_short_page() {
        let source = FakeSource::new(vec![Some(page(0, 3)), Some(page(3, 3)), Some(page(6, 2))]);
        let fetcher = FulfillmentFetcher::new(source, options(3));

        let outcome = fetcher.fetch(&window()).await;

        assert_eq!(outcome.records.len(), 8);
        assert_eq!(outcome.pages, 3);
        assert_eq!(fetcher.source.request_count(), 3);
        let tickets: Vec<&str> = outcome.records.iter().map(|r| r.ticket_or_unknown()).collect();
        assert_eq!(tickets.first(), Some(&"FR-0"));
        assert_eq!(tickets.last(), Some(&"FR-7"));
        assert!(!outcome.aborted);
    }

    #[tokio::test]
    async fn test_full_last_page_needs_one_empty_page() {
        let source = FakeSource::new(vec![Some(page(0, 2)), Some(page(2, 2))]);
        let fetcher = FulfillmentFetcher::new(source, options(2));

        let outcome = fetcher.fetch(&window()).await;

        assert_eq!(outcome.records.len(), 4);
        assert_eq!(fetcher.source.request_count(), 3);
    }

    #[tokio::test]
    async fn test_page_requests_carry_window_and_index() {
        let source = FakeSource::new(vec![Some(page(0, 1))]);
        let fetcher = FulfillmentFetcher::new(source, options_with(5, 50, &["Completed"]));

        fetcher.fetch(&window()).await;

        let requests = fetcher.source.requests.lock().unwrap();
        assert_eq!(
            requests[0],
            PageRequest {
                start_date: "2026-10-05".into(),
                end_date: "2026-10-12".into(),
                statuses: vec!["Completed".into()],
                page_index: 0,
                page_size: 5,
            }
        );
    }

    #[tokio::test]
    async fn test_failed_page_keeps_earlier_pages() {
        let source = FakeSource::new(vec![Some(page(0, 2)), None, Some(page(4, 2))]);
        let fetcher = FulfillmentFetcher::new(source, options(2));

        let outcome = fetcher.fetch(&window()).await;

        assert_eq!(outcome.records.len(), 2);
        assert!(outcome.aborted);
        assert_eq!(fetcher.source.request_count(), 2);
    }

    #[tokio::test]
    async fn test_client_side_time_filter_is_authoritative() {
        let start = window().start;
        let just_before = (start - Duration::milliseconds(1)).to_rfc3339();
        let source = FakeSource::new(vec![Some(vec![
            json!({"sourceId": 1, "sentAt": just_before, "totalQuantity": 5}),
            json!({"sourceId": 1, "sentAt": start.to_rfc3339(), "totalQuantity": 5}),
            json!({"sourceId": 1, "sentAt": "2026-10-12T00:00:00.001Z", "totalQuantity": 5}),
            json!({"sourceId": 1, "totalQuantity": 5}),
        ])]);
        let fetcher = FulfillmentFetcher::new(source, options(10));

        let outcome = fetcher.fetch(&window()).await;

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].sent_at, Some(start));
        assert_eq!(outcome.out_of_window, 3);
    }

    #[tokio::test]
    async fn test_status_filter_is_case_insensitive() {
        let mut shipped = in_window(1);
        shipped["status"] = json!("partially shipped");
        let mut acknowledged = in_window(2);
        acknowledged["status"] = json!("Acknowledged");
        let mut no_status = in_window(3);
        no_status.as_object_mut().unwrap().remove("status");

        let source = FakeSource::new(vec![Some(vec![
            in_window(0),
            shipped,
            acknowledged,
            no_status,
        ])]);
        let opts = options_with(10, 50, &[" Completed", "Partially Shipped", ""]);
        assert_eq!(opts.statuses.len(), 3);
        let fetcher = FulfillmentFetcher::new(source, opts);

        let outcome = fetcher.fetch(&window()).await;

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.status_filtered, 2);
    }

    #[tokio::test]
    async fn test_undecodable_record_is_skipped() {
        let source = FakeSource::new(vec![Some(vec![
            json!("not an object"),
            json!({"sourceId": 1, "status": 7, "sentAt": "2026-10-08T12:00:00Z"}),
            in_window(0),
        ])]);
        let fetcher = FulfillmentFetcher::new(source, options(10));

        let outcome = fetcher.fetch(&window()).await;

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.malformed, 2);
    }

    #[tokio::test]
    async fn test_max_pages_guard() {
        let source = FakeSource::new(vec![Some(page(0, 1)); 10]);
        let fetcher = FulfillmentFetcher::new(source, options_with(1, 4, &[]));

        let outcome = fetcher.fetch(&window()).await;

        assert_eq!(outcome.pages, 4);
        assert!(outcome.truncated);
    }
}
