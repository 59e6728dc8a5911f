use crate::config::{PaginationStyle, UpstreamConfig};
use crate::error::FetchError;
use crate::service::{FulfillmentSource, PageRequest};
use serde_json::Value;
use std::time::Duration;

/// 订单管理系统的履约接口
pub struct HttpFulfillmentSource {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    token_header: String,
    pagination: PaginationStyle,
    first_page: u32,
}

impl HttpFulfillmentSource {
    pub fn new(config: &UpstreamConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("vendor-fillrate/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            token: config.token.clone(),
            token_header: config.token_header.clone(),
            pagination: config.pagination,
            first_page: config.first_page,
        })
    }

    /// 查询参数: 日期范围、可选状态、分页
    fn query(&self, request: &PageRequest) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("startDate", request.start_date.clone()),
            ("endDate", request.end_date.clone()),
        ];
        if !request.statuses.is_empty() {
            query.push(("status", request.statuses.join(",")));
        }
        match self.pagination {
            PaginationStyle::Offset => {
                let offset = u64::from(request.page_index) * u64::from(request.page_size);
                query.push(("limit", request.page_size.to_string()));
                query.push(("offset", offset.to_string()));
            }
            PaginationStyle::Page => {
                let page = self.first_page.saturating_add(request.page_index);
                query.push(("page", page.to_string()));
                query.push(("pageSize", request.page_size.to_string()));
            }
        }
        query
    }

    fn build_request(&self, request: &PageRequest) -> reqwest::RequestBuilder {
        let builder = self.client.get(&self.endpoint).query(&self.query(request));
        if self.token_header.eq_ignore_ascii_case("authorization") {
            builder.bearer_auth(&self.token)
        } else {
            builder.header(self.token_header.as_str(), &self.token)
        }
    }
}

impl FulfillmentSource for HttpFulfillmentSource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<Value>, FetchError> {
        let response = self.build_request(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        match serde_json::from_str::<Value>(&body)? {
            Value::Array(records) => Ok(records),
            other => Err(FetchError::NotArray(json_kind(&other))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
