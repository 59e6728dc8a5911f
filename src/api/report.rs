use crate::config::ReportConfig;
use crate::error::SinkError;
use crate::models::FillRateReport;
use crate::service::{Ack, ReportSink};
use std::time::Duration;

/// 报表接口：每个供应商 POST 一行
pub struct HttpReportSink {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl HttpReportSink {
    pub fn new(config: &ReportConfig) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("vendor-fillrate/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone().unwrap_or_default(),
            token: config.token.clone().unwrap_or_default(),
        })
    }
}

impl ReportSink for HttpReportSink {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn submit(&self, report: &FillRateReport) -> Result<Ack, SinkError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(report)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(Ack::new(format!("HTTP {}", status.as_u16())))
    }
}
