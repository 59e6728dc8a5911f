use chrono::Utc;
use tracing::{error, info, warn};
use vendor_fillrate::{
    logging, AppConfig, FillRateJob, HttpFulfillmentSource, ReportTarget, ReportWindow,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    // 配置不完整时直接退出，避免写到错误的目标
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("configuration error: {}", e);
            return Err(e.into());
        }
    };
    info!(
        endpoint = %config.upstream.endpoint,
        page_size = config.upstream.page_size,
        pagination = ?config.upstream.pagination,
        sink = ?config.report.sink,
        allow_list = config.vendors.allow_list.len(),
        timezone = %config.window.timezone,
        "Starting fill rate job"
    );

    let source = HttpFulfillmentSource::new(&config.upstream)?;
    let sink = ReportTarget::from_config(&config.report).await?;
    let window = ReportWindow::from_config(&config.window, Utc::now());

    let job = FillRateJob::new(&config, source, sink);
    let summary = job.run(&window).await;

    if summary.fetch_aborted {
        warn!("upstream fetch stopped early, totals for {} may be incomplete", summary.week);
    }
    if summary.failed > 0 {
        warn!(
            "{} of {} vendor rows were not accepted by the report sink",
            summary.failed, summary.vendors
        );
    }

    Ok(())
}
