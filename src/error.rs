use thiserror::Error;

/// 配置错误 - 启动阶段即终止运行
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// 拉取单页履约记录时的错误 (非致命，本页视为空)
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response body is a JSON {0}, expected an array")]
    NotArray(&'static str),
}

/// 报表写入错误 (记录日志后继续下一个供应商)
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("report endpoint rejected row with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database write timed out after {0}s")]
    Timeout(u64),

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
