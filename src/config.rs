use crate::error::ConfigError;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// 应用配置
///
/// 来源优先级: 环境变量 (`FILLRATE__SECTION__KEY`) > 工作目录下的 `fillrate.toml` > 默认值
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub upstream: UpstreamConfig,
    pub report: ReportConfig,
    pub vendors: VendorConfig,
    pub window: WindowConfig,
}

/// 上游履约接口
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub endpoint: String,
    pub token: String,
    /// `Authorization` 时以 Bearer 方式发送，其他头名直接携带原始 token
    pub token_header: String,
    pub page_size: u32,
    pub max_pages: u32,
    pub pagination: PaginationStyle,
    pub first_page: u32,
    pub statuses: Vec<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationStyle {
    /// `limit` / `offset`
    #[default]
    Offset,
    /// `page` / `pageSize`
    Page,
}

/// 报表输出
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub sink: SinkKind,
    pub endpoint: Option<String>,
    pub token: Option<String>,
    pub database_url: Option<String>,
    pub table: String,
    pub csv_path: Option<PathBuf>,
    /// 写入超时 (HTTP 请求与数据库 upsert)
    pub timeout_secs: u64,
    /// 明细导出: 每个订单行一行，与汇总输出端无关
    pub detail_csv_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    #[default]
    Http,
    Postgres,
    Csv,
    Log,
}

/// 供应商白名单与显示名映射
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VendorConfig {
    pub allow_list: Vec<String>,
    pub names: HashMap<String, String>,
}

/// 统计时间窗口
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub mode: WindowMode,
    pub days: i64,
    /// IANA 时区名，决定周一起点与周标签
    pub timezone: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    /// 截止当前时刻的最近 N 天
    #[default]
    Trailing,
    /// 本周一 00:01 (本地时间) 至今
    WeekToDate,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            token: String::new(),
            token_header: "Authorization".to_string(),
            page_size: 100,
            max_pages: 500,
            pagination: PaginationStyle::Offset,
            first_page: 1,
            statuses: Vec::new(),
            timeout_secs: 30,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            sink: SinkKind::Http,
            endpoint: None,
            token: None,
            database_url: None,
            table: "vendor_fill_rate".to_string(),
            csv_path: None,
            timeout_secs: 30,
            detail_csv_path: None,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            mode: WindowMode::Trailing,
            days: 7,
            timezone: "America/Denver".to_string(),
        }
    }
}

impl UpstreamConfig {
    /// 状态过滤集合，未配置时返回 None (不过滤)
    pub fn status_filter(&self) -> Option<HashSet<String>> {
        let statuses: HashSet<String> = self
            .statuses
            .iter()
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        (!statuses.is_empty()).then_some(statuses)
    }
}

impl VendorConfig {
    /// 供应商白名单，空列表表示全部放行
    pub fn allow_set(&self) -> Option<HashSet<String>> {
        let allowed: HashSet<String> = self
            .allow_list
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        (!allowed.is_empty()).then_some(allowed)
    }
}

impl WindowConfig {
    /// 回溯天数上限
    pub const MAX_DAYS: i64 = 366;

    pub fn zone(&self) -> Option<Tz> {
        self.timezone.trim().parse::<Tz>().ok()
    }
}

impl AppConfig {
    /// 从 `fillrate.toml` 与环境变量加载配置并校验
    pub fn from_env() -> Result<Self, ConfigError> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name("fillrate").required(false))
            .add_source(Self::environment())
            .build()?;
        Self::from_settings(settings)
    }

    fn environment() -> ::config::Environment {
        ::config::Environment::with_prefix("FILLRATE")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("upstream.statuses")
            .with_list_parse_key("vendors.allow_list")
    }

    fn from_settings(settings: ::config::Config) -> Result<Self, ConfigError> {
        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 校验必填项；任何缺失都不允许带着部分配置运行
    pub fn validate(&self) -> Result<(), ConfigError> {
        let upstream = &self.upstream;
        require_url("upstream.endpoint", &upstream.endpoint)?;
        if upstream.token.trim().is_empty() {
            return Err(ConfigError::Missing("upstream.token"));
        }
        if upstream.token_header.trim().is_empty() {
            return Err(ConfigError::Missing("upstream.token_header"));
        }
        if let Err(e) = reqwest::header::HeaderName::from_bytes(upstream.token_header.as_bytes()) {
            return Err(invalid("upstream.token_header", e.to_string()));
        }
        if upstream.page_size == 0 {
            return Err(invalid("upstream.page_size", "must be greater than zero"));
        }
        if upstream.max_pages == 0 {
            return Err(invalid("upstream.max_pages", "must be greater than zero"));
        }

        match self.report.sink {
            SinkKind::Http => {
                let endpoint = self.report.endpoint.as_deref().unwrap_or_default();
                require_url("report.endpoint", endpoint)?;
                if self.report.token.as_deref().map_or(true, |t| t.trim().is_empty()) {
                    return Err(ConfigError::Missing("report.token"));
                }
            }
            SinkKind::Postgres => {
                if self.report.database_url.as_deref().map_or(true, |u| u.trim().is_empty()) {
                    return Err(ConfigError::Missing("report.database_url"));
                }
                if !is_sql_identifier(&self.report.table) {
                    return Err(invalid(
                        "report.table",
                        format!("`{}` is not a plain table name", self.report.table),
                    ));
                }
            }
            SinkKind::Csv => {
                if self.report.csv_path.is_none() {
                    return Err(ConfigError::Missing("report.csv_path"));
                }
            }
            SinkKind::Log => {}
        }
        if self.report.timeout_secs == 0 {
            return Err(invalid("report.timeout_secs", "must be greater than zero"));
        }

        if !(1..=WindowConfig::MAX_DAYS).contains(&self.window.days) {
            return Err(invalid(
                "window.days",
                format!("must be between 1 and {}", WindowConfig::MAX_DAYS),
            ));
        }
        if self.window.zone().is_none() {
            return Err(invalid(
                "window.timezone",
                format!("`{}` is not a known time zone", self.window.timezone),
            ));
        }
        Ok(())
    }
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.into(),
    }
}

fn require_url(key: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Missing(key));
    }
    reqwest::Url::parse(value)
        .map(|_| ())
        .map_err(|e| invalid(key, e.to_string()))
}

/// 允许 `schema.table` 形式，只含字母、数字、下划线
fn is_sql_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}
