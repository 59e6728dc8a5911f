use crate::config::{WindowConfig, WindowMode};
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// 每个供应商每次运行输出一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillRateReport {
    pub vendor: String,
    pub ordered_qty: u64,
    pub shipped_qty: u64,
    pub fill_rate: f64,
    pub week: String,
}

/// 统计时间窗口，两端均包含
///
/// `zone` 决定周标签按哪个本地日历计算。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub zone: Tz,
}

impl ReportWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            zone: Tz::UTC,
        }
    }

    pub fn in_zone(self, zone: Tz) -> Self {
        Self { zone, ..self }
    }

    /// 截至 `end` 的最近 `days` 天，溢出时从最早可表示时刻开始
    pub fn trailing(end: DateTime<Utc>, days: i64) -> Self {
        let start = Duration::try_days(days)
            .and_then(|span| end.checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self::new(start, end)
    }

    /// 本周一 00:01 (`zone` 本地时间，含夏令时) 至 `now`
    pub fn week_to_date(now: DateTime<Utc>, zone: Tz) -> Self {
        let local = now.with_timezone(&zone);
        let monday =
            local.date_naive() - Duration::days(i64::from(local.weekday().num_days_from_monday()));

        // 周一 00:00 ~ 00:01 之间运行时回退到上一周
        let start = match monday_start(monday, zone) {
            Some(start) if start <= now => start,
            _ => monday_start(monday - Duration::days(7), zone).unwrap_or(now),
        };
        Self {
            start,
            end: now,
            zone,
        }
    }

    pub fn from_config(config: &WindowConfig, now: DateTime<Utc>) -> Self {
        let zone = config.zone().unwrap_or(Tz::UTC);
        match config.mode {
            WindowMode::WeekToDate => Self::week_to_date(now, zone),
            WindowMode::Trailing => Self::trailing(now, config.days).in_zone(zone),
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }

    /// 查询参数用的起始日期 `YYYY-MM-DD`
    pub fn start_date(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_date(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }

    /// 窗口起点在本地日历中所在的 ISO 周，如 `2026-W42`
    pub fn week_label(&self) -> String {
        let iso = self.start.with_timezone(&self.zone).iso_week();
        format!("{}-W{:02}", iso.year(), iso.week())
    }
}

fn monday_start(monday: NaiveDate, zone: Tz) -> Option<DateTime<Utc>> {
    let naive = monday.and_hms_opt(0, 1, 0)?;
    zone.from_local_datetime(&naive)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_contains_is_inclusive() {
        let window = ReportWindow::new(utc(2026, 10, 5, 0, 0), utc(2026, 10, 12, 0, 0));
        assert!(window.contains(window.start));
        assert!(window.contains(window.end));
        assert!(!window.contains(window.start - Duration::milliseconds(1)));
        assert!(!window.contains(window.end + Duration::milliseconds(1)));
    }

    #[test]
    fn test_trailing_window() {
        let window = ReportWindow::trailing(utc(2026, 10, 16, 12, 0), 7);
        assert_eq!(window.start, utc(2026, 10, 9, 12, 0));
        assert_eq!(window.start_date(), "2026-10-09");
        assert_eq!(window.end_date(), "2026-10-16");
    }

    #[test]
    fn test_trailing_window_does_not_overflow() {
        let now = utc(2026, 10, 16, 12, 0);
        let window = ReportWindow::trailing(now, 1_000_000_000);
        assert_eq!(window.start, DateTime::<Utc>::MIN_UTC);
        assert_eq!(window.end, now);
        let window = ReportWindow::trailing(now, i64::MAX);
        assert_eq!(window.start, DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn test_week_to_date_starts_monday_one_past_midnight_local() {
        // 2026-01-16 is a Friday, Denver on MST (-07:00)
        let window = ReportWindow::week_to_date(utc(2026, 1, 16, 18, 30), Tz::America__Denver);
        assert_eq!(window.start, utc(2026, 1, 12, 7, 1));
        assert_eq!(window.week_label(), "2026-W03");
    }

    #[test]
    fn test_week_to_date_follows_daylight_saving() {
        // 2026-10-16 is a Friday, Denver on MDT (-06:00)
        let window = ReportWindow::week_to_date(utc(2026, 10, 16, 18, 30), Tz::America__Denver);
        assert_eq!(window.start, utc(2026, 10, 12, 6, 1));
        assert_eq!(window.week_label(), "2026-W42");
    }

    #[test]
    fn test_week_label_uses_local_calendar_east_of_utc() {
        // Wednesday noon in Shanghai; Monday 00:01 local is Sunday 16:01 UTC
        let window = ReportWindow::week_to_date(utc(2026, 10, 14, 4, 0), Tz::Asia__Shanghai);
        assert_eq!(window.start, utc(2026, 10, 11, 16, 1));
        assert_eq!(window.week_label(), "2026-W42");
    }

    #[test]
    fn test_week_to_date_just_after_local_midnight_monday() {
        // Monday 00:00:30 local (MDT)
        let now = utc(2026, 10, 12, 6, 0) + Duration::seconds(30);
        let window = ReportWindow::week_to_date(now, Tz::America__Denver);
        assert_eq!(window.start, utc(2026, 10, 5, 6, 1));
        assert_eq!(window.week_label(), "2026-W41");
    }

    #[test]
    fn test_from_config_labels_trailing_window_in_zone() {
        let config = WindowConfig {
            mode: WindowMode::Trailing,
            days: 7,
            timezone: "Asia/Shanghai".into(),
        };
        // start 2026-10-11 20:00 UTC is Monday 04:00 in Shanghai
        let window = ReportWindow::from_config(&config, utc(2026, 10, 18, 20, 0));
        assert_eq!(window.start, utc(2026, 10, 11, 20, 0));
        assert_eq!(window.week_label(), "2026-W42");
        assert_eq!(ReportWindow::new(window.start, window.end).week_label(), "2026-W41");
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = FillRateReport {
            vendor: "Acme".into(),
            ordered_qty: 15,
            shipped_qty: 14,
            fill_rate: 0.9333,
            week: "2026-W42".into(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "vendor": "Acme",
                "orderedQty": 15,
                "shippedQty": 14,
                "fillRate": 0.9333,
                "week": "2026-W42"
            })
        );
    }
}
