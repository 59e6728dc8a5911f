use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// 上游返回的原始履约记录
///
/// 字段命名在不同接口版本间不一致，这里全部按可选字段接收，
/// 再转换成字段确定的 [`FulfillmentRecord`]。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFulfillment {
    pub source_id: Option<Value>,
    /// 嵌套来源对象，只取 `name`
    pub source: Option<Value>,
    pub source_name: Option<String>,
    pub status: Option<String>,
    pub sent_at: Option<String>,
    pub ordered_at: Option<String>,
    pub fulfillment_request_number: Option<Value>,
    pub order_number: Option<Value>,
    /// 销售渠道对象，只取 `name`
    pub channel: Option<Value>,
    pub line_items: Option<Vec<RawLineItem>>,
    pub items: Option<Vec<RawLineItem>>,
    pub total_quantity: Option<Value>,
    pub shipped_quantity: Option<Value>,
}

/// 原始明细行
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLineItem {
    pub quantity: Option<Value>,
    pub quantity_ordered: Option<Value>,
    pub shipped_quantity: Option<Value>,
    pub quantity_shipped: Option<Value>,
    pub sku: Option<Value>,
    pub title: Option<Value>,
}

/// 单行 (或整单) 的订购/发货数量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineQuantity {
    pub ordered: u64,
    pub shipped: u64,
}

/// 明细行的商品信息，供明细导出使用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDetail {
    pub sku: Option<String>,
    pub title: Option<String>,
    pub quantity: LineQuantity,
}

/// 数量来源：有明细行时只用明细，否则用整单字段，二者互斥
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Quantities {
    LineItems(Vec<LineQuantity>),
    Totals(LineQuantity),
}

/// 规整后的履约记录
#[derive(Debug, Clone, PartialEq)]
pub struct FulfillmentRecord {
    /// 工单号，仅用于日志
    pub ticket: Option<String>,
    pub status: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub source_id: Option<String>,
    pub source_object_name: Option<String>,
    pub source_name: Option<String>,
    pub order_number: Option<String>,
    /// 下单时间原文
    pub ordered_at: Option<String>,
    pub channel: Option<String>,
    pub quantities: Quantities,
    /// 与 `Quantities::LineItems` 一一对应；整单数量时为空
    pub lines: Vec<LineDetail>,
}

impl From<RawFulfillment> for FulfillmentRecord {
    fn from(raw: RawFulfillment) -> Self {
        let lines: Vec<LineDetail> = pick_line_items(raw.line_items, raw.items)
            .unwrap_or_default()
            .iter()
            .map(LineDetail::from)
            .collect();
        let quantities = if lines.is_empty() {
            Quantities::Totals(LineQuantity {
                ordered: raw.total_quantity.as_ref().map_or(0, quantity_value),
                shipped: raw.shipped_quantity.as_ref().map_or(0, quantity_value),
            })
        } else {
            Quantities::LineItems(lines.iter().map(|line| line.quantity).collect())
        };

        Self {
            ticket: raw
                .fulfillment_request_number
                .as_ref()
                .and_then(scalar_text)
                .or_else(|| raw.order_number.as_ref().and_then(scalar_text)),
            status: raw.status.and_then(non_blank),
            sent_at: raw
                .sent_at
                .as_deref()
                .or(raw.ordered_at.as_deref())
                .and_then(parse_timestamp),
            source_id: raw.source_id.as_ref().and_then(scalar_text),
            source_object_name: nested_name(raw.source.as_ref()),
            source_name: raw.source_name.and_then(non_blank),
            order_number: raw.order_number.as_ref().and_then(scalar_text),
            ordered_at: raw.ordered_at.and_then(non_blank),
            channel: nested_name(raw.channel.as_ref()),
            quantities,
            lines,
        }
    }
}

impl From<&RawLineItem> for LineQuantity {
    fn from(item: &RawLineItem) -> Self {
        let ordered = item.quantity.as_ref().or(item.quantity_ordered.as_ref());
        let shipped = item.shipped_quantity.as_ref().or(item.quantity_shipped.as_ref());
        Self {
            ordered: ordered.map_or(0, quantity_value),
            shipped: shipped.map_or(0, quantity_value),
        }
    }
}

impl From<&RawLineItem> for LineDetail {
    fn from(item: &RawLineItem) -> Self {
        Self {
            sku: item.sku.as_ref().and_then(scalar_text),
            title: item.title.as_ref().and_then(scalar_text),
            quantity: LineQuantity::from(item),
        }
    }
}

impl FulfillmentRecord {
    /// 日志用标识
    pub fn ticket_or_unknown(&self) -> &str {
        self.ticket.as_deref().unwrap_or("<no ticket>")
    }
}

fn pick_line_items(
    line_items: Option<Vec<RawLineItem>>,
    items: Option<Vec<RawLineItem>>,
) -> Option<Vec<RawLineItem>> {
    line_items
        .filter(|v| !v.is_empty())
        .or_else(|| items.filter(|v| !v.is_empty()))
}

/// 数量字段转非负整数：负数、非数字、缺失一律视为 0，小数截断
pub fn quantity_value(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_i64().map(|_| 0))
            .or_else(|| n.as_f64().map(clamp_float))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse::<f64>().map(clamp_float).unwrap_or(0),
        _ => 0,
    }
}

fn clamp_float(v: f64) -> u64 {
    if v.is_finite() && v > 0.0 {
        v.trunc() as u64
    } else {
        0
    }
}

/// 嵌套对象的 `name` 字段，非对象或空名视为缺失
fn nested_name(value: Option<&Value>) -> Option<String> {
    value
        .and_then(|v| v.get("name"))
        .and_then(Value::as_str)
        .and_then(|name| non_blank(name.to_string()))
}

/// 数字或字符串标识转文本，空串视为缺失
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => non_blank(s.clone()),
        _ => None,
    }
}

fn non_blank(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == s.len() {
        Some(s)
    } else {
        Some(trimmed.to_string())
    }
}

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// 解析时间戳：优先 RFC 3339，无时区的格式按 UTC 处理
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}
