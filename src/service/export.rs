use crate::error::SinkError;
use crate::models::FulfillmentRecord;
use serde::Serialize;
use std::fs::File;
use std::path::Path;

/// 订单明细导出行，一个订单行一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailRow {
    #[serde(rename = "Order Number")]
    pub order_number: String,
    #[serde(rename = "Order Date")]
    pub order_date: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Channel")]
    pub channel: String,
    #[serde(rename = "SKU")]
    pub sku: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Qty Ordered")]
    pub qty_ordered: u64,
}

/// 展开为明细行；只有整单数量的记录没有明细，不输出
pub fn detail_rows(records: &[FulfillmentRecord]) -> Vec<DetailRow> {
    records
        .iter()
        .flat_map(|record| {
            record.lines.iter().map(move |line| DetailRow {
                order_number: text(&record.order_number),
                order_date: text(&record.ordered_at),
                status: text(&record.status),
                channel: text(&record.channel),
                sku: text(&line.sku),
                title: text(&line.title),
                qty_ordered: line.quantity.ordered,
            })
        })
        .collect()
}

/// 覆盖写出明细 CSV，返回写入行数
pub fn export_detail_csv(
    records: &[FulfillmentRecord],
    output_path: &Path,
) -> Result<usize, SinkError> {
    let rows = detail_rows(records);
    let file = File::create(output_path)?;
    let mut writer = csv::Writer::from_writer(file);

    if rows.is_empty() {
        writer.write_record(HEADERS)?;
    }
    for row in &rows {
        writer.serialize(row)?;
    }

    writer.flush()?;
    Ok(rows.len())
}

const HEADERS: [&str; 7] = [
    "Order Number",
    "Order Date",
    "Status",
    "Channel",
    "SKU",
    "Title",
    "Qty Ordered",
];

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}
