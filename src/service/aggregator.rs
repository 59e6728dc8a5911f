use crate::models::{FulfillmentRecord, LineQuantity, Quantities, VendorKey, VendorTotals};

/// 单条记录的数量：有明细行则只累加明细，否则取整单字段
pub fn record_quantity(record: &FulfillmentRecord) -> LineQuantity {
    match &record.quantities {
        Quantities::LineItems(items) => items.iter().fold(LineQuantity::default(), |acc, item| {
            LineQuantity {
                ordered: acc.ordered.saturating_add(item.ordered),
                shipped: acc.shipped.saturating_add(item.shipped),
            }
        }),
        Quantities::Totals(totals) => *totals,
    }
}

/// 汇总一个供应商分组的订购量与发货量
pub fn aggregate(key: VendorKey, records: &[FulfillmentRecord]) -> VendorTotals {
    let mut totals = VendorTotals::new(key);
    for record in records {
        totals.add(record_quantity(record));
        totals.records += 1;
    }
    totals
}

/// 满足率 = 发货 / 订购，保留 4 位小数
///
/// 订购为 0 时定义为 0.0；超发 (> 1.0) 不截断，由报表使用方判断数据质量。
pub fn fill_rate(ordered: u64, shipped: u64) -> f64 {
    if ordered == 0 {
        return 0.0;
    }
    let ratio = shipped as f64 / ordered as f64;
    (ratio * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(quantities: Quantities) -> FulfillmentRecord {
        FulfillmentRecord {
            ticket: None,
            status: None,
            sent_at: None,
            source_id: Some("1".into()),
            source_object_name: None,
            source_name: None,
            order_number: None,
            ordered_at: None,
            channel: None,
            quantities,
            lines: Vec::new(),
        }
    }

    fn qty(ordered: u64, shipped: u64) -> LineQuantity {
        LineQuantity { ordered, shipped }
    }

    #[test]
    fn test_fill_rate_zero_ordered() {
        assert_eq!(fill_rate(0, 0), 0.0);
        assert_eq!(fill_rate(0, 25), 0.0);
    }

    #[test]
    fn test_fill_rate_rounds_to_four_places() {
        assert_eq!(fill_rate(15, 14), 0.9333);
        assert_eq!(fill_rate(3, 2), 0.6667);
        assert_eq!(fill_rate(20, 0), 0.0);
        assert_eq!(fill_rate(8, 8), 1.0);
    }

    #[test]
    fn test_fill_rate_allows_over_shipment() {
        assert_eq!(fill_rate(10, 12), 1.2);
        assert!(fill_rate(3, 4) > 1.0);
    }

    #[test]
    fn test_record_quantity_sums_line_items() {
        let r = record(Quantities::LineItems(vec![qty(10, 9), qty(5, 5)]));
        assert_eq!(record_quantity(&r), qty(15, 14));
    }

    #[test]
    fn test_record_quantity_uses_totals() {
        let r = record(Quantities::Totals(qty(20, 0)));
        assert_eq!(record_quantity(&r), qty(20, 0));
    }

    #[test]
    fn test_aggregate_group() {
        let records = vec![
            record(Quantities::LineItems(vec![qty(10, 9)])),
            record(Quantities::LineItems(vec![qty(5, 5)])),
            record(Quantities::Totals(qty(0, 0))),
        ];
        let totals = aggregate(VendorKey::SourceId("1".into()), &records);
        assert_eq!(totals.ordered, 15);
        assert_eq!(totals.shipped, 14);
        assert_eq!(totals.records, 3);
        assert_eq!(fill_rate(totals.ordered, totals.shipped), 0.9333);
    }
}
