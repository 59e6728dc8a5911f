use crate::models::{FulfillmentRecord, VendorKey};
use indexmap::IndexMap;
use std::collections::HashSet;

/// 供应商识别
///
/// 优先级 (命中即止，不混用):
/// 1. `sourceId`
/// 2. 嵌套 `source.name`
/// 3. 顶层 `sourceName`
///
/// 都没有则记录无法归属，剔除并告警。
#[derive(Debug, Clone, Default)]
pub struct VendorResolver {
    allow_list: Option<HashSet<String>>,
}

/// 分组结果
#[derive(Debug, Default)]
pub struct VendorGroups {
    /// 按首次出现顺序
    pub groups: IndexMap<VendorKey, Vec<FulfillmentRecord>>,
    pub unresolvable: usize,
    pub excluded: usize,
}

impl VendorResolver {
    pub fn new(allow_list: Option<HashSet<String>>) -> Self {
        Self { allow_list }
    }

    pub fn resolve(&self, record: &FulfillmentRecord) -> Option<VendorKey> {
        if let Some(id) = &record.source_id {
            return Some(VendorKey::SourceId(id.clone()));
        }
        record
            .source_object_name
            .as_ref()
            .or(record.source_name.as_ref())
            .map(|name| VendorKey::Name(name.clone()))
    }

    /// 白名单在识别之后判断，便于统计被排除的记录
    pub fn is_allowed(&self, key: &VendorKey) -> bool {
        self.allow_list
            .as_ref()
            .map_or(true, |allowed| allowed.contains(key.as_str()))
    }

    pub fn group(&self, records: Vec<FulfillmentRecord>) -> VendorGroups {
        let mut result = VendorGroups::default();

        for record in records {
            let Some(key) = self.resolve(&record) else {
                tracing::warn!(
                    ticket = record.ticket_or_unknown(),
                    "record has no sourceId or source name, excluded from aggregation"
                );
                result.unresolvable += 1;
                continue;
            };

            if !self.is_allowed(&key) {
                tracing::debug!(
                    ticket = record.ticket_or_unknown(),
                    vendor = %key,
                    "vendor not in allow-list, record excluded"
                );
                result.excluded += 1;
                continue;
            }

            result.groups.entry(key).or_default().push(record);
        }

        result
    }
}
