use super::fulfillment::LineQuantity;
use std::collections::HashMap;
use std::fmt;

/// 供应商标识
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VendorKey {
    /// 来源系统 ID (数字或字符串)，首选
    SourceId(String),
    /// 仅有名称可用时
    Name(String),
}

impl VendorKey {
    pub fn as_str(&self) -> &str {
        match self {
            VendorKey::SourceId(id) => id,
            VendorKey::Name(name) => name,
        }
    }
}

impl fmt::Display for VendorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单个供应商在本次运行中的累计数量
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorTotals {
    pub key: VendorKey,
    pub ordered: u64,
    pub shipped: u64,
    pub records: usize,
}

impl VendorTotals {
    pub fn new(key: VendorKey) -> Self {
        Self {
            key,
            ordered: 0,
            shipped: 0,
            records: 0,
        }
    }

    pub fn add(&mut self, quantity: LineQuantity) {
        self.ordered = self.ordered.saturating_add(quantity.ordered);
        self.shipped = self.shipped.saturating_add(quantity.shipped);
    }
}

/// 来源 ID -> 显示名，仅影响展示
#[derive(Debug, Clone, Default)]
pub struct VendorIdentityMap {
    names: HashMap<String, String>,
}

impl VendorIdentityMap {
    pub fn new(names: HashMap<String, String>) -> Self {
        Self { names }
    }

    /// 没有映射时退回 `Source <id>`，不会丢弃或合并数据
    pub fn label(&self, key: &VendorKey) -> String {
        match key {
            VendorKey::SourceId(id) => self
                .names
                .get(id)
                .cloned()
                .unwrap_or_else(|| format!("Source {}", id)),
            VendorKey::Name(name) => name.clone(),
        }
    }

    /// 按顺序为一组供应商生成显示名，保证互不相同
    ///
    /// 映射名与其他供应商重名时，来源 ID 一方追加 ` (<id>)`。
    pub fn unique_labels<'a, I>(&self, keys: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a VendorKey>,
    {
        let keyed: Vec<(&VendorKey, String)> =
            keys.into_iter().map(|key| (key, self.label(key))).collect();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for (_, label) in &keyed {
            *counts.entry(label.as_str()).or_default() += 1;
        }

        keyed
            .iter()
            .map(|(key, label)| match key {
                VendorKey::SourceId(id) if counts[label.as_str()] > 1 => {
                    tracing::warn!(
                        source_id = %id,
                        label = %label,
                        "vendor label collides, adding id"
                    );
                    format!("{} ({})", label, id)
                }
                _ => label.clone(),
            })
            .collect()
    }
}
