use serde::{Deserialize, Serialize};

/// 排名结果 (material, 最终库存)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub material: String,
    pub stock: i64,
}

impl RankedEntry {
    pub fn new(material: impl Into<String>, stock: i64) -> Self {
        Self {
            material: material.into(),
            stock,
        }
    }
}
