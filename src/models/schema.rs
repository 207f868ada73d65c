use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// 索引结构变体 (一次部署只能选一种, 两者字段互不兼容)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Schema {
    /// date / material / openingStock / inbound / consumed / closingStock
    #[default]
    StockFlow,
    /// product / category / stock / unitPrice
    Catalog,
}

impl Schema {
    /// 建索引时使用的 mappings
    pub fn mapping(&self) -> Value {
        match self {
            Schema::StockFlow => json!({
                "mappings": {
                    "properties": {
                        "date": { "type": "date" },
                        "material": { "type": "keyword" },
                        "openingStock": { "type": "integer" },
                        "inbound": { "type": "integer" },
                        "consumed": { "type": "integer" },
                        "closingStock": { "type": "integer" }
                    }
                }
            }),
            Schema::Catalog => json!({
                "mappings": {
                    "properties": {
                        "product": { "type": "keyword" },
                        "category": { "type": "keyword" },
                        "stock": { "type": "integer" },
                        "unitPrice": { "type": "float" }
                    }
                }
            }),
        }
    }

    /// 查询时的 _source 投影
    pub fn source_fields(&self) -> &'static [&'static str] {
        match self {
            Schema::StockFlow => &[
                "date",
                "material",
                "openingStock",
                "inbound",
                "consumed",
                "closingStock",
            ],
            Schema::Catalog => &["product", "category", "stock", "unitPrice"],
        }
    }

    /// 看板表头: (分组键, 库存值)
    pub fn labels(&self) -> (&'static str, &'static str) {
        match self {
            Schema::StockFlow => ("Material", "Closing stock"),
            Schema::Catalog => ("Product", "Stock"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Schema::StockFlow => "stock-flow",
            Schema::Catalog => "catalog",
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Schema {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stock-flow" | "stockflow" | "a" => Ok(Schema::StockFlow),
            "catalog" | "b" => Ok(Schema::Catalog),
            other => Err(format!(
                "unknown schema '{}', expected 'stock-flow' or 'catalog'",
                other
            )),
        }
    }
}
