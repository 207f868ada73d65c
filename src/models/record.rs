use super::Schema;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// 一行库存数据 (CSV 行 / 索引文档)
pub trait InventoryRow: Serialize + DeserializeOwned + Send + Sync {
    const SCHEMA: Schema;

    /// 分组键
    fn material(&self) -> &str;

    /// 该行记录的最终库存
    fn final_stock(&self) -> i64;

    fn date(&self) -> Option<NaiveDate> {
        None
    }
}

/// 变体 A: 库存流水 (默认)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockFlowRecord {
    #[serde(default, alias = "Fecha", skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(alias = "Material")]
    pub material: String,
    #[serde(alias = "StockInicial")]
    pub opening_stock: i32,
    #[serde(alias = "Entradas")]
    pub inbound: i32,
    #[serde(alias = "Consumo")]
    pub consumed: i32,
    #[serde(alias = "StockFinal")]
    pub closing_stock: i32,
}

impl InventoryRow for StockFlowRecord {
    const SCHEMA: Schema = Schema::StockFlow;

    fn material(&self) -> &str {
        &self.material
    }

    fn final_stock(&self) -> i64 {
        i64::from(self.closing_stock)
    }

    fn date(&self) -> Option<NaiveDate> {
        self.date
    }
}

/// 变体 B: 商品目录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRecord {
    #[serde(alias = "Producto")]
    pub product: String,
    #[serde(alias = "Categoria")]
    pub category: String,
    #[serde(alias = "Stock")]
    pub stock: i32,
    #[serde(alias = "PrecioUnitario")]
    pub unit_price: f64,
}

impl InventoryRow for CatalogRecord {
    const SCHEMA: Schema = Schema::Catalog;

    fn material(&self) -> &str {
        &self.product
    }

    fn final_stock(&self) -> i64 {
        i64::from(self.stock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stock_flow_serializes_with_index_field_names() {
        let rec = StockFlowRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, 1),
            material: "Tornillo M6".to_string(),
            opening_stock: 100,
            inbound: 20,
            consumed: 30,
            closing_stock: 90,
        };
        let doc = serde_json::to_value(&rec).unwrap();
        assert_eq!(
            doc,
            json!({
                "date": "2024-01-01",
                "material": "Tornillo M6",
                "openingStock": 100,
                "inbound": 20,
                "consumed": 30,
                "closingStock": 90
            })
        );
        assert_eq!(rec.final_stock(), 90);
    }

    #[test]
    fn stock_flow_without_date_omits_field() {
        let doc = json!({
            "material": "Cable",
            "openingStock": 1,
            "inbound": 0,
            "consumed": 0,
            "closingStock": 1
        });
        let rec: StockFlowRecord = serde_json::from_value(doc.clone()).unwrap();
        assert_eq!(rec.date(), None);
        assert_eq!(serde_json::to_value(&rec).unwrap(), doc);
    }

    #[test]
    fn catalog_groups_by_product() {
        let rec: CatalogRecord = serde_json::from_value(json!({
            "product": "Guantes",
            "category": "EPP",
            "stock": 12,
            "unitPrice": 3.5
        }))
        .unwrap();
        assert_eq!(rec.material(), "Guantes");
        assert_eq!(rec.final_stock(), 12);
        assert_eq!(rec.date(), None);
    }
}
