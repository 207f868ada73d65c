use super::ranking::{order_chronologically, rank, reduce_stock, ReduceOrder};
use crate::config::DashboardConfig;
use crate::error::{AppError, AppResult};
use crate::models::{InventoryRow, RankedEntry};
use crate::render::{render_bar_chart, render_html, ChartLabels, DashboardPage};
use crate::store::DocumentStore;
use serde_json::Value;
use std::path::PathBuf;

/// 看板生成结果
#[derive(Debug, Clone)]
pub struct DashboardSummary {
    pub documents: usize,
    pub materials: usize,
    pub ranked: Vec<RankedEntry>,
    pub chart_path: PathBuf,
    pub html_path: PathBuf,
}

/// 查询 -> 归约 -> 排名 -> 输出图表和 HTML
pub struct DashboardService<S> {
    store: S,
    index: String,
    config: DashboardConfig,
}

impl<S: DocumentStore> DashboardService<S> {
    pub fn new(store: S, index: impl Into<String>, config: DashboardConfig) -> Self {
        Self {
            store,
            index: index.into(),
            config,
        }
    }

    /// 查询并计算排名 (不写文件)
    pub async fn rank<R: InventoryRow>(&self) -> AppResult<(usize, usize, Vec<RankedEntry>)> {
        // 1. 查询 (上限 query_size 条)
        let docs = self
            .store
            .search_all(&self.index, self.config.query_size, R::SCHEMA.source_fields())
            .await?;
        let documents = docs.len();
        let mut records: Vec<R> = decode_documents(docs)?;

        // 2. 存储返回顺序不保证按日期
        if self.config.order == ReduceOrder::Chronological {
            order_chronologically(&mut records);
        }

        // 3. 归约 + 排名
        let stock_by_material = reduce_stock(&records, self.config.merge_policy);
        let materials = stock_by_material.len();
        let ranked = rank(stock_by_material, self.config.top_n);

        tracing::info!(
            "Reduced {} documents to {} materials ({}), keeping top {}",
            documents,
            materials,
            self.config.merge_policy,
            ranked.len()
        );
        Ok((documents, materials, ranked))
    }

    /// 生成看板文件, 每次覆盖
    pub async fn build<R: InventoryRow>(&self, source_name: &str) -> AppResult<DashboardSummary> {
        let (documents, materials, ranked) = self.rank::<R>().await?;

        let out_dir = &self.config.output_dir;
        std::fs::create_dir_all(out_dir).map_err(|e| AppError::io(out_dir, e))?;

        let (key_label, value_label) = R::SCHEMA.labels();
        let chart_file = self.config.chart_format.file_name();
        let chart_path = out_dir.join(chart_file);
        let labels = ChartLabels {
            title: format!(
                "Top {} {}s by {}",
                self.config.top_n,
                key_label.to_lowercase(),
                value_label.to_lowercase()
            ),
            x_desc: key_label.to_string(),
            y_desc: value_label.to_string(),
        };
        render_bar_chart(&ranked, &labels, self.config.chart_format, &chart_path)?;

        let generated_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let html = render_html(&DashboardPage {
            index: &self.index,
            source_name,
            chart_file,
            key_label,
            value_label,
            top_n: self.config.top_n,
            generated_at: &generated_at,
            entries: &ranked,
        });
        let html_path = out_dir.join("index.html");
        std::fs::write(&html_path, html).map_err(|e| AppError::io(&html_path, e))?;
        tracing::info!("Page written to {}", html_path.display());

        Ok(DashboardSummary {
            documents,
            materials,
            ranked,
            chart_path,
            html_path,
        })
    }
}

fn decode_documents<R: InventoryRow>(docs: Vec<Value>) -> AppResult<Vec<R>> {
    docs.into_iter()
        .enumerate()
        .map(|(i, doc)| {
            serde_json::from_value(doc).map_err(|e| AppError::BadDocument {
                position: i + 1,
                message: e.to_string(),
            })
        })
        .collect()
}
