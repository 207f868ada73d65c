use crate::error::AppResult;
use crate::models::InventoryRow;
use crate::source;
use crate::store::DocumentStore;
use serde_json::Value;
use std::path::Path;

/// 导入结果统计
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub rows_read: usize,
    pub rows_written: usize,
    pub index_created: bool,
}

/// CSV -> 文档存储 的批量导入
pub struct IngestService<S> {
    store: S,
    index: String,
    chunk_size: usize,
}

impl<S: DocumentStore> IngestService<S> {
    pub fn new(store: S, index: impl Into<String>, chunk_size: usize) -> Self {
        Self {
            store,
            index: index.into(),
            chunk_size: chunk_size.max(1),
        }
    }

    /// 读取 CSV 并写入索引 (文件错误在任何网络请求之前暴露)
    pub async fn load_csv<R: InventoryRow>(&self, path: &Path, encoding: &str) -> AppResult<IngestSummary> {
        tracing::info!("Reading {} ({})", path.display(), encoding);
        let records: Vec<R> = source::read_records(path, encoding)?;
        tracing::info!("Parsed {} rows as {} records", records.len(), R::SCHEMA);

        self.load_records(&records).await
    }

    pub async fn load_records<R: InventoryRow>(&self, records: &[R]) -> AppResult<IngestSummary> {
        // 1. 建索引 (已存在则跳过)
        let index_created = self
            .store
            .ensure_index(&self.index, &R::SCHEMA.mapping())
            .await?;

        if records.is_empty() {
            tracing::info!("No rows to load into '{}'", self.index);
            return Ok(IngestSummary {
                rows_read: 0,
                rows_written: 0,
                index_created,
            });
        }

        // 2. 转为文档
        let docs = records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<Value>, _>>()?;

        // 3. 分块批量写入
        let total_chunks = docs.len().div_ceil(self.chunk_size);
        let mut rows_written = 0;
        for (idx, chunk) in docs.chunks(self.chunk_size).enumerate() {
            rows_written += self.store.bulk_index(&self.index, chunk).await?;
            tracing::info!(
                "Bulk progress: {}/{} chunks, {} rows written",
                idx + 1,
                total_chunks,
                rows_written
            );
        }

        Ok(IngestSummary {
            rows_read: records.len(),
            rows_written,
            index_created,
        })
    }
}
