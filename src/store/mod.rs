pub mod client;
pub mod queries;

pub use client::ElasticClient;

use crate::error::AppResult;
use async_trait::async_trait;
use serde_json::Value;

/// 文档存储 (Elasticsearch 或测试用的内存实现)
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 索引不存在时创建; 返回是否新建
    async fn ensure_index(&self, index: &str, mapping: &Value) -> AppResult<bool>;

    /// 批量写入, 返回写入条数
    async fn bulk_index(&self, index: &str, docs: &[Value]) -> AppResult<usize>;

    /// match_all 查询, 返回 _source (按存储返回的顺序)
    async fn search_all(&self, index: &str, size: usize, fields: &[&str]) -> AppResult<Vec<Value>>;
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for std::sync::Arc<T> {
    async fn ensure_index(&self, index: &str, mapping: &Value) -> AppResult<bool> {
        (**self).ensure_index(index, mapping).await
    }

    async fn bulk_index(&self, index: &str, docs: &[Value]) -> AppResult<usize> {
        (**self).bulk_index(index, docs).await
    }

    async fn search_all(&self, index: &str, size: usize, fields: &[&str]) -> AppResult<Vec<Value>> {
        (**self).search_all(index, size, fields).await
    }
}
