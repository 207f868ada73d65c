use crate::error::{AppError, AppResult};
use serde::Deserialize;
use serde_json::{json, Value};

/// 构建 _bulk 请求体 (NDJSON, 末尾必须换行)
pub fn bulk_body(index: &str, docs: &[Value]) -> AppResult<String> {
    let action = serde_json::to_string(&json!({ "index": { "_index": index } }))?;
    let mut body = String::with_capacity(docs.len() * 128);
    for doc in docs {
        body.push_str(&action);
        body.push('\n');
        body.push_str(&serde_json::to_string(doc)?);
        body.push('\n');
    }
    Ok(body)
}

/// match_all + _source 投影
pub fn search_body(size: usize, fields: &[&str]) -> Value {
    json!({
        "size": size,
        "_source": fields,
        "query": { "match_all": {} }
    })
}

#[derive(Debug, Deserialize)]
pub struct BulkResponse {
    #[serde(default)]
    pub errors: bool,
    #[serde(default)]
    pub items: Vec<BulkItem>,
}

#[derive(Debug, Deserialize)]
pub struct BulkItem {
    #[serde(alias = "create")]
    pub index: BulkItemResult,
}

#[derive(Debug, Deserialize)]
pub struct BulkItemResult {
    pub status: u16,
    #[serde(default)]
    pub error: Option<Value>,
}

impl BulkResponse {
    /// 校验每一条结果, 有失败则整体报错
    pub fn into_written(self, total: usize) -> AppResult<usize> {
        let failed: Vec<&BulkItemResult> = self
            .items
            .iter()
            .map(|item| &item.index)
            .filter(|r| r.error.is_some() || r.status >= 300)
            .collect();

        if !self.errors && failed.is_empty() {
            return Ok(self.items.len());
        }

        let reason = failed
            .first()
            .and_then(|r| r.error.as_ref())
            .map(describe_error)
            .unwrap_or_else(|| "unknown bulk failure".to_string());
        Err(AppError::BulkRejected {
            failed: failed.len(),
            total,
            reason,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub hits: Hits,
}

#[derive(Debug, Deserialize)]
pub struct Hits {
    #[serde(default)]
    pub hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
pub struct Hit {
    #[serde(rename = "_source", default)]
    pub source: Value,
}

impl SearchResponse {
    pub fn into_sources(self) -> Vec<Value> {
        self.hits.hits.into_iter().map(|h| h.source).collect()
    }
}

/// 错误体里的 error.type (如 resource_already_exists_exception)
pub fn error_type(body: &Value) -> Option<&str> {
    body.get("error")?.get("type")?.as_str()
}

fn describe_error(error: &Value) -> String {
    match (
        error.get("type").and_then(Value::as_str),
        error.get("reason").and_then(Value::as_str),
    ) {
        (Some(kind), Some(reason)) => format!("{}: {}", kind, reason),
        (Some(kind), None) => kind.to_string(),
        _ => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulk_body_is_newline_delimited() {
        let docs = vec![json!({"material": "A", "closingStock": 1}), json!({"material": "B", "closingStock": 2})];
        let body = bulk_body("inventario", &docs).unwrap();
        let lines: Vec<&str> = body.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(body.ends_with('\n'));
        assert_eq!(
            serde_json::from_str::<Value>(lines[0]).unwrap(),
            json!({"index": {"_index": "inventario"}})
        );
        assert_eq!(serde_json::from_str::<Value>(lines[3]).unwrap(), docs[1]);
    }

    #[test]
    fn search_body_projects_fields() {
        let body = search_body(1000, &["material", "closingStock"]);
        assert_eq!(body["size"], 1000);
        assert_eq!(body["_source"], json!(["material", "closingStock"]));
        assert_eq!(body["query"], json!({"match_all": {}}));
    }

    #[test]
    fn successful_bulk_counts_items() {
        let resp: BulkResponse = serde_json::from_value(json!({
            "took": 3,
            "errors": false,
            "items": [
                {"index": {"_index": "inventario", "status": 201}},
                {"index": {"_index": "inventario", "status": 201}}
            ]
        }))
        .unwrap();
        assert_eq!(resp.into_written(2).unwrap(), 2);
    }

    #[test]
    fn partial_bulk_failure_is_fatal() {
        let resp: BulkResponse = serde_json::from_value(json!({
            "errors": true,
            "items": [
                {"index": {"status": 201}},
                {"index": {"status": 400, "error": {
                    "type": "mapper_parsing_exception",
                    "reason": "failed to parse field [closingStock]"
                }}}
            ]
        }))
        .unwrap();

        match resp.into_written(2).unwrap_err() {
            AppError::BulkRejected { failed, total, reason } => {
                assert_eq!(failed, 1);
                assert_eq!(total, 2);
                assert_eq!(reason, "mapper_parsing_exception: failed to parse field [closingStock]");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn search_response_keeps_hit_order() {
        let resp: SearchResponse = serde_json::from_value(json!({
            "hits": {
                "total": {"value": 2, "relation": "eq"},
                "hits": [
                    {"_id": "1", "_source": {"material": "B"}},
                    {"_id": "2", "_source": {"material": "A"}}
                ]
            }
        }))
        .unwrap();
        let sources = resp.into_sources();
        assert_eq!(sources[0]["material"], "B");
        assert_eq!(sources[1]["material"], "A");
    }

    #[test]
    fn reads_error_type() {
        let body = json!({"error": {"type": "resource_already_exists_exception"}, "status": 400});
        assert_eq!(error_type(&body), Some("resource_already_exists_exception"));
        assert_eq!(error_type(&json!({})), None);
    }
}
