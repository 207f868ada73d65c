use crate::error::{AppError, AppResult};
use encoding_rs::Encoding;
use serde::de::DeserializeOwned;
use std::path::Path;

/// 读取 CSV 文件 (带表头), 按指定编码解码后反序列化为记录
pub fn read_records<R: DeserializeOwned>(path: &Path, encoding_label: &str) -> AppResult<Vec<R>> {
    let encoding = resolve_encoding(encoding_label)?;
    let bytes = std::fs::read(path).map_err(|e| AppError::io(path, e))?;

    let (text, used, had_errors) = encoding.decode(&bytes);
    if had_errors {
        return Err(AppError::Encoding {
            path: path.to_path_buf(),
            encoding: used.name(),
        });
    }
    tracing::debug!("Decoded {} bytes from {} as {}", bytes.len(), path.display(), used.name());

    parse_records(&text)
}

/// 编码名称按 WHATWG 标签解析 (utf-8 / latin1 / windows-1252 ...)
pub fn resolve_encoding(label: &str) -> AppResult<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| AppError::invalid_config(format!("unknown CSV encoding '{}'", label)))
}

pub fn parse_records<R: DeserializeOwned>(text: &str) -> AppResult<Vec<R>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for (idx, result) in reader.deserialize::<R>().enumerate() {
        let row = idx as u64 + 1;
        records.push(result.map_err(|e| coercion_error(row, &e))?);
    }
    Ok(records)
}

fn coercion_error(row: u64, e: &csv::Error) -> AppError {
    let line = e.position().map(|p| p.line()).unwrap_or(row + 1);
    let message = match e.kind() {
        csv::ErrorKind::Deserialize { err, .. } => err.to_string(),
        _ => e.to_string(),
    };
    AppError::Coercion { row, line, message }
}
