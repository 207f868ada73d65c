use crate::error::{AppError, AppResult};
use crate::models::Schema;
use crate::render::ChartFormat;
use crate::service::{MergePolicy, ReduceOrder};
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use config::{Config, Environment};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const ENDPOINT_KEY: &str = "ELASTIC_ENDPOINT";
const CLOUD_ID_KEY: &str = "ELASTIC_CLOUD_ID";
const API_KEY_KEY: &str = "ELASTIC_API_KEY";

/// 应用配置
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub schema: Schema,
    pub store: StoreConfig,
    pub ingest: IngestConfig,
    pub dashboard: DashboardConfig,
}

/// 连接方式: 直连地址 或 Elastic Cloud ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Connection {
    Endpoint(String),
    CloudId(String),
}

#[derive(Clone)]
pub struct StoreConfig {
    pub connection: Connection,
    pub api_key: String,
    pub index: String,
    pub timeout: Duration,
    /// 0 = 不重试
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub bulk_chunk_size: usize,
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("connection", &self.connection)
            .field("api_key", &"<redacted>")
            .field("index", &self.index)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff", &self.retry_backoff)
            .field("bulk_chunk_size", &self.bulk_chunk_size)
            .finish()
    }
}

impl StoreConfig {
    /// 解析出实际请求的基础 URL (不带末尾 /)
    pub fn base_url(&self) -> AppResult<String> {
        let url = match &self.connection {
            Connection::Endpoint(url) => url.clone(),
            Connection::CloudId(id) => resolve_cloud_id(id)?,
        };
        Ok(url.trim_end_matches('/').to_string())
    }
}

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub csv_path: PathBuf,
    pub encoding: String,
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub query_size: usize,
    pub top_n: usize,
    pub merge_policy: MergePolicy,
    pub order: ReduceOrder,
    pub output_dir: PathBuf,
    pub chart_format: ChartFormat,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            query_size: 1000,
            top_n: 10,
            merge_policy: MergePolicy::default(),
            order: ReduceOrder::default(),
            output_dir: PathBuf::from("."),
            chart_format: ChartFormat::default(),
        }
    }
}

/// 环境变量原始值 (config 会把键名转成小写)
#[derive(Debug, Default, Deserialize)]
struct RawEnv {
    elastic_endpoint: Option<String>,
    elastic_cloud_id: Option<String>,
    elastic_api_key: Option<String>,
    elastic_timeout_secs: Option<String>,
    elastic_max_retries: Option<String>,
    elastic_retry_backoff_ms: Option<String>,
    elastic_bulk_chunk_size: Option<String>,
    inventory_index: Option<String>,
    inventory_schema: Option<String>,
    inventory_csv_path: Option<String>,
    inventory_csv_encoding: Option<String>,
    inventory_query_size: Option<String>,
    inventory_top_n: Option<String>,
    inventory_merge_policy: Option<String>,
    inventory_reduce_order: Option<String>,
    inventory_output_dir: Option<String>,
    inventory_chart_format: Option<String>,
}

impl AppConfig {
    /// 从进程环境变量加载配置
    pub fn from_env() -> AppResult<Self> {
        Self::from_environment(Environment::default())
    }

    /// 从给定的键值对加载配置 (不读取进程环境)
    pub fn from_vars<I, K, V>(vars: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: config::Map<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::from_environment(Environment::default().source(Some(map)))
    }

    fn from_environment(env: Environment) -> AppResult<Self> {
        let raw: RawEnv = Config::builder().add_source(env).build()?.try_deserialize()?;
        raw.validate()
    }
}

impl RawEnv {
    /// 一次性校验, 缺失的必填项全部列出
    fn validate(self) -> AppResult<AppConfig> {
        let endpoint = non_empty(self.elastic_endpoint);
        let cloud_id = non_empty(self.elastic_cloud_id);
        let api_key = non_empty(self.elastic_api_key);

        let mut missing = Vec::new();
        if endpoint.is_none() && cloud_id.is_none() {
            missing.push(format!("{} (or {})", ENDPOINT_KEY, CLOUD_ID_KEY));
        }
        if api_key.is_none() {
            missing.push(API_KEY_KEY.to_string());
        }

        let (connection, api_key) = match (endpoint, cloud_id, api_key) {
            (Some(url), cloud_id, Some(key)) if missing.is_empty() => {
                if cloud_id.is_some() {
                    tracing::warn!("Both {} and {} are set, using the endpoint", ENDPOINT_KEY, CLOUD_ID_KEY);
                }
                (Connection::Endpoint(url), key)
            }
            (None, Some(id), Some(key)) => (Connection::CloudId(id), key),
            _ => return Err(AppError::MissingConfig(missing)),
        };

        let store = StoreConfig {
            connection,
            api_key,
            index: non_empty(self.inventory_index).unwrap_or_else(|| "inventario".to_string()),
            timeout: Duration::from_secs(parse_or("ELASTIC_TIMEOUT_SECS", self.elastic_timeout_secs, 30)?),
            max_retries: parse_or("ELASTIC_MAX_RETRIES", self.elastic_max_retries, 0)?,
            retry_backoff: Duration::from_millis(parse_or(
                "ELASTIC_RETRY_BACKOFF_MS",
                self.elastic_retry_backoff_ms,
                500,
            )?),
            bulk_chunk_size: parse_or("ELASTIC_BULK_CHUNK_SIZE", self.elastic_bulk_chunk_size, 1000)?,
        };
        if store.bulk_chunk_size == 0 {
            return Err(AppError::invalid_config("ELASTIC_BULK_CHUNK_SIZE must be greater than 0"));
        }
        // Cloud ID 格式错误也要在联网前暴露
        store.base_url()?;

        let ingest = IngestConfig {
            csv_path: non_empty(self.inventory_csv_path)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/inventario.csv")),
            encoding: non_empty(self.inventory_csv_encoding).unwrap_or_else(|| "utf-8".to_string()),
        };

        let defaults = DashboardConfig::default();
        let dashboard = DashboardConfig {
            query_size: parse_or("INVENTORY_QUERY_SIZE", self.inventory_query_size, defaults.query_size)?,
            top_n: parse_or("INVENTORY_TOP_N", self.inventory_top_n, defaults.top_n)?,
            merge_policy: parse_or("INVENTORY_MERGE_POLICY", self.inventory_merge_policy, defaults.merge_policy)?,
            order: parse_or("INVENTORY_REDUCE_ORDER", self.inventory_reduce_order, defaults.order)?,
            output_dir: non_empty(self.inventory_output_dir)
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            chart_format: parse_or("INVENTORY_CHART_FORMAT", self.inventory_chart_format, defaults.chart_format)?,
        };
        if dashboard.query_size == 0 {
            return Err(AppError::invalid_config("INVENTORY_QUERY_SIZE must be greater than 0"));
        }

        Ok(AppConfig {
            schema: parse_or("INVENTORY_SCHEMA", self.inventory_schema, Schema::default())?,
            store,
            ingest,
            dashboard,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match non_empty(value) {
        None => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|e| AppError::invalid_config(format!("{}={:?}: {}", key, v, e))),
    }
}

/// 解析 Elastic Cloud ID: `name:base64(host$es_uuid$kibana_uuid)`
pub fn resolve_cloud_id(cloud_id: &str) -> AppResult<String> {
    let encoded = cloud_id
        .split_once(':')
        .map(|(_, rest)| rest)
        .unwrap_or(cloud_id);

    let engine = GeneralPurpose::new(
        &alphabet::STANDARD,
        GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
    );
    let decoded = engine
        .decode(encoded)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| AppError::invalid_config(format!("{} is not valid base64", CLOUD_ID_KEY)))?;

    let mut parts = decoded.split('$');
    let host = parts.next().unwrap_or_default();
    let es_uuid = parts.next().unwrap_or_default();
    if host.is_empty() || es_uuid.is_empty() {
        return Err(AppError::invalid_config(format!(
            "{} does not contain a host and an Elasticsearch id",
            CLOUD_ID_KEY
        )));
    }

    match host.rsplit_once(':') {
        Some((domain, port)) => Ok(format!("https://{}.{}:{}", es_uuid, domain, port)),
        None => Ok(format!("https://{}.{}", es_uuid, host)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;

    fn cloud_id(payload: &str) -> String {
        format!("my-deployment:{}", STANDARD.encode(payload))
    }

    #[test]
    fn reports_all_missing_keys_at_once() {
        let err = AppConfig::from_vars(Vec::<(String, String)>::new()).unwrap_err();
        match err {
            AppError::MissingConfig(keys) => {
                assert_eq!(
                    keys,
                    vec![
                        "ELASTIC_ENDPOINT (or ELASTIC_CLOUD_ID)".to_string(),
                        "ELASTIC_API_KEY".to_string()
                    ]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn blank_values_count_as_missing() {
        let err = AppConfig::from_vars([
            ("ELASTIC_ENDPOINT", "http://localhost:9200"),
            ("ELASTIC_API_KEY", "   "),
        ])
        .unwrap_err();
        assert!(matches!(err, AppError::MissingConfig(keys) if keys == vec!["ELASTIC_API_KEY".to_string()]));
    }

    #[test]
    fn endpoint_mode_uses_defaults() {
        let cfg = AppConfig::from_vars([
            ("ELASTIC_ENDPOINT", "http://localhost:9200/"),
            ("ELASTIC_API_KEY", "secret"),
        ])
        .unwrap();

        assert_eq!(cfg.schema, Schema::StockFlow);
        assert_eq!(cfg.store.base_url().unwrap(), "http://localhost:9200");
        assert_eq!(cfg.store.index, "inventario");
        assert_eq!(cfg.store.max_retries, 0);
        assert_eq!(cfg.store.bulk_chunk_size, 1000);
        assert_eq!(cfg.ingest.csv_path, PathBuf::from("data/inventario.csv"));
        assert_eq!(cfg.ingest.encoding, "utf-8");
        assert_eq!(cfg.dashboard.query_size, 1000);
        assert_eq!(cfg.dashboard.top_n, 10);
        assert_eq!(cfg.dashboard.merge_policy, MergePolicy::LastWins);
        assert_eq!(cfg.dashboard.order, ReduceOrder::Chronological);
        assert_eq!(cfg.dashboard.chart_format, ChartFormat::Png);
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = AppConfig::from_vars([
            ("ELASTIC_ENDPOINT", "http://es:9200"),
            ("ELASTIC_API_KEY", "secret"),
            ("INVENTORY_SCHEMA", "catalog"),
            ("INVENTORY_CSV_ENCODING", "latin1"),
            ("INVENTORY_TOP_N", "5"),
            ("INVENTORY_MERGE_POLICY", "sum"),
            ("INVENTORY_REDUCE_ORDER", "as-returned"),
            ("INVENTORY_CHART_FORMAT", "svg"),
            ("ELASTIC_MAX_RETRIES", "3"),
            ("ELASTIC_RETRY_BACKOFF_MS", "10"),
        ])
        .unwrap();

        assert_eq!(cfg.schema, Schema::Catalog);
        assert_eq!(cfg.ingest.encoding, "latin1");
        assert_eq!(cfg.dashboard.top_n, 5);
        assert_eq!(cfg.dashboard.merge_policy, MergePolicy::Sum);
        assert_eq!(cfg.dashboard.order, ReduceOrder::AsReturned);
        assert_eq!(cfg.dashboard.chart_format, ChartFormat::Svg);
        assert_eq!(cfg.store.max_retries, 3);
        assert_eq!(cfg.store.retry_backoff, Duration::from_millis(10));
    }

    #[test]
    fn unparsable_number_names_the_key() {
        let err = AppConfig::from_vars([
            ("ELASTIC_ENDPOINT", "http://es:9200"),
            ("ELASTIC_API_KEY", "secret"),
            ("INVENTORY_TOP_N", "ten"),
        ])
        .unwrap_err();
        assert!(matches!(&err, AppError::InvalidConfig(msg) if msg.contains("INVENTORY_TOP_N")));
    }

    #[test]
    fn cloud_id_mode_resolves_url() {
        let id = cloud_id("us-central1.gcp.cloud.es.io$abc123$def456");
        let cfg = AppConfig::from_vars([
            ("ELASTIC_CLOUD_ID", id.as_str()),
            ("ELASTIC_API_KEY", "secret"),
        ])
        .unwrap();
        assert_eq!(cfg.store.connection, Connection::CloudId(id.clone()));
        assert_eq!(
            cfg.store.base_url().unwrap(),
            "https://abc123.us-central1.gcp.cloud.es.io"
        );
    }

    #[test]
    fn cloud_id_keeps_port() {
        let url = resolve_cloud_id(&cloud_id("eu-west-1.aws.found.io:9243$abc$def")).unwrap();
        assert_eq!(url, "https://abc.eu-west-1.aws.found.io:9243");
    }

    #[test]
    fn malformed_cloud_id_fails_fast() {
        let err = AppConfig::from_vars([
            ("ELASTIC_CLOUD_ID", "deployment:%%%"),
            ("ELASTIC_API_KEY", "secret"),
        ])
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidConfig(_)));
    }

    #[test]
    fn debug_output_hides_api_key() {
        let cfg = AppConfig::from_vars([
            ("ELASTIC_ENDPOINT", "http://es:9200"),
            ("ELASTIC_API_KEY", "super-secret-key"),
        ])
        .unwrap();
        let printed = format!("{:?}", cfg);
        assert!(!printed.contains("super-secret-key"));
        assert!(printed.contains("<redacted>"));
    }
}
