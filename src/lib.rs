pub mod config;
pub mod error;
pub mod models;
pub mod render;
pub mod service;
pub mod source;
pub mod store;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use service::{DashboardService, IngestService};
pub use store::{DocumentStore, ElasticClient};
