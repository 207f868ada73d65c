pub mod dashboard;
pub mod ingest;
pub mod ranking;

pub use dashboard::{DashboardService, DashboardSummary};
pub use ingest::{IngestService, IngestSummary};
pub use ranking::{order_chronologically, rank, reduce_stock, top_materials, MergePolicy, ReduceOrder};
