pub mod ranked;
pub mod record;
pub mod schema;

pub use ranked::RankedEntry;
pub use record::{CatalogRecord, InventoryRow, StockFlowRecord};
pub use schema::Schema;
