pub mod client;
pub mod export;
pub mod record;

pub use client::{item_query, ItemFetch, QboClient, DEFAULT_API_BASE, DEFAULT_PAGE_SIZE};
pub use export::{export_batch, ExportPaths, ExportSummary};
pub use record::{normalize, ItemRecord, QtyOnHand, RawItem};
