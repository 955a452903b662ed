//! Infrastructure layer: tenant-scoped stores, keyed locks, the change feed and
//! the inventory engine built on them.

pub mod engine;
pub mod feed;
pub mod locks;
pub mod store;


pub use engine::{ConversionRequest, ConversionResult, EngineConfig, InventoryEngine};
pub use feed::{ChangeFeed, StockEnvelope};
pub use store::{StoreError, Stores};
