// Service exports
pub mod cache;
pub mod catalog;
pub mod http_catalog;
pub mod postgres;

pub use cache::{CacheEntry, CacheError, CacheKey, MemoryCache, ResultCache, TieredCache, DEFAULT_TTL};
pub use catalog::{parse_colleges, sanitize_colleges, CatalogError, CatalogProvider, SnapshotMemo, StaticCatalog};
pub use http_catalog::HttpCatalog;
pub use postgres::PostgresCatalog;
