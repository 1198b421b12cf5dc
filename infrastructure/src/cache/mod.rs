//! Cache storage adapters.

mod memory_store;
mod sweeper;

pub use memory_store::InMemoryCacheStore;
pub use sweeper::CacheSweeper;
