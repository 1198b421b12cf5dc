//! Tool adapters
//!
//! - [`JsonCatalogProvider`]: tool descriptors from a JSON file
//! - [`FixtureInvoker`]: canned responses, for offline runs and tests
//! - `HttpToolInvoker`: calls a tool gateway over HTTP (feature `http-invoker`)

mod catalog_provider;
mod fixture_invoker;
#[cfg(feature = "http-invoker")]
mod http_invoker;

pub use catalog_provider::{CATALOG_PRIORITY, JsonCatalogProvider};
pub use fixture_invoker::{FixtureError, FixtureInvoker, FixtureResponse};
#[cfg(feature = "http-invoker")]
pub use http_invoker::HttpToolInvoker;
