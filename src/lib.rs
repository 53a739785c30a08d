//! Freight quote engine for North American lanes.
//!
//! Resolves origin and destination descriptors to coordinates, measures the
//! lane (driving route with a great-circle fallback), and prices it by
//! distance, equipment class and weight.

pub mod config;
pub mod distance;
pub mod error;
pub mod location;
pub mod pricing;
pub mod quote;
pub mod server;

pub use config::AppConfig;
pub use error::{LocationSide, QuoteError};
pub use quote::{QuoteEngine, QuoteRecord, QuoteRequest, QuoteResult};
