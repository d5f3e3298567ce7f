pub mod api;
pub mod client;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod registry;

pub use client::StatsClient;
pub use error::ScraperError;
pub use extract::{Extraction, Extractor};
pub use fetch::{FetchOutcome, FetchSource, FetchStatus, PlatformFetcher};
pub use registry::{ExtractorRegistry, Platform};
