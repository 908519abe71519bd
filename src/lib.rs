//! book-scout - Compare one book across marketplaces, libraries and stores
//!
//! A query fans out to every selected source concurrently. Each page is
//! scraped into listings, priced in the home currency and ranked, with
//! configured local sellers treated as free pickup.

pub mod aggregate;
pub mod batch;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod filters;
pub mod format;
pub mod models;
pub mod normalize;
pub mod pricing;
pub mod query;
pub mod search;
pub mod sources;

pub use config::Config;
pub use error::{ListingError, QueryError, SourceError};
pub use models::{ComparisonRow, Format, Listing, Money, SourceId};
pub use query::QuerySpec;
pub use search::{SearchOrchestrator, SearchReport};
