//! Multi-platform account search aggregation.
//!
//! An [`Aggregator`] answers a [`SearchQuery`](creatorhub_core::SearchQuery)
//! from its [`ResultCache`] when it can. On a miss it resolves adapters from
//! the [`AdapterRegistry`], fans the query out to all of them under one shared
//! deadline, and merges whatever arrived into a single deduplicated,
//! deterministically ordered page.

pub mod aggregator;
pub mod bootstrap;
pub mod cache;
pub mod error;
pub mod merge;
pub mod registry;
pub mod stats;

pub use aggregator::{Aggregator, AggregatorConfig, SearchOutcome};
pub use cache::{CacheKey, DisabledCache, MemoryCache, ResultCache};
pub use error::{CacheError, SearchError};
pub use registry::{AdapterDescriptor, AdapterHealth, AdapterRegistry};
pub use stats::{StatsSink, TracingStatsSink};
