use creatorhub_adapters::AdapterError;
use creatorhub_core::Platform;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("unknown platform requested: {0}")]
    UnknownPlatformRequested(String),

    #[error(transparent)]
    CacheUnavailable(#[from] CacheError),

    /// Every queried platform failed and no cache could stand in.
    #[error("search degraded: all queried platforms failed ({})", format_platforms(.platforms))]
    Degraded { platforms: Vec<Platform> },

    #[error("{platform} adapter error: {source}")]
    Adapter {
        platform: Platform,
        #[source]
        source: AdapterError,
    },
}

fn format_platforms(platforms: &[Platform]) -> String {
    platforms
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
