//! Shared domain types and configuration for creatorhub.
//!
//! Every other crate in the workspace speaks in terms of the types defined
//! here: [`Platform`] identifiers, normalized [`AccountResult`] hits, the
//! per-request [`SearchQuery`], and the [`AggregatedResult`] produced by the
//! search aggregator.

pub mod account;
pub mod app_config;
pub mod config;
pub mod platform;
pub mod query;
pub mod result;

use thiserror::Error;

pub use account::{AccountId, AccountResult};
pub use app_config::{AppConfig, Environment};
pub use config::{build_app_config, load_app_config, load_app_config_from_env};
pub use platform::{Platform, PlatformInfo, PlatformKind};
pub use query::{parse_platform_list, SearchQuery, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use result::{AggregatedResult, ErrorKind, PlatformStat};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("invalid account id \"{0}\": expected <platform>:<platform_account_id>")]
    InvalidAccountId(String),
}
