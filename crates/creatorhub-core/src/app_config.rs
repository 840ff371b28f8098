use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub search_deadline_ms: u64,
    pub cache_enabled: bool,
    pub cache_ttl_secs: u64,
    pub cache_max_entries: usize,
    pub unhealthy_threshold: u32,
    pub max_fetch_window: usize,
    pub adapter_timeout_secs: u64,
    pub user_agent: String,
    pub tgstat_api_token: Option<String>,
    pub tgstat_base_url: String,
    pub mastodon_base_url: String,
    pub mastodon_access_token: Option<String>,
    pub bluesky_base_url: String,
    /// Bearer tokens accepted by the admin routes.
    pub admin_api_keys: Vec<String>,
}

impl AppConfig {
    #[must_use]
    pub fn search_deadline(&self) -> Duration {
        Duration::from_millis(self.search_deadline_ms)
    }

    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("search_deadline_ms", &self.search_deadline_ms)
            .field("cache_enabled", &self.cache_enabled)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("cache_max_entries", &self.cache_max_entries)
            .field("unhealthy_threshold", &self.unhealthy_threshold)
            .field("max_fetch_window", &self.max_fetch_window)
            .field("adapter_timeout_secs", &self.adapter_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field(
                "tgstat_api_token",
                &self.tgstat_api_token.as_ref().map(|_| "[redacted]"),
            )
            .field("tgstat_base_url", &self.tgstat_base_url)
            .field("mastodon_base_url", &self.mastodon_base_url)
            .field(
                "mastodon_access_token",
                &self.mastodon_access_token.as_ref().map(|_| "[redacted]"),
            )
            .field("bluesky_base_url", &self.bluesky_base_url)
            .field(
                "admin_api_keys",
                &format_args!("[{} redacted]", self.admin_api_keys.len()),
            )
            .finish()
    }
}
