use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// External content platforms that creatorhub can search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Telegram,
    Mastodon,
    Bluesky,
}

/// Broad category of a platform, surfaced by the supported-platforms endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformKind {
    Messaging,
    Microblog,
    ShortPost,
}

/// Metadata describing one registered platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformInfo {
    pub platform: Platform,
    pub display_name: &'static str,
    pub kind: PlatformKind,
    pub healthy: bool,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Telegram, Platform::Mastodon, Platform::Bluesky];

    /// Stable wire key used in query strings, cache keys and account ids.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Telegram => "telegram",
            Platform::Mastodon => "mastodon",
            Platform::Bluesky => "bluesky",
        }
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Platform::Telegram => "Telegram",
            Platform::Mastodon => "Mastodon",
            Platform::Bluesky => "Bluesky",
        }
    }

    #[must_use]
    pub fn kind(self) -> PlatformKind {
        match self {
            Platform::Telegram => PlatformKind::Messaging,
            Platform::Mastodon => PlatformKind::Microblog,
            Platform::Bluesky => PlatformKind::ShortPost,
        }
    }

    #[must_use]
    pub fn info(self, healthy: bool) -> PlatformInfo {
        PlatformInfo {
            platform: self,
            display_name: self.display_name(),
            kind: self.kind(),
            healthy,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = CoreError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == key)
            .ok_or_else(|| CoreError::UnknownPlatform(s.trim().to_string()))
    }
}
