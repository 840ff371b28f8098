use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{CoreError, Platform};

/// One normalized account hit from a single platform.
///
/// `(platform, platform_account_id)` is the natural key: an aggregated page
/// never contains two entries with the same pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountResult {
    pub platform: Platform,
    pub platform_account_id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub profile_url: Option<String>,
    #[serde(default)]
    pub follower_count: u64,
}

impl AccountResult {
    /// Creates a hit with only its natural key set.
    #[must_use]
    pub fn new(platform: Platform, platform_account_id: impl Into<String>) -> Self {
        Self {
            platform,
            platform_account_id: platform_account_id.into(),
            name: None,
            description: None,
            avatar_url: None,
            profile_url: None,
            follower_count: 0,
        }
    }

    #[must_use]
    pub fn key(&self) -> (Platform, &str) {
        (self.platform, self.platform_account_id.as_str())
    }

    #[must_use]
    pub fn account_id(&self) -> AccountId {
        AccountId {
            platform: self.platform,
            platform_account_id: self.platform_account_id.clone(),
        }
    }
}

/// Globally unique account reference of the form `<platform>:<platform_account_id>`.
///
/// Only the first `:` separates the two halves, so platform ids that contain
/// colons (Bluesky DIDs such as `did:plc:abc`) round-trip intact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountId {
    pub platform: Platform,
    pub platform_account_id: String,
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.platform, self.platform_account_id)
    }
}

impl FromStr for AccountId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (platform, id) = s
            .split_once(':')
            .ok_or_else(|| CoreError::InvalidAccountId(s.to_string()))?;
        if id.trim().is_empty() {
            return Err(CoreError::InvalidAccountId(s.to_string()));
        }
        Ok(Self {
            platform: platform.parse()?,
            platform_account_id: id.to_string(),
        })
    }
}
