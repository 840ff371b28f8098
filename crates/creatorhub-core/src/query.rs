use serde::Serialize;

use crate::Platform;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// One inbound search request, normalized.
///
/// Built per request and never persisted. `platforms` keeps the caller's
/// order (it drives the merge tie-break) with duplicates removed; an empty
/// list means every registered platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    pub keyword: String,
    pub platforms: Vec<Platform>,
    pub page: u32,
    pub page_size: u32,
}

impl SearchQuery {
    /// Builds a normalized query.
    ///
    /// The keyword is trimmed (an empty keyword is a valid browse-all query),
    /// `page` is raised to at least 1 and `page_size` is clamped to
    /// `1..=MAX_PAGE_SIZE`.
    #[must_use]
    pub fn new(
        keyword: impl Into<String>,
        platforms: impl IntoIterator<Item = Platform>,
        page: u32,
        page_size: u32,
    ) -> Self {
        let mut ordered: Vec<Platform> = Vec::new();
        for platform in platforms {
            if !ordered.contains(&platform) {
                ordered.push(platform);
            }
        }

        Self {
            keyword: keyword.into().trim().to_string(),
            platforms: ordered,
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    #[must_use]
    pub fn all_platforms(&self) -> bool {
        self.platforms.is_empty()
    }

    /// Zero-based index of the first item on the requested page.
    #[must_use]
    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.page_size as usize
    }

    /// Number of leading items each adapter must supply so that the merged
    /// sequence is complete up to the end of the requested page.
    #[must_use]
    pub fn fetch_window(&self) -> usize {
        self.page as usize * self.page_size as usize
    }
}

/// Splits a comma-separated platform list into known platforms and the raw
/// keys that did not match any platform.
#[must_use]
pub fn parse_platform_list(raw: &str) -> (Vec<Platform>, Vec<String>) {
    let mut known = Vec::new();
    let mut unknown = Vec::new();

    for key in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match key.parse::<Platform>() {
            Ok(platform) => known.push(platform),
            Err(_) => unknown.push(key.to_string()),
        }
    }

    (known, unknown)
}
