//! Platform adapters for creatorhub.
//!
//! Each adapter wraps one external platform behind the [`PlatformAdapter`]
//! contract: keyword account search and single-account lookup. HTTP details
//! stay private to each adapter; callers only see normalized
//! [`AccountResult`](creatorhub_core::AccountResult) values and classified
//! [`AdapterError`]s.

pub mod adapter;
pub mod bluesky;
pub mod error;
pub mod mastodon;
pub mod static_adapter;
pub mod telegram;

mod http;

pub use adapter::{PlatformAdapter, SearchPage};
pub use bluesky::BlueskyAdapter;
pub use error::AdapterError;
pub use mastodon::MastodonAdapter;
pub use static_adapter::StaticAdapter;
pub use telegram::TelegramAdapter;
