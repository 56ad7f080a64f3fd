//! Query cache layer between `mebelplace-api` and its consumers.
//!
//! - **[`QueryCache`]**: key-addressed, type-erased cache on `DashMap`.
//!   Fresh entries are served without a call; [`invalidate`](QueryCache::invalidate)
//!   marks a whole key family stale and the next read refetches. Per-key
//!   generations make "latest request wins" hold under out-of-order
//!   responses, and [`read_until`](QueryCache::read_until) discards results
//!   whose interest was cancelled.
//!
//! - **[`QueryClient`]**: the cache bound to an [`ApiClient`](mebelplace_api::ApiClient),
//!   with session-aware login/logout.
//!
//! - **[`keys`]**: key factories per family (`requests`, `videos`, `chats`, ...).

pub mod cache;
pub mod client;
pub mod error;
pub mod keys;

pub use cache::{EntryState, KeyPart, QueryCache, QueryKey};
pub use client::QueryClient;
pub use error::CoreError;
pub use keys::Family;
