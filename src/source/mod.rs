//! Feed access layer.
//!
//! This module defines the [`HeadlineSource`] trait and the shared
//! [`HeadlineItem`] / [`FeedSnapshot`] types.  The HTTP implementation lives
//! in [`http`], and the format-agnostic XML handling in [`normalize`].
//!
//! ```text
//!  url ──► HttpSource::fetch ──► bytes ──► normalize ──► FeedSnapshot
//!                 │                              │
//!                 └──── FeedError ───────────────┴──► placeholder snapshot
//! ```

mod headline;
mod http;
mod normalize;

pub use headline::{FeedSnapshot, HeadlineItem, NO_HEADLINES};
pub use http::HttpSource;
pub use normalize::parse_feed;

/// Anything that can turn a feed URL into a snapshot.
///
/// The refresher calls [`fetch()`](HeadlineSource::fetch) on the blocking
/// pool, never on the thread that drives the animation, so implementations
/// may block for as long as their timeout allows.  They must not fail: every
/// error becomes a one-line placeholder snapshot.
pub trait HeadlineSource: Send + Sync {
    fn fetch(&self, url: &str) -> FeedSnapshot;
}
