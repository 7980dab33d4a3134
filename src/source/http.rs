//! HTTP feed source.
//!
//! Fetches a feed document with a blocking [`reqwest`] client and hands the
//! body to [`parse_feed`](super::parse_feed).  Any failure is folded into the
//! returned snapshot as readable text, so the ticker shows the problem
//! instead of going blank.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use super::{parse_feed, FeedSnapshot, HeadlineItem, HeadlineSource, NO_HEADLINES};
use crate::error::FeedError;

const USER_AGENT: &str = concat!("liveline/", env!("CARGO_PKG_VERSION"));

/// Feed source backed by a blocking HTTP client.
pub struct HttpSource {
    client: reqwest::blocking::Client,
    /// Maximum headlines kept per snapshot.
    limit: usize,
}

impl HttpSource {
    /// Create a source whose requests give up after `timeout`.
    ///
    /// Must be called outside an async context: the blocking client owns its
    /// own runtime thread.
    pub fn new(timeout: Duration, limit: usize) -> Result<Self, FeedError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, limit })
    }

    /// Fetch and normalise, surfacing the failure kind.
    pub fn try_fetch(&self, url: &str) -> Result<Vec<HeadlineItem>, FeedError> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::HttpStatus(status.as_u16()));
        }
        let charset = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(charset_param)
            .map(String::from);
        let body = response.bytes()?;
        debug!(url, bytes = body.len(), charset = ?charset, "feed downloaded");
        parse_feed(&body, charset.as_deref(), self.limit)
    }
}

/// The `charset` parameter of a `Content-Type` value.
fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then_some(value.trim().trim_matches('"'))
    })
}

impl HeadlineSource for HttpSource {
    fn fetch(&self, url: &str) -> FeedSnapshot {
        match self.try_fetch(url) {
            Ok(items) => FeedSnapshot::new(url, items),
            Err(FeedError::Empty) => FeedSnapshot::placeholder(url, NO_HEADLINES),
            Err(e) => {
                warn!(url, error = %e, "feed fetch failed");
                FeedSnapshot::placeholder(url, format!("Error fetching {url}: {e}"))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
