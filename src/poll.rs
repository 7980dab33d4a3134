//! Round-robin feed refresh.
//!
//! Each refresh tick takes the next URL from the [`FeedCycle`] and runs the
//! fetch on the tokio blocking pool, so a slow server never stalls the
//! animation.  The finished snapshot comes back to the event loop over an
//! [`mpsc`] channel as [`Msg::Snapshot`], tagged with a sequence number so the
//! app can discard a result that was overtaken by a newer one.
//!
//! There is no back-pressure: if a fetch is still running when the next tick
//! fires, both are left in flight and the ticker keeps showing the last
//! snapshot it has.

use std::sync::mpsc;
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::debug;

use crate::app::Msg;
use crate::source::HeadlineSource;

/// Circular list of feed URLs with a cursor.
#[derive(Debug, Clone)]
pub struct FeedCycle {
    urls: Vec<String>,
    cursor: usize,
}

impl FeedCycle {
    /// `None` if no usable URL was given.
    pub fn new<I, S>(urls: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let urls: Vec<String> = urls
            .into_iter()
            .map(Into::into)
            .filter(|u: &String| !u.trim().is_empty())
            .collect();
        if urls.is_empty() {
            return None;
        }
        Some(Self { urls, cursor: 0 })
    }

    /// Return the URL under the cursor, then advance (wrapping).
    pub fn next_url(&mut self) -> &str {
        let index = self.cursor;
        self.cursor = (self.cursor + 1) % self.urls.len();
        &self.urls[index]
    }
}

/// Issues fetches for the feed cycle.
pub struct Refresher {
    cycle: FeedCycle,
    source: Arc<dyn HeadlineSource>,
    runtime: Handle,
    tx: mpsc::Sender<Msg>,
    seq: u64,
}

impl Refresher {
    pub fn new(
        cycle: FeedCycle,
        source: Arc<dyn HeadlineSource>,
        runtime: Handle,
        tx: mpsc::Sender<Msg>,
    ) -> Self {
        Self {
            cycle,
            source,
            runtime,
            tx,
            seq: 0,
        }
    }

    /// Start fetching the next feed.  Returns the sequence number the result
    /// will carry.
    pub fn tick(&mut self) -> u64 {
        self.seq += 1;
        let seq = self.seq;
        let url = self.cycle.next_url().to_string();
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();

        debug!(seq, %url, "refresh started");
        self.runtime.spawn_blocking(move || {
            let snapshot = source.fetch(&url);
            // If the receiver is gone the event loop has exited.
            let _ = tx.send(Msg::Snapshot { seq, snapshot });
        });
        seq
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
