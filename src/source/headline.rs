//! The data types shared by the fetcher, the ticker, and the popup.
//!
//! A [`FeedSnapshot`] is what one refresh produces.  It is never empty: when
//! a feed fails or yields nothing usable, the snapshot carries a single
//! placeholder [`HeadlineItem`] whose text explains why, so the ticker always
//! has something to scroll.

use chrono::{DateTime, Utc};

/// Separator placed between headlines on the scrolling strip.
pub const SEPARATOR: &str = " | ";

/// Text shown when a feed parsed but contained no usable headlines.
pub const NO_HEADLINES: &str = "No headlines found";

/// One headline, normalised from an RSS `<item>` or Atom `<entry>`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct HeadlineItem {
    /// Trimmed headline text.  Never empty.
    pub text: String,

    /// Link to the article, when the feed provided one.
    pub link: Option<String>,
}

impl HeadlineItem {
    /// Build an item, rejecting blank text.
    pub fn new(text: impl Into<String>, link: Option<String>) -> Option<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return None;
        }
        Some(Self { text, link })
    }
}

/// The immutable headline set captured by one refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSnapshot {
    /// Headlines in document order.  Always at least one entry.
    pub items: Vec<HeadlineItem>,

    /// URL the headlines were fetched from.
    pub source: String,

    pub fetched_at: DateTime<Utc>,
}

impl FeedSnapshot {
    /// Wrap fetched items.  An empty list collapses to the
    /// [`NO_HEADLINES`] placeholder.
    pub fn new(source: impl Into<String>, items: Vec<HeadlineItem>) -> Self {
        let source = source.into();
        if items.is_empty() {
            return Self::placeholder(source, NO_HEADLINES);
        }
        Self {
            items,
            source,
            fetched_at: Utc::now(),
        }
    }

    /// A snapshot holding one link-less line of text.
    pub fn placeholder(source: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let text = if text.trim().is_empty() {
            NO_HEADLINES.to_string()
        } else {
            text
        };
        Self {
            items: vec![HeadlineItem { text, link: None }],
            source: source.into(),
            fetched_at: Utc::now(),
        }
    }

    /// Headline texts joined with [`SEPARATOR`], as drawn on the strip.
    pub fn joined(&self) -> String {
        self.texts().join(SEPARATOR)
    }

    pub fn texts(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.text.as_str()).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
