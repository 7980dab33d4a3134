//! Error kinds for the two network-facing pipelines.
//!
//! Neither type ever escapes to the user as a crash: [`FeedError`] is turned
//! into a placeholder headline by the fetcher, and [`ThumbnailError`] is
//! swallowed by the popup enrichment step.

/// Why a feed could not produce headlines.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// Timeout, connection refused, DNS failure, body read failure.
    #[error("{0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected status code: {0}")]
    HttpStatus(u16),

    /// The body was not well-formed XML.
    #[error("{0}")]
    Parse(#[from] roxmltree::Error),

    /// The document parsed but held no usable `<item>`/`<entry>` text.
    #[error("no headlines found")]
    Empty,
}

/// Why a popup row ended up without a thumbnail.
#[derive(Debug, thiserror::Error)]
pub enum ThumbnailError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected status code: {0}")]
    HttpStatus(u16),

    #[error("invalid url: {0}")]
    BadUrl(String),

    #[error("page has no og:image tag")]
    MissingTag,

    #[error("not an image: {0}")]
    NotAnImage(String),

    #[error("decode failed: {0}")]
    Decode(#[from] image::ImageError),
}
