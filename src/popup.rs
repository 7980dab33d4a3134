//! Detail popup listing the current snapshot's headlines.
//!
//! Rows exist as soon as the popup opens; thumbnails trickle in afterwards.
//! Every popup gets a generation number so thumbnails fetched for a popup
//! that has since been closed (or reopened) are dropped on arrival.

use crate::source::{FeedSnapshot, HeadlineItem};
use crate::thumbnail::Thumbnail;

#[derive(Debug, Clone, PartialEq)]
pub enum ThumbState {
    /// Fetch in flight.
    Pending,
    Ready(Thumbnail),
    /// No link, or enrichment failed.
    None,
}

#[derive(Debug, Clone)]
pub struct PopupRow {
    pub item: HeadlineItem,
    pub thumb: ThumbState,
}

/// A thumbnail fetch the main loop should start for a popup row.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EnrichJob {
    pub generation: u64,
    pub row: usize,
    pub link: String,
}

#[derive(Debug, Clone)]
pub struct Popup {
    generation: u64,
    pub source: String,
    pub rows: Vec<PopupRow>,
    selected: usize,
}

impl Popup {
    pub fn open(snapshot: &FeedSnapshot, generation: u64) -> Self {
        let rows = snapshot
            .items
            .iter()
            .map(|item| PopupRow {
                item: item.clone(),
                thumb: if item.link.is_some() {
                    ThumbState::Pending
                } else {
                    ThumbState::None
                },
            })
            .collect();

        Self {
            generation,
            source: snapshot.source.clone(),
            rows,
            selected: 0,
        }
    }

    #[cfg(test)]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// One job per linked row.
    pub fn enrich_jobs(&self) -> Vec<EnrichJob> {
        self.rows
            .iter()
            .enumerate()
            .filter_map(|(row, r)| {
                r.item.link.as_ref().map(|link| EnrichJob {
                    generation: self.generation,
                    row,
                    link: link.clone(),
                })
            })
            .collect()
    }

    /// Store a finished fetch.  Results for another generation are ignored.
    pub fn set_thumbnail(&mut self, generation: u64, row: usize, thumb: Option<Thumbnail>) -> bool {
        if generation != self.generation {
            return false;
        }
        match self.rows.get_mut(row) {
            Some(r) => {
                r.thumb = thumb.map_or(ThumbState::None, ThumbState::Ready);
                true
            }
            None => false,
        }
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn select(&mut self, row: usize) {
        if row < self.rows.len() {
            self.selected = row;
        }
    }

    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1).min(self.rows.len().saturating_sub(1));
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn link_at(&self, row: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.item.link.as_deref())
    }

    pub fn selected_link(&self) -> Option<&str> {
        self.link_at(self.selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    fn snapshot() -> FeedSnapshot {
        FeedSnapshot::new(
            "https://example.com/feed",
            vec![
                HeadlineItem::new("Linked", Some("https://example.com/1".into())).unwrap(),
                HeadlineItem::new("Unlinked", None).unwrap(),
                HeadlineItem::new("Also linked", Some("https://example.com/3".into())).unwrap(),
            ],
        )
    }

    fn thumb() -> Thumbnail {
        Thumbnail::from_image(DynamicImage::ImageRgb8(RgbImage::new(8, 8)))
    }

    #[test]
    fn rows_mirror_snapshot() {
        let popup = Popup::open(&snapshot(), 1);

        assert_eq!(popup.rows.len(), 3);
        assert_eq!(popup.rows[1].item.text, "Unlinked");
        assert_eq!(popup.rows[0].thumb, ThumbState::Pending);
        assert_eq!(popup.rows[1].thumb, ThumbState::None);
        assert_eq!(popup.source, "https://example.com/feed");
    }

    #[test]
    fn jobs_only_for_linked_rows() {
        let popup = Popup::open(&snapshot(), 7);
        let jobs = popup.enrich_jobs();

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].row, 0);
        assert_eq!(jobs[1].row, 2);
        assert!(jobs.iter().all(|j| j.generation == 7));
    }

    #[test]
    fn failed_enrichment_leaves_text_row() {
        let mut popup = Popup::open(&snapshot(), 1);

        assert!(popup.set_thumbnail(1, 0, None));
        assert!(popup.set_thumbnail(1, 2, Some(thumb())));

        assert_eq!(popup.rows[0].thumb, ThumbState::None);
        assert_eq!(popup.rows[0].item.text, "Linked");
        assert!(matches!(popup.rows[2].thumb, ThumbState::Ready(_)));
    }

    #[test]
    fn stale_generation_is_ignored() {
        let mut popup = Popup::open(&snapshot(), 2);

        assert!(!popup.set_thumbnail(1, 0, Some(thumb())));
        assert!(!popup.set_thumbnail(2, 99, Some(thumb())));
        assert_eq!(popup.rows[0].thumb, ThumbState::Pending);
    }

    #[test]
    fn selection_is_clamped() {
        let mut popup = Popup::open(&snapshot(), 1);

        popup.select_previous();
        assert_eq!(popup.selected(), 0);
        assert_eq!(popup.selected_link(), Some("https://example.com/1"));

        popup.select_next();
        assert_eq!(popup.selected_link(), None);
        popup.select_next();
        popup.select_next();
        assert_eq!(popup.selected(), 2);

        popup.select(10);
        assert_eq!(popup.selected(), 2);
    }
}
