use std::collections::VecDeque;

use thiserror::Error;

/// A queued song: the title shown to users and the locator the resolver
/// turns back into a playable stream when the song reaches the head.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QueueEntry {
    pub title: String,
    pub source_url: String,
}

impl QueueEntry {
    pub fn new(title: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            source_url: source_url.into(),
        }
    }
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum QueueError {
    #[error("The queue is empty")]
    Empty,
    #[error("Could not find a queued song containing {0:?}")]
    NotFound(String),
}

/// Pending songs for one guild, in the order they were added.
#[derive(Debug, Default)]
pub struct TrackQueue {
    entries: VecDeque<QueueEntry>,
}

impl TrackQueue {
    pub fn push(&mut self, entry: QueueEntry) {
        self.entries.push_back(entry);
    }

    pub fn pop_front(&mut self) -> Result<QueueEntry, QueueError> {
        self.entries.pop_front().ok_or(QueueError::Empty)
    }

    /// Remove the first entry whose title contains `needle`, ignoring case.
    pub fn remove_first(&mut self, needle: &str) -> Result<QueueEntry, QueueError> {
        let needle_lower = needle.to_lowercase();
        let index = self
            .entries
            .iter()
            .position(|entry| entry.title.to_lowercase().contains(&needle_lower))
            .ok_or_else(|| QueueError::NotFound(needle.to_owned()))?;
        // `position` guarantees the index is in bounds.
        self.entries
            .remove(index)
            .ok_or_else(|| QueueError::NotFound(needle.to_owned()))
    }

    pub fn entries(&self) -> Vec<QueueEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
