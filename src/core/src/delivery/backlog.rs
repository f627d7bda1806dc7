//! Ordered holding area for attempts the store has not accepted yet.

use std::collections::vec_deque::{self, VecDeque};

use log::warn;

use crate::capture::Attempt;

/// FIFO of undelivered attempts.
///
/// Entries are appended at the tail and only ever removed from the head, so
/// the relative order of what remains is the order of arrival. The backlog
/// is unbounded unless built with [`Backlog::bounded`], in which case a push
/// onto a full backlog evicts the oldest entry and counts it as dropped.
#[derive(Debug, Default)]
pub struct Backlog {
    entries: VecDeque<Attempt>,
    capacity: Option<usize>,
    dropped: u64,
}

impl Backlog {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn bounded(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: Some(capacity.max(1)),
            dropped: 0,
        }
    }

    pub fn with_capacity(capacity: Option<usize>) -> Self {
        match capacity {
            Some(c) => Self::bounded(c),
            None => Self::unbounded(),
        }
    }

    /// Appends `attempt` at the tail. Returns the evicted head, if any.
    pub fn push(&mut self, attempt: Attempt) -> Option<Attempt> {
        let evicted = match self.capacity {
            Some(cap) if self.entries.len() >= cap => {
                self.dropped += 1;
                let oldest = self.entries.pop_front();
                if let Some(ref a) = oldest {
                    warn!(
                        "Backlog full ({} entries), dropping attempt from {} at {}",
                        cap, a.origin, a.timestamp
                    );
                }
                oldest
            }
            _ => None,
        };
        self.entries.push_back(attempt);
        evicted
    }

    pub fn front(&self) -> Option<&Attempt> {
        self.entries.front()
    }

    /// Removes the head once it has been written.
    pub fn pop_front(&mut self) -> Option<Attempt> {
        self.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Number of attempts evicted because the backlog was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn iter(&self) -> vec_deque::Iter<'_, Attempt> {
        self.entries.iter()
    }
}
