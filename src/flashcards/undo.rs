//! Single-review undo
//!
//! A snapshot is captured right before a rating is committed. Undo pops the
//! most recent one; the caller restores the card from it and re-persists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::models::{MemorySnapshot, Rating, ReviewLogEntry, ReviewStats, SessionStats};

/// Everything one rating mutates, as it was before the rating
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSnapshot {
    /// Position of the card in the session queue
    pub card_index: usize,
    pub card_id: Uuid,
    pub memory_before: MemorySnapshot,
    pub history_before: Vec<ReviewLogEntry>,
    pub updated_at_before: DateTime<Utc>,
    pub stats_before: ReviewStats,
    pub session_stats_before: SessionStats,
    /// Session step index, `None` if the card was unseen this session
    pub step_index_before: Option<usize>,
    pub rating_applied: Rating,
    pub applied_at: DateTime<Utc>,
}

/// LIFO stack of review snapshots for one session
#[derive(Debug, Clone, Default)]
pub struct ReviewUndoStack {
    snapshots: Vec<ReviewSnapshot>,
}

impl ReviewUndoStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, snapshot: ReviewSnapshot) {
        self.snapshots.push(snapshot);
    }

    /// Pop the most recent snapshot, `None` when there is nothing to undo
    pub fn undo(&mut self) -> Option<ReviewSnapshot> {
        self.snapshots.pop()
    }

    pub fn can_undo(&self) -> bool {
        !self.snapshots.is_empty()
    }

    pub fn peek(&self) -> Option<&ReviewSnapshot> {
        self.snapshots.last()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Drop every snapshot at session end
    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snapshot(card_index: usize) -> ReviewSnapshot {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        ReviewSnapshot {
            card_index,
            card_id: Uuid::new_v4(),
            memory_before: MemorySnapshot::new(now),
            history_before: Vec::new(),
            updated_at_before: now,
            stats_before: ReviewStats::default(),
            session_stats_before: SessionStats::new(now),
            step_index_before: None,
            rating_applied: Rating::Good,
            applied_at: now,
        }
    }

    #[test]
    fn test_empty_stack() {
        let mut stack = ReviewUndoStack::new();
        assert!(!stack.can_undo());
        assert!(stack.undo().is_none());
        assert!(stack.is_empty());
    }

    #[test]
    fn test_undo_is_lifo() {
        let mut stack = ReviewUndoStack::new();
        let (s1, s2, s3) = (snapshot(0), snapshot(1), snapshot(2));
        stack.push(s1.clone());
        stack.push(s2.clone());
        stack.push(s3.clone());
        assert_eq!(stack.peek(), Some(&s3));

        assert_eq!(stack.undo(), Some(s3));
        assert_eq!(stack.undo(), Some(s2));
        assert_eq!(stack.undo(), Some(s1));
        assert_eq!(stack.undo(), None);
    }

    #[test]
    fn test_push_back_restores_availability() {
        let mut stack = ReviewUndoStack::new();
        stack.push(snapshot(0));
        let popped = stack.undo().unwrap();
        assert!(!stack.can_undo());

        stack.push(popped);
        assert!(stack.can_undo());
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut stack = ReviewUndoStack::new();
        stack.push(snapshot(0));
        stack.push(snapshot(1));
        stack.clear();
        assert!(!stack.can_undo());
        assert_eq!(stack.len(), 0);
    }
}
