//! Data models for the review scheduler

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Learner's self-assessed recall quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
pub enum Rating {
    /// Failed to recall
    Again = 1,
    /// Recalled with serious difficulty
    Hard = 2,
    /// Recalled after hesitation
    Good = 3,
    /// Perfect recall
    Easy = 4,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    /// Numeric grade (1-4) used by the memory model formulas
    pub fn grade(self) -> u8 {
        self as u8
    }

    pub fn is_correct(self) -> bool {
        self != Rating::Again
    }
}

impl TryFrom<u8> for Rating {
    type Error = u8;

    /// Map a UI rating (1-4: Again, Hard, Good, Easy)
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Rating::Again),
            2 => Ok(Rating::Hard),
            3 => Ok(Rating::Good),
            4 => Ok(Rating::Easy),
            other => Err(other),
        }
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.grade()
    }
}

/// Status of a card in the spaced repetition system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum CardStatus {
    /// Never reviewed
    #[default]
    New,
    /// In initial learning phase
    Learning,
    /// Regular spaced review
    Review,
    /// Failed and re-learning
    Relearning,
}

impl CardStatus {
    /// Whether the learning step ladders govern this status
    pub fn uses_steps(self) -> bool {
        !matches!(self, CardStatus::Review)
    }
}

/// Memory-model state of a card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySnapshot {
    /// When the card is next due
    pub due: DateTime<Utc>,
    /// Days for retrievability to fall to 90%
    #[serde(default)]
    pub stability: f64,
    /// 0-10, higher is harder
    #[serde(default)]
    pub difficulty: f64,
    /// Days between the last two reviews
    #[serde(default)]
    pub elapsed_days: f64,
    /// Days between the last review and `due`
    #[serde(default)]
    pub scheduled_days: f64,
    #[serde(default)]
    pub reps: u32,
    #[serde(default)]
    pub lapses: u32,
    #[serde(default)]
    pub state: CardStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_review: Option<DateTime<Utc>>,
    /// Recall probability at the last review
    #[serde(default)]
    pub retrievability: f64,
}

impl MemorySnapshot {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            due: now,
            stability: 0.0,
            difficulty: 0.0,
            elapsed_days: 0.0,
            scheduled_days: 0.0,
            reps: 0,
            lapses: 0,
            state: CardStatus::New,
            last_review: None,
            retrievability: 0.0,
        }
    }

    /// Check if the card is due at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.due
    }
}

/// A record of a single review, appended to the card history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewLogEntry {
    pub rating: Rating,
    /// Status the card was in when it was rated
    pub state: CardStatus,
    /// When the review occurred
    pub timestamp: DateTime<Utc>,
    pub elapsed_days: f64,
    pub scheduled_days: f64,
    pub stability: f64,
    pub difficulty: f64,
}

/// A schedulable card: identity, memory state and review history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCard {
    pub id: Uuid,
    pub deck_id: Uuid,
    pub memory: MemorySnapshot,
    #[serde(default)]
    pub history: Vec<ReviewLogEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReviewCard {
    pub fn new(deck_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            deck_id,
            memory: MemorySnapshot::new(now),
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Daily review counters, persisted alongside the cards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub reviews_today: usize,
    pub correct_today: usize,
    pub lapses_today: usize,
    pub streak_days: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_review_date: Option<NaiveDate>,
}

impl ReviewStats {
    /// Count one review, rolling counters over on a new day
    pub fn record(&mut self, rating: Rating, lapsed: bool, now: DateTime<Utc>) {
        let today = now.date_naive();

        match self.last_review_date {
            Some(day) if day == today => {}
            Some(day) => {
                self.reviews_today = 0;
                self.correct_today = 0;
                self.lapses_today = 0;
                self.streak_days = if day.succ_opt() == Some(today) {
                    self.streak_days + 1
                } else {
                    1
                };
            }
            None => self.streak_days = 1,
        }
        self.last_review_date = Some(today);

        self.reviews_today += 1;
        if rating.is_correct() {
            self.correct_today += 1;
        }
        if lapsed {
            self.lapses_today += 1;
        }
    }
}

/// Counters for one study session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub started_at: DateTime<Utc>,
    pub reviewed: usize,
    pub again: usize,
    pub hard: usize,
    pub good: usize,
    pub easy: usize,
    /// Cards that reached Review during the session
    pub graduated: usize,
}

impl SessionStats {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            reviewed: 0,
            again: 0,
            hard: 0,
            good: 0,
            easy: 0,
            graduated: 0,
        }
    }

    pub fn record(&mut self, rating: Rating, graduated: bool) {
        self.reviewed += 1;
        match rating {
            Rating::Again => self.again += 1,
            Rating::Hard => self.hard += 1,
            Rating::Good => self.good += 1,
            Rating::Easy => self.easy += 1,
        }
        if graduated {
            self.graduated += 1;
        }
    }
}
