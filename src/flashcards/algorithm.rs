//! Memory model for spaced repetition
//!
//! The scheduler only depends on the [`MemoryModel`] contract. The default
//! implementation is FSRS-5 with its published default weights: stability
//! is the number of days until recall probability drops to 90%, difficulty
//! ranges from 1 to 10.
//!
//! Ratings map to FSRS grades:
//! - 1: Again, failed recall
//! - 2: Hard, recalled with serious difficulty
//! - 3: Good, recalled after hesitation
//! - 4: Easy, perfect recall

use chrono::{DateTime, Duration, Utc};

use super::config::FsrsSettings;
use super::models::{CardStatus, MemorySnapshot, Rating, ReviewLogEntry};

const MS_PER_MINUTE: f64 = 60_000.0;
const MS_PER_DAY: f64 = 86_400_000.0;

/// Forgetting curve exponent
const DECAY: f64 = -0.5;

/// Chosen so that R(S, S) = 0.9
const FACTOR: f64 = 19.0 / 81.0;

/// Lower bound for stability
const MIN_STABILITY: f64 = 0.01;

/// FSRS-5 default parameters
pub const DEFAULT_WEIGHTS: [f64; 19] = [
    0.40255, 1.18385, 3.173, 15.69105, 7.1949, 0.5345, 1.4604, 0.0046, 1.54575, 0.1192,
    1.01925, 1.9395, 0.11, 0.29605, 2.2698, 0.2315, 2.9898, 0.51655, 0.6621,
];

/// Delay proposed after a lapse from Review
const LAPSE_DELAY_MINUTES: f64 = 5.0;

/// A substitutable memory model
///
/// Implementations must be pure: identical inputs yield identical outputs.
/// `reps` never decreases and `lapses` only increases when a card in
/// Review receives [`Rating::Again`]. The proposed `due` and
/// `scheduled_days` are advisory for cards outside Review.
pub trait MemoryModel {
    fn review(
        &self,
        snapshot: &MemorySnapshot,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> (MemorySnapshot, ReviewLogEntry);
}

/// Days between the last review and `now`, 0 for a first review
pub fn elapsed_days(last_review: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    match last_review {
        Some(last) => (now.signed_duration_since(last).num_milliseconds() as f64 / MS_PER_DAY).max(0.0),
        None => 0.0,
    }
}

/// `now` plus a (non-negative) number of days, rounded to whole milliseconds
pub fn add_days(now: DateTime<Utc>, days: f64) -> DateTime<Utc> {
    add_millis(now, days * MS_PER_DAY)
}

/// `now` plus a (non-negative) number of minutes, rounded to whole milliseconds
pub fn add_minutes(now: DateTime<Utc>, minutes: f64) -> DateTime<Utc> {
    add_millis(now, minutes * MS_PER_MINUTE)
}

fn add_millis(now: DateTime<Utc>, millis: f64) -> DateTime<Utc> {
    // NaN and negatives collapse to zero; `as` saturates on overflow
    let millis = if millis.is_finite() { millis.max(0.0).round() as i64 } else { 0 };
    Duration::try_milliseconds(millis)
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// FSRS-5 memory model
#[derive(Debug, Clone, PartialEq)]
pub struct Fsrs {
    weights: [f64; 19],
    desired_retention: f64,
    maximum_interval: u32,
}

impl Default for Fsrs {
    fn default() -> Self {
        Self::from_settings(&FsrsSettings::default())
    }
}

impl Fsrs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &FsrsSettings) -> Self {
        Self {
            weights: DEFAULT_WEIGHTS,
            desired_retention: settings.desired_retention.clamp(0.01, 0.99),
            maximum_interval: settings.maximum_interval.max(1),
        }
    }

    /// Use optimizer-produced weights instead of the defaults
    pub fn with_weights(mut self, weights: [f64; 19]) -> Self {
        self.weights = weights;
        self
    }

    /// Probability of recall after `elapsed_days` at `stability`
    pub fn retrievability(&self, elapsed_days: f64, stability: f64) -> f64 {
        if stability <= 0.0 {
            return 0.0;
        }
        (1.0 + FACTOR * elapsed_days / stability).powf(DECAY)
    }

    /// Whole-day interval at which recall probability reaches the target
    pub fn next_interval(&self, stability: f64) -> f64 {
        let raw = stability / FACTOR * (self.desired_retention.powf(1.0 / DECAY) - 1.0);
        raw.round().clamp(1.0, self.maximum_interval as f64)
    }

    fn init_stability(&self, rating: Rating) -> f64 {
        self.weights[rating.grade() as usize - 1].max(MIN_STABILITY)
    }

    fn raw_init_difficulty(&self, rating: Rating) -> f64 {
        let w = &self.weights;
        w[4] - (w[5] * (rating.grade() as f64 - 1.0)).exp() + 1.0
    }

    fn init_difficulty(&self, rating: Rating) -> f64 {
        self.raw_init_difficulty(rating).clamp(1.0, 10.0)
    }

    fn next_difficulty(&self, difficulty: f64, rating: Rating) -> f64 {
        let w = &self.weights;
        let delta = -w[6] * (rating.grade() as f64 - 3.0);
        let damped = difficulty + delta * (10.0 - difficulty) / 9.0;
        let reverted = w[7] * self.raw_init_difficulty(Rating::Easy) + (1.0 - w[7]) * damped;
        reverted.clamp(1.0, 10.0)
    }

    fn short_term_stability(&self, stability: f64, rating: Rating) -> f64 {
        let w = &self.weights;
        stability * (w[17] * (rating.grade() as f64 - 3.0 + w[18])).exp()
    }

    fn recall_stability(&self, difficulty: f64, stability: f64, r: f64, rating: Rating) -> f64 {
        let w = &self.weights;
        let hard_penalty = if rating == Rating::Hard { w[15] } else { 1.0 };
        let easy_bonus = if rating == Rating::Easy { w[16] } else { 1.0 };
        stability
            * (1.0
                + w[8].exp()
                    * (11.0 - difficulty)
                    * stability.powf(-w[9])
                    * ((w[10] * (1.0 - r)).exp() - 1.0)
                    * hard_penalty
                    * easy_bonus)
    }

    fn forget_stability(&self, difficulty: f64, stability: f64, r: f64) -> f64 {
        let w = &self.weights;
        let s = w[11]
            * difficulty.powf(-w[12])
            * ((stability + 1.0).powf(w[13]) - 1.0)
            * (w[14] * (1.0 - r)).exp();
        s.min(stability)
    }
}

impl MemoryModel for Fsrs {
    fn review(
        &self,
        snapshot: &MemorySnapshot,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> (MemorySnapshot, ReviewLogEntry) {
        let elapsed = elapsed_days(snapshot.last_review, now);

        let (stability, difficulty, retrievability) = match snapshot.state {
            CardStatus::New => (self.init_stability(rating), self.init_difficulty(rating), 0.0),
            _ => {
                let s = snapshot.stability.max(MIN_STABILITY);
                let d = if snapshot.difficulty > 0.0 {
                    snapshot.difficulty.clamp(1.0, 10.0)
                } else {
                    self.init_difficulty(Rating::Good)
                };
                let r = self.retrievability(elapsed, s);
                let next_s = if elapsed < 1.0 {
                    self.short_term_stability(s, rating)
                } else if rating == Rating::Again {
                    self.forget_stability(d, s, r)
                } else {
                    self.recall_stability(d, s, r, rating)
                };
                (
                    next_s.clamp(MIN_STABILITY, self.maximum_interval as f64),
                    self.next_difficulty(d, rating),
                    r,
                )
            }
        };

        let short = |state, minutes| (state, add_minutes(now, minutes), 0.0);
        let (state, due, scheduled_days) = match (snapshot.state, rating) {
            (CardStatus::Review, Rating::Again) => {
                short(CardStatus::Relearning, LAPSE_DELAY_MINUTES)
            }
            (CardStatus::Relearning, Rating::Again) => short(CardStatus::Relearning, 1.0),
            (CardStatus::Relearning, Rating::Hard) => short(CardStatus::Relearning, 5.0),
            (_, Rating::Again) => short(CardStatus::Learning, 1.0),
            (CardStatus::New | CardStatus::Learning, Rating::Hard) => {
                short(CardStatus::Learning, 5.0)
            }
            (CardStatus::New, Rating::Good) => short(CardStatus::Learning, 10.0),
            _ => {
                let interval = self.next_interval(stability);
                (CardStatus::Review, add_days(now, interval), interval)
            }
        };

        let lapsed = snapshot.state == CardStatus::Review && rating == Rating::Again;
        let next = MemorySnapshot {
            due,
            stability,
            difficulty,
            elapsed_days: elapsed,
            scheduled_days,
            reps: snapshot.reps.saturating_add(1),
            lapses: snapshot.lapses.saturating_add(u32::from(lapsed)),
            state,
            last_review: Some(now),
            retrievability,
        };
        let log = ReviewLogEntry {
            rating,
            state: snapshot.state,
            timestamp: now,
            elapsed_days: elapsed,
            scheduled_days,
            stability,
            difficulty,
        };

        (next, log)
    }
}

/// Format an interval in days to a human-readable string
pub fn format_interval(days: f64) -> String {
    let minutes = (days * 1440.0).round() as i64;
    if minutes <= 0 {
        return "now".to_string();
    }
    if minutes < 60 {
        return format!("{}m", minutes);
    }
    if minutes < 1440 {
        return format!("{}h", minutes / 60);
    }

    let days = days.round() as i64;
    if days < 7 {
        format!("{}d", days)
    } else if days < 30 {
        format!("{}w", days / 7)
    } else if days < 365 {
        format!("{}mo", days / 30)
    } else {
        format!("{}y", days / 365)
    }
}
