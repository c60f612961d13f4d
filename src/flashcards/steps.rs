//! Learning step ladders
//!
//! While a card is New, Learning or Relearning its due date comes from a
//! fixed ladder of short delays (in minutes) rather than from the memory
//! model. Climbing past the last rung, or rating Easy, graduates the card to
//! Review. Cards already in Review are left to the memory model.

use chrono::{DateTime, Utc};

use super::algorithm::{add_days, add_minutes};
use super::config::StepLadderConfig;
use super::error::LadderKind;
use super::models::{CardStatus, Rating};

const MINUTES_PER_DAY: f64 = 1440.0;

/// Authoritative schedule for a card still on a step ladder
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub due: DateTime<Utc>,
    pub scheduled_days: f64,
    pub state: CardStatus,
    /// Step index to remember for the rest of the session
    pub step_index: usize,
}

impl StepOutcome {
    pub fn graduated(&self) -> bool {
        self.state == CardStatus::Review
    }
}

/// Schedule a rating against the step ladder.
///
/// Returns `None` when `prior` is Review: the memory model's schedule
/// stands. `step_index` is the card's position on the ladder this session
/// (0 if unseen) and is clamped before use.
pub fn schedule_step(
    prior: CardStatus,
    rating: Rating,
    config: &StepLadderConfig,
    step_index: usize,
    now: DateTime<Utc>,
) -> Option<StepOutcome> {
    let kind = match prior {
        CardStatus::Review => return None,
        CardStatus::Relearning => LadderKind::Relearning,
        CardStatus::New | CardStatus::Learning => LadderKind::Learning,
    };
    let ladder = config.ladder(kind);
    // A New card enters Learning on its first step
    let stepping = match kind {
        LadderKind::Learning => CardStatus::Learning,
        LadderKind::Relearning => CardStatus::Relearning,
    };
    let last = ladder.len().saturating_sub(1);

    let outcome = match rating {
        Rating::Again => on_rung(ladder, 0, 0, stepping, now),
        Rating::Hard => {
            let current = step_index.min(last);
            on_rung(ladder, current, (current + 1).min(last), stepping, now)
        }
        Rating::Good => {
            let next = step_index.saturating_add(1);
            if next < ladder.len() {
                on_rung(ladder, next, next, stepping, now)
            } else {
                graduate(config.graduating_interval_days(), now)
            }
        }
        Rating::Easy => graduate(config.easy_interval_days(), now),
    };

    log::debug!(
        "Step schedule: {:?} {:?} at step {} -> {:?} at step {}",
        prior,
        rating,
        step_index,
        outcome.state,
        outcome.step_index
    );

    Some(outcome)
}

/// Delay by the rung at `rung`, remembering `next_index`
fn on_rung(
    ladder: &[f64],
    rung: usize,
    next_index: usize,
    state: CardStatus,
    now: DateTime<Utc>,
) -> StepOutcome {
    let minutes = ladder.get(rung).copied().unwrap_or(0.0).max(0.0);
    StepOutcome {
        due: add_minutes(now, minutes),
        scheduled_days: minutes / MINUTES_PER_DAY,
        state,
        step_index: next_index,
    }
}

fn graduate(interval_days: f64, now: DateTime<Utc>) -> StepOutcome {
    let days = interval_days.max(1.0);
    StepOutcome {
        due: add_days(now, days),
        scheduled_days: days,
        state: CardStatus::Review,
        step_index: 0,
    }
}
