//! Review state machine
//!
//! A rating first goes through the memory model, which updates stability,
//! difficulty and retrievability and proposes a schedule. While the card was
//! not in Review, the step ladder then overrides due date, scheduled days and
//! state.

use chrono::{DateTime, Utc};

use super::algorithm::{format_interval, Fsrs, MemoryModel};
use super::config::StepLadderConfig;
use super::models::{CardStatus, Rating, ReviewCard, ReviewLogEntry};
use super::session::SessionSteps;
use super::steps::schedule_step;

/// What a rating would do to a card, shown before the learner answers
#[derive(Debug, Clone, PartialEq)]
pub struct RatingPreview {
    pub rating: Rating,
    pub due: DateTime<Utc>,
    pub scheduled_days: f64,
    pub state: CardStatus,
    /// Short label such as "10m" or "4d"
    pub label: String,
}

/// Composes a memory model with the learning step ladders
#[derive(Debug, Clone, Default)]
pub struct ReviewScheduler<M = Fsrs> {
    model: M,
}

impl<M: MemoryModel> ReviewScheduler<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Apply a rating and return the updated card.
    ///
    /// The card's step index in `steps` is updated as a side effect.
    pub fn apply_rating(
        &self,
        card: &ReviewCard,
        rating: Rating,
        config: &StepLadderConfig,
        steps: &mut SessionSteps,
        now: DateTime<Utc>,
    ) -> ReviewCard {
        let prior = card.memory.state;
        let (mut memory, log) = self.model.review(&card.memory, rating, now);

        match schedule_step(prior, rating, config, steps.step_index(card.id), now) {
            Some(outcome) => {
                memory.due = outcome.due;
                memory.scheduled_days = outcome.scheduled_days;
                memory.state = outcome.state;
                steps.set_step_index(card.id, outcome.step_index);
                if outcome.graduated() {
                    log::info!("Card {} graduated to review", card.id);
                }
            }
            None if memory.state == CardStatus::Relearning => {
                // Relearning starts from the first rung
                steps.set_step_index(card.id, 0);
            }
            None => {}
        }

        let lapsed = prior == CardStatus::Review && rating == Rating::Again;
        memory.reps = card.memory.reps.saturating_add(1);
        memory.lapses = card.memory.lapses.saturating_add(u32::from(lapsed));
        memory.last_review = Some(now);

        let entry = ReviewLogEntry {
            scheduled_days: memory.scheduled_days,
            ..log
        };

        log::debug!(
            "Card {} rated {:?}: {:?} -> {:?}, due {}",
            card.id,
            rating,
            prior,
            memory.state,
            memory.due
        );

        let mut updated = card.clone();
        updated.memory = memory;
        updated.history.push(entry);
        updated.updated_at = now;
        updated
    }

    /// What each rating would schedule, without touching the card or session
    pub fn preview(
        &self,
        card: &ReviewCard,
        config: &StepLadderConfig,
        steps: &SessionSteps,
        now: DateTime<Utc>,
    ) -> [RatingPreview; 4] {
        Rating::ALL.map(|rating| {
            let mut scratch = steps.clone();
            let next = self.apply_rating(card, rating, config, &mut scratch, now);
            RatingPreview {
                rating,
                due: next.memory.due,
                scheduled_days: next.memory.scheduled_days,
                state: next.memory.state,
                label: format_interval(next.memory.scheduled_days),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flashcards::models::MemorySnapshot;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap()
    }

    fn new_card() -> ReviewCard {
        ReviewCard::new(Uuid::new_v4(), now())
    }

    fn review_card(stability: f64) -> ReviewCard {
        let mut card = new_card();
        card.memory = MemorySnapshot {
            due: now(),
            stability,
            difficulty: 5.0,
            elapsed_days: 5.0,
            scheduled_days: 5.0,
            reps: 6,
            lapses: 1,
            state: CardStatus::Review,
            last_review: Some(now() - Duration::days(5)),
            retrievability: 0.9,
        };
        card
    }

    /// Model that keeps stability fixed and always proposes one day
    struct FixedModel;

    impl MemoryModel for FixedModel {
        fn review(
            &self,
            snapshot: &MemorySnapshot,
            rating: Rating,
            now: DateTime<Utc>,
        ) -> (MemorySnapshot, ReviewLogEntry) {
            let mut next = snapshot.clone();
            next.due = now + Duration::days(1);
            next.scheduled_days = 1.0;
            next.stability = 2.0;
            next.difficulty = 5.0;
            if snapshot.state == CardStatus::Review && rating == Rating::Again {
                next.state = CardStatus::Relearning;
            }
            let log = ReviewLogEntry {
                rating,
                state: snapshot.state,
                timestamp: now,
                elapsed_days: 0.0,
                scheduled_days: 1.0,
                stability: 2.0,
                difficulty: 5.0,
            };
            (next, log)
        }
    }

    #[test]
    fn test_new_card_good_good_graduates() {
        let scheduler = ReviewScheduler::new(Fsrs::new());
        let config = StepLadderConfig::default();
        let mut steps = SessionSteps::new();
        let card = new_card();

        let first = scheduler.apply_rating(&card, Rating::Good, &config, &mut steps, now());
        assert_eq!(first.memory.state, CardStatus::Learning);
        assert_eq!(steps.step_index(card.id), 1);
        assert_eq!(first.memory.due, now() + Duration::minutes(10));

        let later = now() + Duration::minutes(10);
        let second = scheduler.apply_rating(&first, Rating::Good, &config, &mut steps, later);
        assert_eq!(second.memory.state, CardStatus::Review);
        assert_eq!(steps.step_index(card.id), 0);
        assert_eq!(second.memory.scheduled_days, 1.0);
        assert_eq!(second.memory.due, later + Duration::days(1));
        assert_eq!(second.memory.reps, 2);
        assert_eq!(second.history.len(), 2);
        assert_eq!(second.history[1].scheduled_days, 1.0);
    }

    #[test]
    fn test_review_again_relearns_with_relearning_steps() {
        let scheduler = ReviewScheduler::new(Fsrs::new());
        let config = StepLadderConfig::new(vec![1.0, 10.0], vec![7.0, 20.0], 1.0, 4.0).unwrap();
        let mut steps = SessionSteps::new();
        let card = review_card(5.0);

        let lapsed = scheduler.apply_rating(&card, Rating::Again, &config, &mut steps, now());
        assert_eq!(lapsed.memory.state, CardStatus::Relearning);
        assert_eq!(lapsed.memory.lapses, 2);
        assert_eq!(steps.step_index(card.id), 0);

        let later = now() + Duration::minutes(5);
        let next = scheduler.apply_rating(&lapsed, Rating::Hard, &config, &mut steps, later);
        assert_eq!(next.memory.state, CardStatus::Relearning);
        assert_eq!(next.memory.due, later + Duration::minutes(7));
        assert_eq!(next.memory.lapses, 2);
    }

    #[test]
    fn test_review_ratings_use_model_interval() {
        let scheduler = ReviewScheduler::new(FixedModel);
        let config = StepLadderConfig::default();
        let mut steps = SessionSteps::new();
        let card = review_card(5.0);

        let next = scheduler.apply_rating(&card, Rating::Good, &config, &mut steps, now());
        assert_eq!(next.memory.state, CardStatus::Review);
        assert_eq!(next.memory.due, now() + Duration::days(1));
        assert_eq!(next.memory.lapses, 1);
        assert!(steps.state(card.id).is_none());
    }

    #[test]
    fn test_step_override_replaces_model_proposal() {
        let scheduler = ReviewScheduler::new(FixedModel);
        let config = StepLadderConfig::default();
        let mut steps = SessionSteps::new();

        let next = scheduler.apply_rating(&new_card(), Rating::Again, &config, &mut steps, now());
        assert_eq!(next.memory.state, CardStatus::Learning);
        assert_eq!(next.memory.due, now() + Duration::minutes(1));
        assert_eq!(next.memory.stability, 2.0);
        assert_eq!(next.memory.reps, 1);
        assert_eq!(next.memory.last_review, Some(now()));
    }

    #[test]
    fn test_easy_from_relearning_graduates() {
        let scheduler = ReviewScheduler::new(Fsrs::new());
        let config = StepLadderConfig::default();
        let mut steps = SessionSteps::new();
        let mut card = review_card(5.0);
        card.memory.state = CardStatus::Relearning;
        steps.set_step_index(card.id, 0);

        let next = scheduler.apply_rating(&card, Rating::Easy, &config, &mut steps, now());
        assert_eq!(next.memory.state, CardStatus::Review);
        assert_eq!(next.memory.scheduled_days, 4.0);
        assert_eq!(next.memory.due, now() + Duration::days(4));
    }

    #[test]
    fn test_preview_leaves_session_untouched() {
        let scheduler = ReviewScheduler::new(Fsrs::new());
        let config = StepLadderConfig::default();
        let steps = SessionSteps::new();
        let card = new_card();

        let previews = scheduler.preview(&card, &config, &steps, now());
        let labels: Vec<&str> = previews.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["1m", "1m", "10m", "4d"]);
        assert_eq!(previews[3].state, CardStatus::Review);
        assert!(steps.is_empty());
    }

    fn arb_rating() -> impl Strategy<Value = Rating> {
        prop_oneof![
            Just(Rating::Again),
            Just(Rating::Hard),
            Just(Rating::Good),
            Just(Rating::Easy),
        ]
    }

    proptest! {
        #[test]
        fn reps_and_lapses_never_decrease(
            ratings in prop::collection::vec((arb_rating(), 0i64..20_000), 1..30),
        ) {
            let scheduler = ReviewScheduler::new(Fsrs::new());
            let config = StepLadderConfig::default();
            let mut steps = SessionSteps::new();
            let mut card = new_card();
            let mut at = now();

            for (rating, gap_minutes) in ratings {
                at += Duration::minutes(gap_minutes);
                let prior = card.memory.clone();
                card = scheduler.apply_rating(&card, rating, &config, &mut steps, at);

                prop_assert_eq!(card.memory.reps, prior.reps + 1);
                let lapsed = prior.state == CardStatus::Review && rating == Rating::Again;
                prop_assert_eq!(card.memory.lapses, prior.lapses + u32::from(lapsed));
                prop_assert!(card.memory.due >= at);
                prop_assert!(card.memory.difficulty >= 0.0 && card.memory.difficulty <= 10.0);
                prop_assert!(card.memory.retrievability >= 0.0 && card.memory.retrievability <= 1.0);
            }
        }
    }
}
