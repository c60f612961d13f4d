//! Study sessions
//!
//! `ReviewService` drives study sessions over queues of cards. Each rating
//! is snapshotted, scheduled and saved through the card store. A rating only
//! counts as committed once the save succeeds; until then it is held as a
//! pending save that can be retried without recomputation. Cards still on a
//! step ladder are queued again at the end of their session.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::algorithm::{Fsrs, MemoryModel};
use super::config::{resolve_step_ladder, DeckConfigSource, StepLadderConfig};
use super::error::{ReviewError, ReviewResult};
use super::models::{CardStatus, Rating, ReviewCard, ReviewStats, SessionStats};
use super::scheduler::{RatingPreview, ReviewScheduler};
use super::session::{SessionId, SessionStepRegistry, SessionStepState};
use super::storage::CardStore;
use super::undo::{ReviewSnapshot, ReviewUndoStack};

/// An open study session
#[derive(Debug)]
struct StudySession {
    cards: Vec<ReviewCard>,
    cursor: usize,
    undo: ReviewUndoStack,
    stats: SessionStats,
    /// Rating computed but not saved yet
    pending: Option<ReviewSnapshot>,
}

pub struct ReviewService<S, C, M = Fsrs> {
    store: S,
    decks: C,
    default_steps: StepLadderConfig,
    scheduler: ReviewScheduler<M>,
    registry: SessionStepRegistry,
    stats: ReviewStats,
    sessions: HashMap<SessionId, StudySession>,
}

impl<S, C, M> ReviewService<S, C, M>
where
    S: CardStore,
    C: DeckConfigSource,
    M: MemoryModel,
{
    /// `default_steps` applies to decks without their own ladder
    pub fn new(
        store: S,
        decks: C,
        default_steps: StepLadderConfig,
        scheduler: ReviewScheduler<M>,
    ) -> Self {
        Self {
            store,
            decks,
            default_steps,
            scheduler,
            registry: SessionStepRegistry::new(),
            stats: ReviewStats::default(),
            sessions: HashMap::new(),
        }
    }

    /// Start from previously saved review counters
    pub fn with_stats(mut self, stats: ReviewStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn stats(&self) -> &ReviewStats {
        &self.stats
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    // ==================== Session Lifecycle ====================

    pub fn start_session(&mut self, cards: Vec<ReviewCard>) -> SessionId {
        self.start_session_at(cards, Utc::now())
    }

    pub fn start_session_at(&mut self, cards: Vec<ReviewCard>, now: DateTime<Utc>) -> SessionId {
        let id = self.registry.begin_session();
        log::info!("Started review session {} with {} cards", id, cards.len());
        self.sessions.insert(
            id,
            StudySession {
                cards,
                cursor: 0,
                undo: ReviewUndoStack::new(),
                stats: SessionStats::new(now),
                pending: None,
            },
        );
        id
    }

    /// Close a session, dropping its undo history and step positions.
    ///
    /// A review whose save never succeeded is discarded along with its
    /// counters.
    pub fn end_session(&mut self, session_id: SessionId) -> ReviewResult<SessionStats> {
        let mut session = self
            .sessions
            .remove(&session_id)
            .ok_or(ReviewError::SessionNotFound(session_id))?;

        if let Some(pending) = session.pending.take() {
            log::warn!(
                "Ending session {} with an unsaved review of card {}, discarding it",
                session_id,
                pending.card_id
            );
            self.stats = pending.stats_before;
            session.stats = pending.session_stats_before;
        }
        session.undo.clear();
        self.registry.end_session(session_id);

        log::info!(
            "Ended review session {} after {} reviews",
            session_id,
            session.stats.reviewed
        );
        Ok(session.stats)
    }

    // ==================== Queries ====================

    fn session(&self, session_id: SessionId) -> ReviewResult<&StudySession> {
        self.sessions
            .get(&session_id)
            .ok_or(ReviewError::SessionNotFound(session_id))
    }

    /// Card awaiting a rating, `None` once the queue is exhausted
    pub fn current_card(&self, session_id: SessionId) -> ReviewResult<Option<&ReviewCard>> {
        let session = self.session(session_id)?;
        Ok(session.cards.get(session.cursor))
    }

    /// Ratings still to give in this session
    pub fn remaining(&self, session_id: SessionId) -> ReviewResult<usize> {
        let session = self.session(session_id)?;
        Ok(session.cards.len().saturating_sub(session.cursor))
    }

    pub fn session_stats(&self, session_id: SessionId) -> ReviewResult<&SessionStats> {
        Ok(&self.session(session_id)?.stats)
    }

    pub fn step_state(&self, session_id: SessionId, card_id: Uuid) -> Option<SessionStepState> {
        self.registry.steps(session_id)?.state(card_id)
    }

    pub fn can_undo(&self, session_id: SessionId) -> ReviewResult<bool> {
        let session = self.session(session_id)?;
        Ok(session.pending.is_some() || session.undo.can_undo())
    }

    /// Step ladder that applies to a deck
    pub fn step_ladder(&self, deck_id: Uuid) -> &StepLadderConfig {
        resolve_step_ladder(&self.decks, deck_id, &self.default_steps)
    }

    /// Schedules each rating would produce for the current card
    pub fn preview_at(
        &self,
        session_id: SessionId,
        now: DateTime<Utc>,
    ) -> ReviewResult<[RatingPreview; 4]> {
        let card = self
            .current_card(session_id)?
            .ok_or(ReviewError::SessionFinished(session_id))?;
        let steps = self
            .registry
            .steps(session_id)
            .ok_or(ReviewError::SessionNotFound(session_id))?;
        Ok(self
            .scheduler
            .preview(card, self.step_ladder(card.deck_id), steps, now))
    }

    // ==================== Rating ====================

    pub fn rate(&mut self, session_id: SessionId, rating: Rating) -> ReviewResult<ReviewCard> {
        self.rate_at(session_id, rating, Utc::now())
    }

    /// Rate the current card and save it.
    ///
    /// On a failed save the computed card stays in the session as a pending
    /// save and the storage error is returned; see [`Self::retry_save`].
    pub fn rate_at(
        &mut self,
        session_id: SessionId,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> ReviewResult<ReviewCard> {
        let Self {
            store,
            decks,
            default_steps,
            scheduler,
            registry,
            stats,
            sessions,
        } = self;

        let session = sessions
            .get_mut(&session_id)
            .ok_or(ReviewError::SessionNotFound(session_id))?;
        if let Some(pending) = &session.pending {
            return Err(ReviewError::PendingSave(pending.card_id));
        }
        let card = session
            .cards
            .get(session.cursor)
            .cloned()
            .ok_or(ReviewError::SessionFinished(session_id))?;
        let steps = registry
            .steps_mut(session_id)
            .ok_or(ReviewError::SessionNotFound(session_id))?;
        let config = resolve_step_ladder(&*decks, card.deck_id, &*default_steps);

        let snapshot = ReviewSnapshot {
            card_index: session.cursor,
            card_id: card.id,
            memory_before: card.memory.clone(),
            history_before: card.history.clone(),
            updated_at_before: card.updated_at,
            stats_before: stats.clone(),
            session_stats_before: session.stats.clone(),
            step_index_before: steps.state(card.id).map(|s| s.step_index),
            rating_applied: rating,
            applied_at: now,
        };

        let updated = scheduler.apply_rating(&card, rating, config, steps, now);

        let prior = card.memory.state;
        stats.record(
            rating,
            prior == CardStatus::Review && rating == Rating::Again,
            now,
        );
        session.stats.record(
            rating,
            prior != CardStatus::Review && updated.memory.state == CardStatus::Review,
        );
        session.cards[snapshot.card_index] = updated;

        commit(store, session, snapshot)
    }

    /// Save a pending review again, without recomputing it
    pub fn retry_save(&mut self, session_id: SessionId) -> ReviewResult<Option<ReviewCard>> {
        let session = self
            .sessions
            .get_mut(&session_id)
            .ok_or(ReviewError::SessionNotFound(session_id))?;
        match session.pending.take() {
            Some(snapshot) => commit(&mut self.store, session, snapshot).map(Some),
            None => Ok(None),
        }
    }

    // ==================== Undo ====================

    /// Revert the most recent rating of the session.
    ///
    /// Returns `Ok(None)` when there is nothing to undo. The restored card is
    /// saved before the session rolls back; if that save fails the snapshot
    /// goes back on the stack and the session is left as it was.
    pub fn undo(&mut self, session_id: SessionId) -> ReviewResult<Option<ReviewSnapshot>> {
        let Self {
            store,
            registry,
            stats,
            sessions,
            ..
        } = self;

        let session = sessions
            .get_mut(&session_id)
            .ok_or(ReviewError::SessionNotFound(session_id))?;
        let steps = registry
            .steps_mut(session_id)
            .ok_or(ReviewError::SessionNotFound(session_id))?;

        // Never saved, so only the in-memory state needs reverting
        if let Some(snapshot) = session.pending.take() {
            session.cards[snapshot.card_index] =
                restored_card(&session.cards[snapshot.card_index], &snapshot);
            session.stats = snapshot.session_stats_before.clone();
            *stats = snapshot.stats_before.clone();
            steps.restore(snapshot.card_id, snapshot.step_index_before);
            log::info!("Discarded unsaved review of card {}", snapshot.card_id);
            return Ok(Some(snapshot));
        }

        let Some(snapshot) = session.undo.undo() else {
            log::info!("Nothing to undo in session {}", session_id);
            return Ok(None);
        };

        let rated = &session.cards[snapshot.card_index];
        let requeued = rated.memory.state.uses_steps();
        let restored = restored_card(rated, &snapshot);
        if let Err(e) = store.save_card(&restored) {
            log::warn!(
                "Failed to save card {} while undoing, keeping undo available: {}",
                snapshot.card_id,
                e
            );
            session.undo.push(snapshot);
            return Err(e.into());
        }

        // Later ratings were undone first, so a requeued copy is last
        if requeued {
            session.cards.pop();
        }
        session.cards[snapshot.card_index] = restored;
        session.cursor = snapshot.card_index;
        session.stats = snapshot.session_stats_before.clone();
        *stats = snapshot.stats_before.clone();
        steps.restore(snapshot.card_id, snapshot.step_index_before);

        log::info!(
            "Undid {:?} on card {}",
            snapshot.rating_applied,
            snapshot.card_id
        );
        Ok(Some(snapshot))
    }
}

/// Save a rated card; on success push its snapshot and move on
fn commit<S: CardStore>(
    store: &mut S,
    session: &mut StudySession,
    snapshot: ReviewSnapshot,
) -> ReviewResult<ReviewCard> {
    let index = snapshot.card_index;
    let card = session.cards[index].clone();

    if let Err(e) = store.save_card(&card) {
        log::warn!("Failed to save review of card {}: {}", card.id, e);
        session.pending = Some(snapshot);
        return Err(e.into());
    }

    if card.memory.state.uses_steps() {
        session.cards.push(card.clone());
    }
    session.cursor = index + 1;
    session.undo.push(snapshot);
    Ok(card)
}

fn restored_card(card: &ReviewCard, snapshot: &ReviewSnapshot) -> ReviewCard {
    let mut restored = card.clone();
    restored.memory = snapshot.memory_before.clone();
    restored.history = snapshot.history_before.clone();
    restored.updated_at = snapshot.updated_at_before;
    restored
}
