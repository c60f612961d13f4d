//! Session-scoped learning step positions
//!
//! Step indices are ephemeral: they live for one study session and are never
//! written into the card record. The registry is an explicit arena keyed by
//! session, torn down when the session ends.

use std::collections::HashMap;

use uuid::Uuid;

pub type SessionId = Uuid;

/// Position of one card on its step ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStepState {
    pub card_id: Uuid,
    pub step_index: usize,
}

/// Step indices for the cards seen in one session
#[derive(Debug, Clone, Default)]
pub struct SessionSteps {
    indices: HashMap<Uuid, usize>,
}

impl SessionSteps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Step index for a card, 0 if it has not been seen this session
    pub fn step_index(&self, card_id: Uuid) -> usize {
        self.indices.get(&card_id).copied().unwrap_or(0)
    }

    /// Recorded state for a card, if it has been seen this session
    pub fn state(&self, card_id: Uuid) -> Option<SessionStepState> {
        self.indices.get(&card_id).map(|&step_index| SessionStepState {
            card_id,
            step_index,
        })
    }

    pub fn set_step_index(&mut self, card_id: Uuid, step_index: usize) {
        self.indices.insert(card_id, step_index);
    }

    /// Put back a previously captured state; `None` forgets the card
    pub fn restore(&mut self, card_id: Uuid, step_index: Option<usize>) {
        match step_index {
            Some(index) => {
                self.indices.insert(card_id, index);
            }
            None => {
                self.indices.remove(&card_id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Arena of step indices for every open session
#[derive(Debug, Default)]
pub struct SessionStepRegistry {
    sessions: HashMap<SessionId, SessionSteps>,
}

impl SessionStepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new, empty session
    pub fn begin_session(&mut self) -> SessionId {
        let id = Uuid::new_v4();
        self.sessions.insert(id, SessionSteps::new());
        id
    }

    pub fn steps(&self, session_id: SessionId) -> Option<&SessionSteps> {
        self.sessions.get(&session_id)
    }

    pub fn steps_mut(&mut self, session_id: SessionId) -> Option<&mut SessionSteps> {
        self.sessions.get_mut(&session_id)
    }

    /// Discard every step index of a session
    pub fn end_session(&mut self, session_id: SessionId) -> Option<SessionSteps> {
        self.sessions.remove(&session_id)
    }

    pub fn is_active(&self, session_id: SessionId) -> bool {
        self.sessions.contains_key(&session_id)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }
}
