//! Storage operations for review cards
//!
//! Directory structure:
//! ```text
//! {base}/
//! ├── stats.json          # Daily review counters
//! └── cards/
//!     └── {card-id}.json  # Memory state and review history
//! ```

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::models::{ReviewCard, ReviewStats};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Card not found: {0}")]
    CardNotFound(Uuid),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Durable home of card records
pub trait CardStore {
    fn save_card(&mut self, card: &ReviewCard) -> Result<()>;
}

/// JSON file storage for review cards
pub struct FlashcardStorage {
    base_path: PathBuf,
}

impl FlashcardStorage {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn cards_dir(&self) -> PathBuf {
        self.base_path.join("cards")
    }

    fn card_path(&self, card_id: Uuid) -> PathBuf {
        self.cards_dir().join(format!("{}.json", card_id))
    }

    fn stats_path(&self) -> PathBuf {
        self.base_path.join("stats.json")
    }

    /// Create the storage directories
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(self.cards_dir())?;
        Ok(())
    }

    // ==================== Card Operations ====================

    /// Create a new card in a deck
    pub fn create_card(&self, deck_id: Uuid, now: DateTime<Utc>) -> Result<ReviewCard> {
        self.init()?;
        let card = ReviewCard::new(deck_id, now);
        self.write_card(&card)?;
        Ok(card)
    }

    /// Get a specific card
    pub fn get_card(&self, card_id: Uuid) -> Result<ReviewCard> {
        let card_path = self.card_path(card_id);
        if !card_path.exists() {
            return Err(StorageError::CardNotFound(card_id));
        }

        let content = fs::read_to_string(&card_path)?;
        let card: ReviewCard = serde_json::from_str(&content)?;
        Ok(card)
    }

    /// List cards, optionally only those of one deck
    pub fn list_cards(&self, deck_id: Option<Uuid>) -> Result<Vec<ReviewCard>> {
        let cards_dir = self.cards_dir();
        if !cards_dir.exists() {
            return Ok(Vec::new());
        }

        let mut cards = Vec::new();
        for entry in fs::read_dir(&cards_dir)? {
            let path = entry?.path();
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }

            let content = fs::read_to_string(&path)?;
            match serde_json::from_str::<ReviewCard>(&content) {
                Ok(card) if deck_id.map_or(true, |id| card.deck_id == id) => cards.push(card),
                Ok(_) => {}
                Err(e) => log::warn!("Skipping unreadable card file {:?}: {}", path, e),
            }
        }

        cards.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(cards)
    }

    /// Cards due at `now`, oldest due first
    pub fn due_cards(&self, deck_id: Option<Uuid>, now: DateTime<Utc>) -> Result<Vec<ReviewCard>> {
        let mut due: Vec<ReviewCard> = self
            .list_cards(deck_id)?
            .into_iter()
            .filter(|card| card.memory.is_due(now))
            .collect();
        due.sort_by(|a, b| a.memory.due.cmp(&b.memory.due));
        Ok(due)
    }

    /// Delete a card and its history
    pub fn delete_card(&self, card_id: Uuid) -> Result<()> {
        let card_path = self.card_path(card_id);
        if !card_path.exists() {
            return Err(StorageError::CardNotFound(card_id));
        }
        fs::remove_file(&card_path)?;
        Ok(())
    }

    fn write_card(&self, card: &ReviewCard) -> Result<()> {
        fs::write(self.card_path(card.id), serde_json::to_string_pretty(card)?)?;
        Ok(())
    }

    // ==================== Stats Operations ====================

    /// Load review counters, defaulting when none were saved
    pub fn load_stats(&self) -> Result<ReviewStats> {
        let stats_path = self.stats_path();
        if !stats_path.exists() {
            return Ok(ReviewStats::default());
        }

        let content = fs::read_to_string(&stats_path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save_stats(&self, stats: &ReviewStats) -> Result<()> {
        fs::create_dir_all(&self.base_path)?;
        fs::write(self.stats_path(), serde_json::to_string_pretty(stats)?)?;
        Ok(())
    }
}

impl CardStore for FlashcardStorage {
    fn save_card(&mut self, card: &ReviewCard) -> Result<()> {
        self.init()?;
        self.write_card(card)
    }
}
