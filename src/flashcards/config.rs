//! Scheduler settings: step ladders and memory model parameters
//!
//! Settings live in `{data_dir}/scheduler_settings.json`. Step ladders are
//! validated when they are built or deserialized, so a rating never sees an
//! empty or negative ladder.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{ConfigError, LadderKind};

/// Default learning steps in minutes
const DEFAULT_LEARNING_STEPS: [f64; 2] = [1.0, 10.0];

/// Default relearning steps in minutes
const DEFAULT_RELEARNING_STEPS: [f64; 1] = [10.0];

/// Short-term step ladders and graduation intervals for a deck
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "StepLadderFile")]
pub struct StepLadderConfig {
    learning_steps: Vec<f64>,
    relearning_steps: Vec<f64>,
    graduating_interval_days: f64,
    easy_interval_days: f64,
}

/// Unvalidated on-disk form of [`StepLadderConfig`]
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StepLadderFile {
    #[serde(default = "default_learning_steps")]
    learning_steps: Vec<f64>,
    #[serde(default = "default_relearning_steps")]
    relearning_steps: Vec<f64>,
    #[serde(default = "default_graduating_interval")]
    graduating_interval_days: f64,
    #[serde(default = "default_easy_interval")]
    easy_interval_days: f64,
}

fn default_learning_steps() -> Vec<f64> {
    DEFAULT_LEARNING_STEPS.to_vec()
}

fn default_relearning_steps() -> Vec<f64> {
    DEFAULT_RELEARNING_STEPS.to_vec()
}

fn default_graduating_interval() -> f64 {
    1.0
}

fn default_easy_interval() -> f64 {
    4.0
}

impl TryFrom<StepLadderFile> for StepLadderConfig {
    type Error = ConfigError;

    fn try_from(file: StepLadderFile) -> Result<Self, Self::Error> {
        Self::new(
            file.learning_steps,
            file.relearning_steps,
            file.graduating_interval_days,
            file.easy_interval_days,
        )
    }
}

impl StepLadderConfig {
    pub fn new(
        learning_steps: Vec<f64>,
        relearning_steps: Vec<f64>,
        graduating_interval_days: f64,
        easy_interval_days: f64,
    ) -> Result<Self, ConfigError> {
        validate_ladder(LadderKind::Learning, &learning_steps)?;
        validate_ladder(LadderKind::Relearning, &relearning_steps)?;
        validate_interval("graduatingIntervalDays", graduating_interval_days)?;
        validate_interval("easyIntervalDays", easy_interval_days)?;

        Ok(Self {
            learning_steps,
            relearning_steps,
            graduating_interval_days,
            easy_interval_days,
        })
    }

    pub fn learning_steps(&self) -> &[f64] {
        &self.learning_steps
    }

    pub fn relearning_steps(&self) -> &[f64] {
        &self.relearning_steps
    }

    pub fn graduating_interval_days(&self) -> f64 {
        self.graduating_interval_days
    }

    pub fn easy_interval_days(&self) -> f64 {
        self.easy_interval_days
    }

    /// Ladder used for a card currently in `kind`
    pub fn ladder(&self, kind: LadderKind) -> &[f64] {
        match kind {
            LadderKind::Learning => &self.learning_steps,
            LadderKind::Relearning => &self.relearning_steps,
        }
    }
}

impl Default for StepLadderConfig {
    fn default() -> Self {
        Self {
            learning_steps: default_learning_steps(),
            relearning_steps: default_relearning_steps(),
            graduating_interval_days: default_graduating_interval(),
            easy_interval_days: default_easy_interval(),
        }
    }
}

fn validate_ladder(kind: LadderKind, steps: &[f64]) -> Result<(), ConfigError> {
    if steps.is_empty() {
        return Err(ConfigError::EmptyLadder(kind));
    }
    for (index, &minutes) in steps.iter().enumerate() {
        if !minutes.is_finite() || minutes < 0.0 {
            return Err(ConfigError::InvalidStep {
                ladder: kind,
                index,
                minutes,
            });
        }
    }
    Ok(())
}

fn validate_interval(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 1.0 {
        return Err(ConfigError::InvalidInterval { field, value });
    }
    Ok(())
}

/// Parameters of the default memory model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FsrsSettings {
    /// Target recall probability at the due date
    #[serde(default = "default_desired_retention")]
    pub desired_retention: f64,
    /// Longest interval the model may schedule, in days
    #[serde(default = "default_maximum_interval")]
    pub maximum_interval: u32,
}

fn default_desired_retention() -> f64 {
    0.9
}

fn default_maximum_interval() -> u32 {
    36500
}

impl Default for FsrsSettings {
    fn default() -> Self {
        Self {
            desired_retention: default_desired_retention(),
            maximum_interval: default_maximum_interval(),
        }
    }
}

impl FsrsSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let r = self.desired_retention;
        if !r.is_finite() || r <= 0.0 || r >= 1.0 {
            return Err(ConfigError::InvalidRetention(r));
        }
        if self.maximum_interval < 1 {
            return Err(ConfigError::InvalidMaximumInterval);
        }
        Ok(())
    }
}

/// Scheduler settings: the global ladder plus per-deck overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerSettings {
    /// Global default, used for decks without an override
    #[serde(default)]
    pub steps: StepLadderConfig,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub decks: HashMap<Uuid, StepLadderConfig>,
    #[serde(default)]
    pub fsrs: FsrsSettings,
}

impl SchedulerSettings {
    /// Get the settings file path
    pub fn path(data_dir: &Path) -> PathBuf {
        data_dir.join("scheduler_settings.json")
    }

    /// Parse and validate settings from JSON
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let settings: SchedulerSettings = serde_json::from_str(content)?;
        settings.fsrs.validate()?;
        Ok(settings)
    }

    /// Load settings from file, falling back to defaults when absent
    pub fn load(data_dir: &Path) -> Result<Self, ConfigError> {
        let settings_path = Self::path(data_dir);
        if !settings_path.exists() {
            log::debug!("No scheduler settings at {:?}, using defaults", settings_path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&settings_path)?;
        Self::from_json(&content)
    }

    /// Save settings to file
    pub fn save(&self, data_dir: &Path) -> Result<(), ConfigError> {
        fs::create_dir_all(data_dir)?;
        let content = serde_json::to_string_pretty(self)?;
        fs::write(Self::path(data_dir), content)?;
        Ok(())
    }

    /// Override the step ladder of one deck
    pub fn set_deck_steps(&mut self, deck_id: Uuid, steps: StepLadderConfig) {
        self.decks.insert(deck_id, steps);
    }
}

/// Source of per-deck step ladder overrides
pub trait DeckConfigSource {
    fn step_ladder(&self, deck_id: Uuid) -> Option<&StepLadderConfig>;
}

impl DeckConfigSource for SchedulerSettings {
    fn step_ladder(&self, deck_id: Uuid) -> Option<&StepLadderConfig> {
        self.decks.get(&deck_id)
    }
}

impl DeckConfigSource for HashMap<Uuid, StepLadderConfig> {
    fn step_ladder(&self, deck_id: Uuid) -> Option<&StepLadderConfig> {
        self.get(&deck_id)
    }
}

/// Ladder for `deck_id`, or `global` when the deck has no override
pub fn resolve_step_ladder<'a, C>(
    source: &'a C,
    deck_id: Uuid,
    global: &'a StepLadderConfig,
) -> &'a StepLadderConfig
where
    C: DeckConfigSource + ?Sized,
{
    source.step_ladder(deck_id).unwrap_or(global)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_ladder() {
        let config = StepLadderConfig::default();
        assert_eq!(config.learning_steps(), &[1.0, 10.0]);
        assert_eq!(config.relearning_steps(), &[10.0]);
        assert_eq!(config.graduating_interval_days(), 1.0);
        assert_eq!(config.easy_interval_days(), 4.0);
    }

    #[test]
    fn test_empty_ladder_rejected() {
        let err = StepLadderConfig::new(vec![], vec![10.0], 1.0, 4.0).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyLadder(LadderKind::Learning)));

        let err = StepLadderConfig::new(vec![1.0], vec![], 1.0, 4.0).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyLadder(LadderKind::Relearning)));
    }

    #[test]
    fn test_negative_step_rejected() {
        let err = StepLadderConfig::new(vec![1.0, -5.0], vec![10.0], 1.0, 4.0).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidStep {
                ladder: LadderKind::Learning,
                index: 1,
                ..
            }
        ));
        assert!(StepLadderConfig::new(vec![f64::NAN], vec![10.0], 1.0, 4.0).is_err());
    }

    #[test]
    fn test_zero_minute_step_allowed() {
        assert!(StepLadderConfig::new(vec![0.0], vec![0.0], 1.0, 1.0).is_ok());
    }

    #[test]
    fn test_short_graduating_interval_rejected() {
        let err = StepLadderConfig::new(vec![1.0], vec![10.0], 0.5, 4.0).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidInterval {
                field: "graduatingIntervalDays",
                ..
            }
        ));
    }

    #[test]
    fn test_deserialize_validates_at_load_time() {
        let json = r#"{ "steps": { "learningSteps": [] } }"#;
        assert!(SchedulerSettings::from_json(json).is_err());

        let json = r#"{ "steps": { "learningSteps": [5, 20], "easyIntervalDays": 3 } }"#;
        let settings = SchedulerSettings::from_json(json).unwrap();
        assert_eq!(settings.steps.learning_steps(), &[5.0, 20.0]);
        assert_eq!(settings.steps.relearning_steps(), &[10.0]);
        assert_eq!(settings.steps.easy_interval_days(), 3.0);

        let json = r#"{ "fsrs": { "desiredRetention": 1.5 } }"#;
        assert!(matches!(
            SchedulerSettings::from_json(json),
            Err(ConfigError::InvalidRetention(_))
        ));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let settings = SchedulerSettings::load(temp.path()).unwrap();
        assert_eq!(settings, SchedulerSettings::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let deck_id = Uuid::new_v4();
        let mut settings = SchedulerSettings::default();
        settings.set_deck_steps(
            deck_id,
            StepLadderConfig::new(vec![2.0, 15.0, 60.0], vec![5.0], 2.0, 5.0).unwrap(),
        );
        settings.save(temp.path()).unwrap();

        let loaded = SchedulerSettings::load(temp.path()).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_resolve_falls_back_to_global() {
        let deck_id = Uuid::new_v4();
        let other_deck = Uuid::new_v4();
        let global = StepLadderConfig::default();
        let mut overrides = HashMap::new();
        overrides.insert(
            deck_id,
            StepLadderConfig::new(vec![3.0], vec![3.0], 2.0, 6.0).unwrap(),
        );

        assert_eq!(
            resolve_step_ladder(&overrides, deck_id, &global).learning_steps(),
            &[3.0]
        );
        assert_eq!(resolve_step_ladder(&overrides, other_deck, &global), &global);
    }
}
