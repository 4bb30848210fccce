//! Engine configuration.
//!
//! # Responsibility
//! - Carry every tunable of the progression rules as one explicit value
//!   handed to the service at construction.
//! - Parse and validate JSON configuration documents.
//!
//! # Invariants
//! - A validated config always yields a valid `LevelCurve` and `RankTable`.
//! - Missing JSON fields fall back to the built-in defaults.

use crate::model::quest::Difficulty;
use crate::model::rank::{
    default_rank_thresholds, validate_rank_thresholds, RankTable, RankTableError, RankThreshold,
};
use crate::progression::ledger::{default_level_thresholds, LevelCurve, LevelCurveError};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

const DEFAULT_DAILY_WIN_EXP: i64 = 10;

/// Gold paid out per quest difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestGold {
    pub easy: i64,
    pub normal: i64,
    pub hard: i64,
    pub boss: i64,
}

impl QuestGold {
    pub fn for_difficulty(&self, difficulty: Difficulty) -> i64 {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Normal => self.normal,
            Difficulty::Hard => self.hard,
            Difficulty::Boss => self.boss,
        }
    }
}

impl Default for QuestGold {
    fn default() -> Self {
        Self {
            easy: 5,
            normal: 10,
            hard: 25,
            boss: 100,
        }
    }
}

/// Progression tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cumulative experience needed for level `index + 1`.
    pub level_thresholds: Vec<i64>,
    pub rank_thresholds: Vec<RankThreshold>,
    /// Experience granted the first time a category completes on a day.
    pub daily_win_exp: i64,
    pub quest_gold: QuestGold,
    pub streaks_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            level_thresholds: default_level_thresholds(),
            rank_thresholds: default_rank_thresholds(),
            daily_win_exp: DEFAULT_DAILY_WIN_EXP,
            quest_gold: QuestGold::default(),
            streaks_enabled: true,
        }
    }
}

impl EngineConfig {
    /// Parses a JSON document and validates it.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        Self::from_json_str(&raw)
    }

    /// Checks table ordering and reward signs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        LevelCurve::new(self.level_thresholds.clone())?;
        validate_rank_thresholds(&self.rank_thresholds)?;
        if self.daily_win_exp < 0 {
            return Err(ConfigError::NegativeReward {
                field: "daily_win_exp",
                value: self.daily_win_exp,
            });
        }
        let gold = self.quest_gold;
        for (field, value) in [
            ("quest_gold.easy", gold.easy),
            ("quest_gold.normal", gold.normal),
            ("quest_gold.hard", gold.hard),
            ("quest_gold.boss", gold.boss),
        ] {
            if value < 0 {
                return Err(ConfigError::NegativeReward { field, value });
            }
        }
        Ok(())
    }

    pub fn level_curve(&self) -> Result<LevelCurve, ConfigError> {
        Ok(LevelCurve::new(self.level_thresholds.clone())?)
    }

    pub fn rank_table(&self) -> Result<RankTable, ConfigError> {
        Ok(RankTable::new(self.rank_thresholds.clone())?)
    }
}

/// Configuration load/validation errors.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: String, message: String },
    Parse(serde_json::Error),
    LevelCurve(LevelCurveError),
    RankTable(RankTableError),
    NegativeReward { field: &'static str, value: i64 },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, message } => write!(f, "failed to read config `{path}`: {message}"),
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
            Self::LevelCurve(err) => write!(f, "invalid level curve: {err}"),
            Self::RankTable(err) => write!(f, "invalid rank table: {err}"),
            Self::NegativeReward { field, value } => {
                write!(f, "`{field}` must be >= 0, got {value}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::LevelCurve(err) => Some(err),
            Self::RankTable(err) => Some(err),
            Self::Io { .. } | Self::NegativeReward { .. } => None,
        }
    }
}

impl From<LevelCurveError> for ConfigError {
    fn from(value: LevelCurveError) -> Self {
        Self::LevelCurve(value)
    }
}

impl From<RankTableError> for ConfigError {
    fn from(value: RankTableError) -> Self {
        Self::RankTable(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, EngineConfig};
    use crate::model::rank::Rank;

    #[test]
    fn default_config_is_valid() {
        let config = EngineConfig::default();
        config.validate().expect("defaults must validate");
        assert_eq!(config.level_curve().expect("curve").max_level(), 100);
        assert_eq!(
            config.rank_table().expect("table").rank_for_experience(0),
            Rank::F
        );
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{ "daily_win_exp": 25, "quest_gold": { "boss": 500 } }"#,
        )
        .expect("partial config parses");
        assert_eq!(config.daily_win_exp, 25);
        assert_eq!(config.quest_gold.boss, 500);
        assert_eq!(config.quest_gold.easy, 5);
        assert!(config.streaks_enabled);
        assert_eq!(config.level_thresholds[1], 100);
    }

    #[test]
    fn json_rank_table_accepts_day_minimums() {
        let config = EngineConfig::from_json_str(
            r#"{
                "rank_thresholds": [
                    { "rank": "F", "min_experience": 0 },
                    { "rank": "E", "min_experience": 100, "min_days": 3 }
                ]
            }"#,
        )
        .expect("custom table parses");
        let table = config.rank_table().expect("table");
        assert_eq!(table.rank_for_progress(150, 2), Rank::F);
        assert_eq!(table.rank_for_progress(150, 3), Rank::E);
    }

    #[test]
    fn rejects_unordered_level_curve() {
        let err = EngineConfig::from_json_str(r#"{ "level_thresholds": [0, 300, 100] }"#)
            .expect_err("unordered curve must fail");
        assert!(matches!(err, ConfigError::LevelCurve(_)));
    }

    #[test]
    fn rejects_negative_rewards() {
        let err = EngineConfig::from_json_str(r#"{ "quest_gold": { "hard": -1 } }"#)
            .expect_err("negative gold must fail");
        assert!(matches!(
            err,
            ConfigError::NegativeReward {
                field: "quest_gold.hard",
                value: -1
            }
        ));
    }
}
