//! Hunter (user) aggregate.
//!
//! # Responsibility
//! - Define the per-user progression snapshot persisted as one document.
//! - Own daily-win and streak counters exclusively.
//!
//! # Invariants
//! - `level >= 1`, `experience >= 0`, `gold >= 0`.
//! - `longest_streak >= streak_days`.
//! - `rank`, `level` and `experience_to_next_level` are derived by the
//!   experience ledger and never assigned by callers.

use crate::model::rank::Rank;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one hunter.
pub type UserId = Uuid;

/// Daily win category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DailyWinCategory {
    Physical,
    Mental,
    Spiritual,
    Intelligence,
}

/// All daily win categories in display order.
pub const ALL_DAILY_WIN_CATEGORIES: [DailyWinCategory; 4] = [
    DailyWinCategory::Physical,
    DailyWinCategory::Mental,
    DailyWinCategory::Spiritual,
    DailyWinCategory::Intelligence,
];

impl DailyWinCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Physical => "physical",
            Self::Mental => "mental",
            Self::Spiritual => "spiritual",
            Self::Intelligence => "intelligence",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "physical" => Some(Self::Physical),
            "mental" => Some(Self::Mental),
            "spiritual" => Some(Self::Spiritual),
            "intelligence" => Some(Self::Intelligence),
            _ => None,
        }
    }
}

impl Display for DailyWinCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Completion record of one category for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DailyWinProgress {
    pub count: u32,
    pub is_completed: bool,
    /// Day the counters belong to. `None` until the first win.
    pub last_updated: Option<NaiveDate>,
}

/// Per-user progression snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    pub level: u32,
    pub experience: i64,
    pub experience_to_next_level: i64,
    pub rank: Rank,
    pub gold: i64,
    pub streak_days: u32,
    pub longest_streak: u32,
    /// Distinct calendar days with at least one qualifying activity.
    pub days_active: u32,
    pub daily_wins: BTreeMap<DailyWinCategory, DailyWinProgress>,
    pub last_active: Option<NaiveDate>,
    pub created_on: NaiveDate,
}

impl User {
    /// Creates a fresh level-1, rank-F hunter with a generated id.
    pub fn new(display_name: impl Into<String>, created_on: NaiveDate) -> Self {
        Self::with_id(Uuid::new_v4(), display_name, created_on)
    }

    /// Creates a fresh hunter with a caller-provided id.
    pub fn with_id(id: UserId, display_name: impl Into<String>, created_on: NaiveDate) -> Self {
        let daily_wins = ALL_DAILY_WIN_CATEGORIES
            .iter()
            .map(|category| (*category, DailyWinProgress::default()))
            .collect();
        Self {
            id,
            display_name: display_name.into(),
            level: 1,
            experience: 0,
            experience_to_next_level: 0,
            rank: Rank::lowest(),
            gold: 0,
            streak_days: 0,
            longest_streak: 0,
            days_active: 0,
            daily_wins,
            last_active: None,
            created_on,
        }
    }

    /// Progress record for one category, as stored (no rollover applied).
    pub fn daily_win(&self, category: DailyWinCategory) -> DailyWinProgress {
        self.daily_wins.get(&category).copied().unwrap_or_default()
    }

    /// Checks snapshot invariants before persistence.
    pub fn validate(&self) -> Result<(), UserValidationError> {
        if self.id.is_nil() {
            return Err(UserValidationError::NilId);
        }
        if self.display_name.trim().is_empty() {
            return Err(UserValidationError::EmptyDisplayName);
        }
        if self.level == 0 {
            return Err(UserValidationError::LevelBelowOne);
        }
        if self.experience < 0 {
            return Err(UserValidationError::NegativeExperience(self.experience));
        }
        if self.gold < 0 {
            return Err(UserValidationError::NegativeGold(self.gold));
        }
        if self.longest_streak < self.streak_days {
            return Err(UserValidationError::StreakExceedsLongest {
                streak_days: self.streak_days,
                longest_streak: self.longest_streak,
            });
        }
        Ok(())
    }
}

/// User snapshot invariant violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    NilId,
    EmptyDisplayName,
    LevelBelowOne,
    NegativeExperience(i64),
    NegativeGold(i64),
    StreakExceedsLongest {
        streak_days: u32,
        longest_streak: u32,
    },
}

impl Display for UserValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "user id must not be nil"),
            Self::EmptyDisplayName => write!(f, "display name must not be blank"),
            Self::LevelBelowOne => write!(f, "level must be at least 1"),
            Self::NegativeExperience(value) => write!(f, "experience must be >= 0, got {value}"),
            Self::NegativeGold(value) => write!(f, "gold must be >= 0, got {value}"),
            Self::StreakExceedsLongest {
                streak_days,
                longest_streak,
            } => write!(
                f,
                "streak_days ({streak_days}) exceeds longest_streak ({longest_streak})"
            ),
        }
    }
}

impl Error for UserValidationError {}
