//! Experience ledger and level curve.
//!
//! # Responsibility
//! - Turn experience awards into updated level/rank standing.
//! - Recompute derived standing fields (`level`, `rank`,
//!   `experience_to_next_level`) from cumulative experience.
//!
//! # Invariants
//! - Level and rank are always the single highest value the experience
//!   supports; multi-step jumps are never observable as intermediate steps.
//! - At the top of either table experience keeps accumulating while the
//!   level/rank stay pinned.
//! - The ledger never persists anything.

use crate::model::rank::{Rank, RankTable};
use crate::model::user::User;
use std::error::Error;
use std::fmt::{Display, Formatter};

const DEFAULT_MAX_LEVEL: i64 = 100;
const DEFAULT_LEVEL_STEP: i64 = 50;

/// Default curve: `threshold(n) = 50 * n * (n - 1)` for levels 1..=100.
pub fn default_level_thresholds() -> Vec<i64> {
    (1..=DEFAULT_MAX_LEVEL)
        .map(|level| DEFAULT_LEVEL_STEP * level * (level - 1))
        .collect()
}

/// Level curve validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelCurveError {
    Empty,
    FirstThresholdNotZero(i64),
    NotIncreasing { level: u32 },
}

impl Display for LevelCurveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "level curve must not be empty"),
            Self::FirstThresholdNotZero(value) => {
                write!(f, "level 1 threshold must be 0, got {value}")
            }
            Self::NotIncreasing { level } => {
                write!(f, "level thresholds must strictly increase; violated at level {level}")
            }
        }
    }
}

impl Error for LevelCurveError {}

/// Cumulative experience required per level; index 0 is level 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelCurve {
    thresholds: Vec<i64>,
}

impl LevelCurve {
    pub fn new(thresholds: Vec<i64>) -> Result<Self, LevelCurveError> {
        let first = *thresholds.first().ok_or(LevelCurveError::Empty)?;
        if first != 0 {
            return Err(LevelCurveError::FirstThresholdNotZero(first));
        }
        if let Some(position) = thresholds.windows(2).position(|pair| pair[1] <= pair[0]) {
            return Err(LevelCurveError::NotIncreasing {
                level: level_from_index(position + 1),
            });
        }
        Ok(Self { thresholds })
    }

    pub fn max_level(&self) -> u32 {
        level_from_index(self.thresholds.len() - 1)
    }

    /// Cumulative experience required for `level`, `None` past the ceiling.
    pub fn threshold(&self, level: u32) -> Option<i64> {
        let index = usize::try_from(level).ok()?.checked_sub(1)?;
        self.thresholds.get(index).copied()
    }

    /// Highest level whose threshold is `<= experience`.
    pub fn level_for_experience(&self, experience: i64) -> u32 {
        // Thresholds are sorted, so the count of met entries is the level.
        let met = self
            .thresholds
            .partition_point(|threshold| *threshold <= experience);
        level_from_index(met.max(1) - 1)
    }

    /// Remaining experience to the next level, 0 at the ceiling.
    pub fn experience_to_next(&self, experience: i64) -> i64 {
        let level = self.level_for_experience(experience);
        self.threshold(level + 1)
            .map_or(0, |next| next.saturating_sub(experience).max(0))
    }
}

impl Default for LevelCurve {
    fn default() -> Self {
        Self {
            thresholds: default_level_thresholds(),
        }
    }
}

fn level_from_index(index: usize) -> u32 {
    u32::try_from(index + 1).unwrap_or(u32::MAX)
}

/// Rejected experience award.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidAmount(pub i64);

impl Display for InvalidAmount {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "experience award must be > 0, got {}", self.0)
    }
}

impl Error for InvalidAmount {}

/// Level/rank standing before and after a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandingChange {
    pub previous_level: u32,
    pub level: u32,
    pub previous_rank: Rank,
    pub rank: Rank,
}

impl StandingChange {
    pub fn leveled_up(&self) -> bool {
        self.level > self.previous_level
    }

    pub fn ranked_up(&self) -> bool {
        self.rank.index() > self.previous_rank.index()
    }
}

/// Result of one experience award.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwardOutcome {
    pub user: User,
    pub amount: i64,
    pub leveled_up: bool,
    pub ranked_up: bool,
    pub change: StandingChange,
}

/// Converts experience into level and rank.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExperienceLedger {
    curve: LevelCurve,
    ranks: RankTable,
}

impl ExperienceLedger {
    pub fn new(curve: LevelCurve, ranks: RankTable) -> Self {
        Self { curve, ranks }
    }

    pub fn curve(&self) -> &LevelCurve {
        &self.curve
    }

    pub fn ranks(&self) -> &RankTable {
        &self.ranks
    }

    /// Adds `amount` experience and recomputes standing on a copy of `user`.
    ///
    /// # Errors
    /// - `InvalidAmount` when `amount <= 0`; `user` is untouched.
    pub fn award(&self, user: &User, amount: i64) -> Result<AwardOutcome, InvalidAmount> {
        if amount <= 0 {
            return Err(InvalidAmount(amount));
        }
        let mut updated = user.clone();
        updated.experience = updated.experience.saturating_add(amount);
        let change = self.restate(&mut updated);
        Ok(AwardOutcome {
            user: updated,
            amount,
            leveled_up: change.leveled_up(),
            ranked_up: change.ranked_up(),
            change,
        })
    }

    /// Recomputes derived standing from current experience and active days.
    pub fn restate(&self, user: &mut User) -> StandingChange {
        let previous_level = user.level;
        let previous_rank = user.rank;
        user.level = self.curve.level_for_experience(user.experience);
        user.experience_to_next_level = self.curve.experience_to_next(user.experience);
        user.rank = self
            .ranks
            .rank_for_progress(user.experience, user.days_active);
        StandingChange {
            previous_level,
            level: user.level,
            previous_rank,
            rank: user.rank,
        }
    }
}
