//! Hunter rank ladder and rank threshold table.
//!
//! # Responsibility
//! - Define the closed, totally ordered set of hunter ranks.
//! - Map cumulative experience (and optionally active days) to a rank.
//!
//! # Invariants
//! - Rank order is list position: `F < E < ... < SSS`.
//! - Thresholds in a `RankTable` strictly increase with rank index.
//! - The first threshold always starts at zero experience, so every
//!   experience value maps to some rank.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Hunter rank, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rank {
    F,
    E,
    D,
    C,
    B,
    A,
    S,
    SS,
    SSS,
}

/// All ranks in ascending order.
pub const ALL_RANKS: [Rank; 9] = [
    Rank::F,
    Rank::E,
    Rank::D,
    Rank::C,
    Rank::B,
    Rank::A,
    Rank::S,
    Rank::SS,
    Rank::SSS,
];

impl Rank {
    /// Position in the ladder, used for ordering and gating comparisons.
    pub fn index(self) -> usize {
        match self {
            Self::F => 0,
            Self::E => 1,
            Self::D => 2,
            Self::C => 3,
            Self::B => 4,
            Self::A => 5,
            Self::S => 6,
            Self::SS => 7,
            Self::SSS => 8,
        }
    }

    /// Stable label used for storage and display.
    pub fn label(self) -> &'static str {
        match self {
            Self::F => "F",
            Self::E => "E",
            Self::D => "D",
            Self::C => "C",
            Self::B => "B",
            Self::A => "A",
            Self::S => "S",
            Self::SS => "SS",
            Self::SSS => "SSS",
        }
    }

    /// Parses a stored label. Matching is case-insensitive.
    pub fn from_label(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_uppercase();
        ALL_RANKS
            .iter()
            .copied()
            .find(|rank| rank.label() == normalized)
    }

    /// Next rank up, `None` at the ceiling.
    pub fn next(self) -> Option<Self> {
        ALL_RANKS.get(self.index() + 1).copied()
    }

    pub fn lowest() -> Self {
        Self::F
    }

    pub fn highest() -> Self {
        Self::SSS
    }
}

impl Display for Rank {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Minimum requirement to attain one rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankThreshold {
    pub rank: Rank,
    /// Cumulative experience required.
    pub min_experience: i64,
    /// Distinct active days required, when the rank is also time-gated.
    #[serde(default)]
    pub min_days: Option<u32>,
}

impl RankThreshold {
    pub const fn new(rank: Rank, min_experience: i64) -> Self {
        Self {
            rank,
            min_experience,
            min_days: None,
        }
    }

    fn is_met(&self, total_experience: i64, days_active: u32) -> bool {
        total_experience >= self.min_experience
            && self.min_days.map_or(true, |days| days_active >= days)
    }
}

/// Rank table validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RankTableError {
    Empty,
    /// The lowest threshold must start at zero experience.
    FirstThresholdNotZero(i64),
    /// Ranks or experience values are not strictly increasing.
    NotIncreasing { position: usize },
}

impl Display for RankTableError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "rank table must not be empty"),
            Self::FirstThresholdNotZero(value) => {
                write!(f, "first rank threshold must be 0, got {value}")
            }
            Self::NotIncreasing { position } => write!(
                f,
                "rank thresholds must strictly increase; violated at position {position}"
            ),
        }
    }
}

impl Error for RankTableError {}

/// Ordered rank threshold table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankTable {
    thresholds: Vec<RankThreshold>,
}

impl RankTable {
    /// Builds a table after checking ordering invariants.
    pub fn new(thresholds: Vec<RankThreshold>) -> Result<Self, RankTableError> {
        validate_rank_thresholds(&thresholds)?;
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> &[RankThreshold] {
        &self.thresholds
    }

    /// Highest rank whose experience threshold is `<= total_experience`.
    ///
    /// Day minimums are ignored; see [`RankTable::rank_for_progress`].
    pub fn rank_for_experience(&self, total_experience: i64) -> Rank {
        self.rank_for_progress(total_experience, u32::MAX)
    }

    /// Highest rank whose experience and active-day minimums are both met.
    ///
    /// Thresholds are cumulative, so the scan stops at the first unmet entry.
    pub fn rank_for_progress(&self, total_experience: i64, days_active: u32) -> Rank {
        let mut current = self
            .thresholds
            .first()
            .map_or(Rank::lowest(), |threshold| threshold.rank);
        for threshold in &self.thresholds {
            if !threshold.is_met(total_experience, days_active) {
                break;
            }
            current = threshold.rank;
        }
        current
    }
}

impl Default for RankTable {
    fn default() -> Self {
        Self {
            thresholds: default_rank_thresholds(),
        }
    }
}

/// Default hunter ladder.
pub fn default_rank_thresholds() -> Vec<RankThreshold> {
    vec![
        RankThreshold::new(Rank::F, 0),
        RankThreshold::new(Rank::E, 500),
        RankThreshold::new(Rank::D, 1_500),
        RankThreshold::new(Rank::C, 3_500),
        RankThreshold::new(Rank::B, 7_000),
        RankThreshold::new(Rank::A, 12_000),
        RankThreshold::new(Rank::S, 20_000),
        RankThreshold::new(Rank::SS, 35_000),
        RankThreshold::new(Rank::SSS, 60_000),
    ]
}

pub(crate) fn validate_rank_thresholds(thresholds: &[RankThreshold]) -> Result<(), RankTableError> {
    let first = thresholds.first().ok_or(RankTableError::Empty)?;
    if first.min_experience != 0 {
        return Err(RankTableError::FirstThresholdNotZero(first.min_experience));
    }
    for (position, pair) in thresholds.windows(2).enumerate() {
        let (lower, upper) = (&pair[0], &pair[1]);
        if upper.rank <= lower.rank || upper.min_experience <= lower.min_experience {
            return Err(RankTableError::NotIncreasing {
                position: position + 1,
            });
        }
    }
    Ok(())
}
