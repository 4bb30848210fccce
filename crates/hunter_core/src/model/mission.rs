//! Predefined mission catalog entries and per-user completion records.
//!
//! # Responsibility
//! - Define the immutable mission template shared by every hunter.
//! - Keep completion state in a separate `(user, mission)` record so one
//!   hunter's progress never leaks into another's view.
//!
//! # Invariants
//! - `day >= 1` and `exp_reward > 0`.
//! - `expiry_date`, when set, is not earlier than `release_date`.

use crate::model::rank::Rank;
use crate::model::user::UserId;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable catalog key of one mission, e.g. `e-day-03`.
pub type MissionId = String;

/// Catalog template of one mission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredefinedMission {
    pub id: MissionId,
    pub title: String,
    /// Minimum rank needed to take the mission.
    pub rank: Rank,
    /// Release offset in days, 1-based.
    pub day: u32,
    pub release_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    /// Ids that must all be completed first (missions or quests).
    #[serde(default)]
    pub required_tasks: Vec<String>,
    pub exp_reward: i64,
}

impl PredefinedMission {
    /// Builds a mission released `day - 1` days after `season_start`.
    pub fn scheduled(
        id: impl Into<MissionId>,
        title: impl Into<String>,
        rank: Rank,
        day: u32,
        season_start: NaiveDate,
        exp_reward: i64,
    ) -> Result<Self, MissionValidationError> {
        if day == 0 {
            return Err(MissionValidationError::DayBelowOne);
        }
        let release_date = season_start
            .checked_add_days(Days::new(u64::from(day - 1)))
            .ok_or(MissionValidationError::DateOutOfRange)?;
        let mission = Self {
            id: id.into(),
            title: title.into(),
            rank,
            day,
            release_date,
            expiry_date: None,
            required_tasks: Vec::new(),
            exp_reward,
        };
        mission.validate()?;
        Ok(mission)
    }

    pub fn with_expiry(mut self, expiry_date: NaiveDate) -> Self {
        self.expiry_date = Some(expiry_date);
        self
    }

    pub fn with_required(mut self, required: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.required_tasks = required.into_iter().map(Into::into).collect();
        self
    }

    /// Validates catalog invariants.
    pub fn validate(&self) -> Result<(), MissionValidationError> {
        if self.id.trim().is_empty() {
            return Err(MissionValidationError::EmptyId);
        }
        if self.title.trim().is_empty() {
            return Err(MissionValidationError::EmptyTitle);
        }
        if self.day == 0 {
            return Err(MissionValidationError::DayBelowOne);
        }
        if self.exp_reward <= 0 {
            return Err(MissionValidationError::NonPositiveReward(self.exp_reward));
        }
        if let Some(expiry) = self.expiry_date {
            if expiry < self.release_date {
                return Err(MissionValidationError::ExpiresBeforeRelease {
                    release_date: self.release_date,
                    expiry_date: expiry,
                });
            }
        }
        if self
            .required_tasks
            .iter()
            .any(|required| required.trim().is_empty())
        {
            return Err(MissionValidationError::EmptyRequirement);
        }
        Ok(())
    }
}

/// One hunter's completion of one mission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionCompletion {
    pub user_id: UserId,
    pub mission_id: MissionId,
    pub completed_at: NaiveDate,
}

/// Mission catalog invariant violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissionValidationError {
    EmptyId,
    EmptyTitle,
    DayBelowOne,
    DateOutOfRange,
    NonPositiveReward(i64),
    ExpiresBeforeRelease {
        release_date: NaiveDate,
        expiry_date: NaiveDate,
    },
    EmptyRequirement,
}

impl Display for MissionValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "mission id must not be blank"),
            Self::EmptyTitle => write!(f, "mission title must not be blank"),
            Self::DayBelowOne => write!(f, "mission day must be at least 1"),
            Self::DateOutOfRange => write!(f, "mission release date is out of range"),
            Self::NonPositiveReward(value) => {
                write!(f, "mission exp_reward must be > 0, got {value}")
            }
            Self::ExpiresBeforeRelease {
                release_date,
                expiry_date,
            } => write!(
                f,
                "mission expires on {expiry_date} before its release on {release_date}"
            ),
            Self::EmptyRequirement => write!(f, "mission requirement ids must not be blank"),
        }
    }
}

impl Error for MissionValidationError {}
