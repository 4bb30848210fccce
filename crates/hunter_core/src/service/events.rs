//! Activity inputs, progress event outputs and service errors.
//!
//! # Invariants
//! - Events are emitted in stage order: attendance, experience, unlocks.
//! - Every rejection is a typed `ProgressionError`; nothing is persisted for
//!   a rejected activity.

use crate::model::mission::{MissionId, MissionValidationError};
use crate::model::quest::{QuestId, QuestValidationError};
use crate::model::rank::Rank;
use crate::model::user::{DailyWinCategory, UserId, UserValidationError};
use crate::progression::ledger::InvalidAmount;
use crate::progression::missions::Unavailable;
use crate::repo::progress_repo::RepoError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// User-facing mutation applied through the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Activity {
    /// Checks off one quest sub-task (0-based index). Grants no experience.
    TaskCompleted { quest_id: QuestId, task_index: usize },
    QuestCompleted { quest_id: QuestId },
    MissionCompleted { mission_id: MissionId },
    DailyWinRecorded { category: DailyWinCategory },
}

impl Activity {
    /// Stable name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TaskCompleted { .. } => "task_completed",
            Self::QuestCompleted { .. } => "quest_completed",
            Self::MissionCompleted { .. } => "mission_completed",
            Self::DailyWinRecorded { .. } => "daily_win_recorded",
        }
    }
}

/// Notification produced by an applied activity, rendered by the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressEvent {
    StreakBroken { previous_days: u32 },
    DailyWinCompleted { category: DailyWinCategory },
    ExperienceGained { amount: i64, total: i64 },
    LeveledUp { level: u32, previous_level: u32 },
    RankedUp { rank: Rank, previous_rank: Rank },
    MissionUnlocked { mission_id: MissionId, title: String },
}

/// Entity a duplicate completion was attempted on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionTarget {
    Task { quest_id: QuestId, task_index: usize },
    Quest(QuestId),
    Mission(MissionId),
    /// A recovery quest already exists for this quest.
    Recovery(QuestId),
}

impl Display for CompletionTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Task {
                quest_id,
                task_index,
            } => write!(f, "task #{task_index} of quest {quest_id}"),
            Self::Quest(id) => write!(f, "quest {id}"),
            Self::Mission(id) => write!(f, "mission {id}"),
            Self::Recovery(id) => write!(f, "recovery of quest {id}"),
        }
    }
}

/// Errors from progression use-cases.
#[derive(Debug)]
pub enum ProgressionError {
    InvalidAmount(i64),
    UserNotFound(UserId),
    QuestNotFound(QuestId),
    TaskNotFound { quest_id: QuestId, task_index: usize },
    MissionNotFound(MissionId),
    /// Duplicate completion; the call was a no-op.
    AlreadyCompleted(CompletionTarget),
    NotAvailable(Unavailable),
    /// Recovery requested for a quest whose deadline has not passed.
    QuestNotMissed(QuestId),
    InvalidUser(UserValidationError),
    InvalidQuest(QuestValidationError),
    InvalidMission(MissionValidationError),
    Repo(RepoError),
}

impl Display for ProgressionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAmount(amount) => {
                write!(f, "experience award must be > 0, got {amount}")
            }
            Self::UserNotFound(id) => write!(f, "user not found: {id}"),
            Self::QuestNotFound(id) => write!(f, "quest not found: {id}"),
            Self::TaskNotFound {
                quest_id,
                task_index,
            } => write!(f, "task #{task_index} not found in quest {quest_id}"),
            Self::MissionNotFound(id) => write!(f, "mission not found: {id}"),
            Self::AlreadyCompleted(target) => write!(f, "already completed: {target}"),
            Self::NotAvailable(reason) => write!(f, "not available: {reason}"),
            Self::QuestNotMissed(id) => write!(f, "quest has not been missed: {id}"),
            Self::InvalidUser(err) => write!(f, "{err}"),
            Self::InvalidQuest(err) => write!(f, "{err}"),
            Self::InvalidMission(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ProgressionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotAvailable(reason) => Some(reason),
            Self::InvalidUser(err) => Some(err),
            Self::InvalidQuest(err) => Some(err),
            Self::InvalidMission(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ProgressionError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::UserNotFound(id) => Self::UserNotFound(id),
            RepoError::QuestNotFound(id) => Self::QuestNotFound(id),
            RepoError::MissionNotFound(id) => Self::MissionNotFound(id),
            RepoError::InvalidUser(err) => Self::InvalidUser(err),
            RepoError::InvalidQuest(err) => Self::InvalidQuest(err),
            RepoError::InvalidMission(err) => Self::InvalidMission(err),
            other => Self::Repo(other),
        }
    }
}

impl From<InvalidAmount> for ProgressionError {
    fn from(value: InvalidAmount) -> Self {
        Self::InvalidAmount(value.0)
    }
}

impl From<QuestValidationError> for ProgressionError {
    fn from(value: QuestValidationError) -> Self {
        Self::InvalidQuest(value)
    }
}

impl From<MissionValidationError> for ProgressionError {
    fn from(value: MissionValidationError) -> Self {
        Self::InvalidMission(value)
    }
}
