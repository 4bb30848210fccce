//! Quest domain model.
//!
//! # Responsibility
//! - Define quests with sub-tasks, deadlines and difficulty.
//! - Provide lifecycle helpers: task toggling, completion, missed detection
//!   and recovery-quest derivation.
//!
//! # Invariants
//! - `exp_reward > 0`.
//! - A completed quest is never marked missed, and a missed quest is never
//!   completed.
//! - Sub-tasks carry no reward of their own.

use crate::model::user::{DailyWinCategory, UserId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable quest identifier.
pub type QuestId = Uuid;

const RECOVERY_TITLE_PREFIX: &str = "Recovery: ";

/// Quest difficulty tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
    Boss,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Normal => "normal",
            Self::Hard => "hard",
            Self::Boss => "boss",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "easy" => Some(Self::Easy),
            "normal" => Some(Self::Normal),
            "hard" => Some(Self::Hard),
            "boss" => Some(Self::Boss),
            _ => None,
        }
    }
}

/// One checklist item inside a quest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestTask {
    pub description: String,
    pub completed: bool,
}

impl QuestTask {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            completed: false,
        }
    }
}

/// Caller input for creating a quest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuest {
    pub title: String,
    pub is_main_quest: bool,
    pub is_daily: bool,
    pub difficulty: Difficulty,
    pub exp_reward: i64,
    pub deadline: Option<NaiveDate>,
    pub category: Option<DailyWinCategory>,
    pub tasks: Vec<String>,
}

impl NewQuest {
    /// Side quest with no deadline, category or tasks.
    pub fn side(title: impl Into<String>, difficulty: Difficulty, exp_reward: i64) -> Self {
        Self {
            title: title.into(),
            is_main_quest: false,
            is_daily: false,
            difficulty,
            exp_reward,
            deadline: None,
            category: None,
            tasks: Vec::new(),
        }
    }
}

/// Quest owned by one hunter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quest {
    pub id: QuestId,
    pub user_id: UserId,
    pub title: String,
    pub is_main_quest: bool,
    pub is_daily: bool,
    pub difficulty: Difficulty,
    pub exp_reward: i64,
    pub completed: bool,
    pub completed_on: Option<NaiveDate>,
    pub deadline: Option<NaiveDate>,
    pub missed: bool,
    /// Quest this one was created to recover, if any.
    pub recovery_of: Option<QuestId>,
    /// Completing the quest also records a daily win in this category.
    pub category: Option<DailyWinCategory>,
    pub tasks: Vec<QuestTask>,
}

impl Quest {
    /// Builds and validates a quest from caller input.
    pub fn from_request(user_id: UserId, request: NewQuest) -> Result<Self, QuestValidationError> {
        let quest = Self {
            id: Uuid::new_v4(),
            user_id,
            title: request.title.trim().to_string(),
            is_main_quest: request.is_main_quest,
            is_daily: request.is_daily,
            difficulty: request.difficulty,
            exp_reward: request.exp_reward,
            completed: false,
            completed_on: None,
            deadline: request.deadline,
            missed: false,
            recovery_of: None,
            category: request.category,
            tasks: request.tasks.into_iter().map(QuestTask::new).collect(),
        };
        quest.validate()?;
        Ok(quest)
    }

    /// Validates quest invariants.
    pub fn validate(&self) -> Result<(), QuestValidationError> {
        if self.id.is_nil() {
            return Err(QuestValidationError::NilId);
        }
        if self.title.trim().is_empty() {
            return Err(QuestValidationError::EmptyTitle);
        }
        if self.exp_reward <= 0 {
            return Err(QuestValidationError::NonPositiveReward(self.exp_reward));
        }
        if self.completed && self.missed {
            return Err(QuestValidationError::CompletedAndMissed);
        }
        if let Some(index) = self
            .tasks
            .iter()
            .position(|task| task.description.trim().is_empty())
        {
            return Err(QuestValidationError::EmptyTaskDescription(index));
        }
        Ok(())
    }

    /// Whether the deadline has passed while the quest is still open.
    ///
    /// The deadline day itself still counts as on time.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.completed && self.deadline.is_some_and(|deadline| today > deadline)
    }

    /// Sets `missed` when overdue. Returns whether the flag changed.
    pub fn refresh_missed(&mut self, today: NaiveDate) -> bool {
        if self.missed || !self.is_overdue(today) {
            return false;
        }
        self.missed = true;
        true
    }

    /// Derives the recovery variant of a missed quest.
    ///
    /// Same difficulty and category, half the experience (at least 1), fresh
    /// copies of every sub-task.
    pub fn recovery_variant(&self, deadline: Option<NaiveDate>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            title: format!("{RECOVERY_TITLE_PREFIX}{}", self.title),
            is_main_quest: self.is_main_quest,
            is_daily: self.is_daily,
            difficulty: self.difficulty,
            exp_reward: (self.exp_reward / 2).max(1),
            completed: false,
            completed_on: None,
            deadline,
            missed: false,
            recovery_of: Some(self.id),
            category: self.category,
            tasks: self
                .tasks
                .iter()
                .map(|task| QuestTask::new(task.description.clone()))
                .collect(),
        }
    }
}

/// Quest invariant violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestValidationError {
    NilId,
    EmptyTitle,
    NonPositiveReward(i64),
    CompletedAndMissed,
    EmptyTaskDescription(usize),
}

impl Display for QuestValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "quest id must not be nil"),
            Self::EmptyTitle => write!(f, "quest title must not be blank"),
            Self::NonPositiveReward(value) => {
                write!(f, "quest exp_reward must be > 0, got {value}")
            }
            Self::CompletedAndMissed => write!(f, "quest cannot be both completed and missed"),
            Self::EmptyTaskDescription(index) => {
                write!(f, "quest task #{index} has a blank description")
            }
        }
    }
}

impl Error for QuestValidationError {}

#[cfg(test)]
mod tests {
    use super::{Difficulty, NewQuest, Quest, QuestValidationError};
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).expect("valid date")
    }

    fn quest_with_deadline(deadline: NaiveDate) -> Quest {
        let mut request = NewQuest::side("Run 5k", Difficulty::Hard, 81);
        request.deadline = Some(deadline);
        request.tasks = vec!["stretch".to_string(), "run".to_string()];
        Quest::from_request(Uuid::new_v4(), request).expect("valid quest")
    }

    #[test]
    fn from_request_rejects_non_positive_reward() {
        let err = Quest::from_request(
            Uuid::new_v4(),
            NewQuest::side("Read", Difficulty::Easy, 0),
        )
        .expect_err("zero reward must fail");
        assert_eq!(err, QuestValidationError::NonPositiveReward(0));
    }

    #[test]
    fn deadline_day_is_not_overdue() {
        let mut quest = quest_with_deadline(day(10));
        assert!(!quest.refresh_missed(day(10)));
        assert!(!quest.missed);
        assert!(quest.refresh_missed(day(11)));
        assert!(quest.missed);
        assert!(!quest.refresh_missed(day(12)), "flag changes only once");
    }

    #[test]
    fn completed_quest_is_never_overdue() {
        let mut quest = quest_with_deadline(day(10));
        quest.completed = true;
        assert!(!quest.refresh_missed(day(20)));
    }

    #[test]
    fn recovery_variant_halves_reward_and_resets_tasks() {
        let mut quest = quest_with_deadline(day(10));
        quest.tasks[0].completed = true;
        quest.missed = true;

        let recovery = quest.recovery_variant(Some(day(15)));
        assert_ne!(recovery.id, quest.id);
        assert_eq!(recovery.recovery_of, Some(quest.id));
        assert_eq!(recovery.title, "Recovery: Run 5k");
        assert_eq!(recovery.exp_reward, 40);
        assert_eq!(recovery.difficulty, Difficulty::Hard);
        assert!(!recovery.missed);
        assert!(recovery.tasks.iter().all(|task| !task.completed));
        assert!(recovery.validate().is_ok());
    }

    #[test]
    fn recovery_reward_never_drops_to_zero() {
        let mut quest = quest_with_deadline(day(10));
        quest.exp_reward = 1;
        assert_eq!(quest.recovery_variant(None).exp_reward, 1);
    }
}
