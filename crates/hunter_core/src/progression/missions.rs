//! Mission availability filter.
//!
//! # Responsibility
//! - Classify catalog missions for one hunter as available, locked or
//!   expired, with the precise lock reason.
//! - Partition a catalog into the board buckets shown to the hunter.
//!
//! # Invariants
//! - Precedence per entry: expired, then rank, then release date, then
//!   prerequisites, then available.
//! - Expired is terminal: an expired mission never lands in another bucket.
//! - Every rank-locked mission also appears in `upcoming_preview`.
//! - Pure query: completion state is read, never written.

use crate::model::mission::{MissionCompletion, MissionId, PredefinedMission};
use crate::model::rank::Rank;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Why a mission (or quest) cannot be completed right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Unavailable {
    Expired { expiry_date: NaiveDate },
    RankTooLow { required: Rank, current: Rank },
    NotYetReleased { release_date: NaiveDate },
    PrerequisitesIncomplete { missing: Vec<String> },
    QuestMissed { deadline: NaiveDate },
}

impl Display for Unavailable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Expired { expiry_date } => write!(f, "expired on {expiry_date}"),
            Self::RankTooLow { required, current } => {
                write!(f, "requires rank {required}, hunter is rank {current}")
            }
            Self::NotYetReleased { release_date } => write!(f, "releases on {release_date}"),
            Self::PrerequisitesIncomplete { missing } => {
                write!(f, "prerequisites incomplete: {}", missing.join(", "))
            }
            Self::QuestMissed { deadline } => write!(f, "quest deadline {deadline} was missed"),
        }
    }
}

impl Error for Unavailable {}

/// Single-mission classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissionState {
    Available,
    Locked(Unavailable),
    Expired(Unavailable),
}

impl MissionState {
    /// The blocking reason, `None` when available.
    pub fn into_unavailable(self) -> Option<Unavailable> {
        match self {
            Self::Available => None,
            Self::Locked(reason) | Self::Expired(reason) => Some(reason),
        }
    }
}

/// Per-hunter completion overlay keyed by mission id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionIndex {
    missions: BTreeMap<MissionId, NaiveDate>,
    /// Every completed id (missions and quests) for prerequisite checks.
    satisfied: BTreeSet<String>,
}

impl CompletionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_completions<'a>(
        completions: impl IntoIterator<Item = &'a MissionCompletion>,
    ) -> Self {
        let mut index = Self::new();
        for completion in completions {
            index.record_mission(completion.mission_id.clone(), completion.completed_at);
        }
        index
    }

    pub fn record_mission(&mut self, mission_id: MissionId, completed_at: NaiveDate) {
        self.satisfied.insert(mission_id.clone());
        self.missions.insert(mission_id, completed_at);
    }

    /// Marks a non-mission prerequisite (e.g. a quest id) as done.
    pub fn record_prerequisite(&mut self, id: impl Into<String>) {
        self.satisfied.insert(id.into());
    }

    pub fn mission_completed_at(&self, mission_id: &str) -> Option<NaiveDate> {
        self.missions.get(mission_id).copied()
    }

    pub fn is_satisfied(&self, id: &str) -> bool {
        self.satisfied.contains(id)
    }
}

/// Catalog entry joined with the hunter's completion overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissionEntry {
    pub mission: PredefinedMission,
    pub completed_at: Option<NaiveDate>,
}

/// Board buckets for one hunter on one day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MissionBoard {
    pub available: Vec<MissionEntry>,
    pub locked: Vec<MissionEntry>,
    pub upcoming_preview: Vec<MissionEntry>,
    pub expired: Vec<MissionEntry>,
}

impl MissionBoard {
    pub fn is_available(&self, mission_id: &str) -> bool {
        self.available
            .iter()
            .any(|entry| entry.mission.id == mission_id)
    }

    /// Available missions not yet completed, in catalog order.
    pub fn open_ids(&self) -> Vec<&str> {
        self.available
            .iter()
            .filter(|entry| entry.completed_at.is_none())
            .map(|entry| entry.mission.id.as_str())
            .collect()
    }
}

/// Classifies one mission by the precedence chain.
pub fn classify(
    mission: &PredefinedMission,
    user_rank: Rank,
    today: NaiveDate,
    completions: &CompletionIndex,
) -> MissionState {
    if let Some(expiry_date) = mission.expiry_date {
        if today > expiry_date {
            return MissionState::Expired(Unavailable::Expired { expiry_date });
        }
    }
    if mission.rank.index() > user_rank.index() {
        return MissionState::Locked(Unavailable::RankTooLow {
            required: mission.rank,
            current: user_rank,
        });
    }
    if mission.release_date > today {
        return MissionState::Locked(Unavailable::NotYetReleased {
            release_date: mission.release_date,
        });
    }
    let missing: Vec<String> = mission
        .required_tasks
        .iter()
        .filter(|required| !completions.is_satisfied(required))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return MissionState::Locked(Unavailable::PrerequisitesIncomplete { missing });
    }
    MissionState::Available
}

/// Partitions the catalog into board buckets.
pub fn visible_missions(
    catalog: &[PredefinedMission],
    user_rank: Rank,
    today: NaiveDate,
    completions: &CompletionIndex,
) -> MissionBoard {
    let mut board = MissionBoard::default();
    for mission in catalog {
        let entry = MissionEntry {
            mission: mission.clone(),
            completed_at: completions.mission_completed_at(&mission.id),
        };
        match classify(mission, user_rank, today, completions) {
            MissionState::Available => board.available.push(entry),
            MissionState::Expired(_) => board.expired.push(entry),
            MissionState::Locked(Unavailable::RankTooLow { .. }) => {
                board.upcoming_preview.push(entry.clone());
                board.locked.push(entry);
            }
            MissionState::Locked(_) => board.locked.push(entry),
        }
    }
    board
}

/// Entries open on `after` that were not open on `before`, in `after` order.
pub fn newly_unlocked<'a>(
    before: &MissionBoard,
    after: &'a MissionBoard,
) -> Vec<&'a MissionEntry> {
    let previously_open: BTreeSet<&str> = before.open_ids().into_iter().collect();
    after
        .available
        .iter()
        .filter(|entry| entry.completed_at.is_none())
        .filter(|entry| !previously_open.contains(entry.mission.id.as_str()))
        .collect()
}
