//! Progression use-case service (the engine orchestrator).
//!
//! # Responsibility
//! - Apply one activity at a time: load the hunter, run attendance, award
//!   experience, re-evaluate missions, persist once, return events.
//! - Provide quest, mission catalog and read-model use-cases around it.
//!
//! # Invariants
//! - Attendance (streak) runs before any category logic.
//! - Events are ordered attendance -> experience -> unlocks; level/rank
//!   events carry only the final standing of the activity.
//! - A rejected activity writes nothing.
//! - Level and rank are recomputed from stored experience on every load, so
//!   read models and `apply` agree under the active config.
//! - Mutating calls take `&mut self`, so one service never has two
//!   activities in flight.

use crate::clock::Clock;
use crate::config::{ConfigError, EngineConfig};
use crate::model::mission::{MissionCompletion, MissionId, PredefinedMission};
use crate::model::quest::{NewQuest, Quest, QuestId};
use crate::model::user::{DailyWinCategory, User, UserId};
use crate::progression::daily_wins;
use crate::progression::ledger::{ExperienceLedger, StandingChange};
use crate::progression::missions::{
    classify, newly_unlocked, visible_missions, CompletionIndex, MissionBoard, Unavailable,
};
use crate::progression::streak::{self, StreakChange};
use crate::repo::progress_repo::{ProgressCommit, ProgressionStore};
use crate::service::events::{Activity, CompletionTarget, ProgressEvent, ProgressionError};
use chrono::NaiveDate;
use log::{debug, info, warn};
use std::time::Instant;

pub type ProgressionResult<T> = Result<T, ProgressionError>;

/// Events collected per stage, flattened in stage order.
#[derive(Debug, Default)]
struct StagedEvents {
    attendance: Vec<ProgressEvent>,
    experience: Vec<ProgressEvent>,
    unlocks: Vec<ProgressEvent>,
}

impl StagedEvents {
    fn into_ordered(self) -> Vec<ProgressEvent> {
        let mut events = self.attendance;
        events.extend(self.experience);
        events.extend(self.unlocks);
        events
    }
}

/// Engine facade over a progression store and a clock.
pub struct ProgressionService<S: ProgressionStore, C: Clock> {
    store: S,
    clock: C,
    config: EngineConfig,
    ledger: ExperienceLedger,
}

impl<S: ProgressionStore, C: Clock> ProgressionService<S, C> {
    /// Creates a service after validating `config`.
    pub fn new(store: S, clock: C, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let ledger = ExperienceLedger::new(config.level_curve()?, config.rank_table()?);
        Ok(Self {
            store,
            clock,
            config,
            ledger,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Registers a new level-1 hunter starting today.
    pub fn register_user(&mut self, display_name: &str) -> ProgressionResult<User> {
        let mut user = User::new(display_name.trim(), self.clock.today());
        self.ledger.restate(&mut user);
        self.store.create_user(&user)?;
        info!(
            "event=user_register module=service status=ok user_id={}",
            user.id
        );
        Ok(user)
    }

    /// Current snapshot with daily wins shown as of today.
    pub fn user_snapshot(&self, user_id: UserId) -> ProgressionResult<User> {
        let mut user = self.load_standing(user_id)?;
        user.daily_wins = daily_wins::view(&user, self.clock.today());
        Ok(user)
    }

    /// Creates a quest for `user_id`.
    pub fn create_quest(&mut self, user_id: UserId, request: NewQuest) -> ProgressionResult<Quest> {
        self.load_user(user_id)?;
        let quest = Quest::from_request(user_id, request)?;
        self.store.create_quest(&quest)?;
        Ok(quest)
    }

    /// Quests of one hunter in creation order.
    pub fn list_quests(&self, user_id: UserId) -> ProgressionResult<Vec<Quest>> {
        self.load_user(user_id)?;
        Ok(self.store.list_quests(user_id)?)
    }

    /// Flags every overdue open quest as missed and returns the newly flagged.
    pub fn sweep_missed_quests(&mut self, user_id: UserId) -> ProgressionResult<Vec<Quest>> {
        let today = self.clock.today();
        let mut newly_missed = Vec::new();
        for mut quest in self.list_quests(user_id)? {
            if quest.refresh_missed(today) {
                self.store.update_quest(&quest)?;
                newly_missed.push(quest);
            }
        }
        if !newly_missed.is_empty() {
            info!(
                "event=quest_sweep module=service status=ok user_id={} missed={}",
                user_id,
                newly_missed.len()
            );
        }
        Ok(newly_missed)
    }

    /// Creates the recovery variant of a missed quest.
    ///
    /// # Errors
    /// - `AlreadyCompleted` when the quest is completed or already recovered.
    /// - `QuestNotMissed` while the deadline has not passed.
    pub fn create_recovery_quest(
        &mut self,
        user_id: UserId,
        quest_id: QuestId,
        deadline: Option<NaiveDate>,
    ) -> ProgressionResult<Quest> {
        let today = self.clock.today();
        let mut quest = self.owned_quest(user_id, quest_id)?;
        if quest.completed {
            return Err(ProgressionError::AlreadyCompleted(CompletionTarget::Quest(
                quest_id,
            )));
        }
        if self.store.recovery_for(quest_id)?.is_some() {
            return Err(ProgressionError::AlreadyCompleted(
                CompletionTarget::Recovery(quest_id),
            ));
        }
        if quest.refresh_missed(today) {
            self.store.update_quest(&quest)?;
        }
        if !quest.missed {
            return Err(ProgressionError::QuestNotMissed(quest_id));
        }

        let recovery = quest.recovery_variant(deadline);
        recovery.validate()?;
        self.store.create_quest(&recovery)?;
        info!(
            "event=quest_recovery module=service status=ok user_id={} quest_id={} recovery_id={}",
            user_id, quest_id, recovery.id
        );
        Ok(recovery)
    }

    /// Validates and upserts catalog entries. Returns how many were written.
    pub fn seed_missions(&mut self, catalog: &[PredefinedMission]) -> ProgressionResult<usize> {
        for mission in catalog {
            mission.validate()?;
        }
        for mission in catalog {
            self.store.upsert_mission(mission)?;
        }
        info!(
            "event=mission_seed module=service status=ok count={}",
            catalog.len()
        );
        Ok(catalog.len())
    }

    /// Read-only mission board for today. Invalid catalog rows are skipped.
    pub fn mission_board(&self, user_id: UserId) -> ProgressionResult<MissionBoard> {
        let user = self.load_standing(user_id)?;
        let catalog = self.valid_catalog(self.store.load_mission_catalog()?);
        let completions = self.completion_index(user_id)?;
        Ok(visible_missions(
            &catalog,
            user.rank,
            self.clock.today(),
            &completions,
        ))
    }

    /// Shortcut for `apply(MissionCompleted)`.
    pub fn complete_mission(
        &mut self,
        user_id: UserId,
        mission_id: impl Into<MissionId>,
    ) -> ProgressionResult<Vec<ProgressEvent>> {
        self.apply(
            user_id,
            Activity::MissionCompleted {
                mission_id: mission_id.into(),
            },
        )
    }

    /// Applies one activity and persists the result in a single commit.
    ///
    /// # Errors
    /// Any rejection leaves stored state unchanged.
    pub fn apply(
        &mut self,
        user_id: UserId,
        activity: Activity,
    ) -> ProgressionResult<Vec<ProgressEvent>> {
        let started_at = Instant::now();
        let kind = activity.kind();
        debug!("event=activity_apply module=service status=start kind={kind} user_id={user_id}");

        match self.apply_activity(user_id, &activity) {
            Ok(events) => {
                info!(
                    "event=activity_apply module=service status=ok kind={kind} user_id={user_id} events={} duration_ms={}",
                    events.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(events)
            }
            Err(err) => {
                info!(
                    "event=activity_apply module=service status=rejected kind={kind} user_id={user_id} duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn apply_activity(
        &mut self,
        user_id: UserId,
        activity: &Activity,
    ) -> ProgressionResult<Vec<ProgressEvent>> {
        let today = self.clock.today();
        let original = self.load_standing(user_id)?;
        let raw_catalog = self.store.load_mission_catalog()?;
        let catalog = self.valid_catalog(raw_catalog.clone());
        let mut completions = self.completion_index(user_id)?;
        let board_before = visible_missions(&catalog, original.rank, today, &completions);

        let mut events = StagedEvents::default();
        let mut user = original.clone();

        if self.config.streaks_enabled {
            let touched = streak::touch(&user, today);
            if let StreakChange::Broken { previous_days } = touched.change {
                events
                    .attendance
                    .push(ProgressEvent::StreakBroken { previous_days });
            }
            user = touched.user;
            // Day-gated ranks can move on attendance alone.
            self.ledger.restate(&mut user);
        }

        let mut touched_quest = None;
        let mut mission_completion = None;

        match activity {
            Activity::TaskCompleted {
                quest_id,
                task_index,
            } => {
                let mut quest = self.owned_quest(user_id, *quest_id)?;
                ensure_quest_open(&quest, today)?;
                let task = quest.tasks.get_mut(*task_index).ok_or(
                    ProgressionError::TaskNotFound {
                        quest_id: *quest_id,
                        task_index: *task_index,
                    },
                )?;
                if task.completed {
                    return Err(ProgressionError::AlreadyCompleted(
                        CompletionTarget::Task {
                            quest_id: *quest_id,
                            task_index: *task_index,
                        },
                    ));
                }
                task.completed = true;
                touched_quest = Some(quest);
            }
            Activity::QuestCompleted { quest_id } => {
                let mut quest = self.owned_quest(user_id, *quest_id)?;
                ensure_quest_open(&quest, today)?;
                quest.completed = true;
                quest.completed_on = Some(today);

                user = self.award(&user, quest.exp_reward, &mut events)?;
                user.gold = user
                    .gold
                    .saturating_add(self.config.quest_gold.for_difficulty(quest.difficulty));
                if let Some(category) = quest.category {
                    user = self.record_daily_win(&user, category, today, &mut events)?;
                }
                completions.record_prerequisite(quest.id.to_string());
                touched_quest = Some(quest);
            }
            Activity::MissionCompleted { mission_id } => {
                let mission = raw_catalog
                    .iter()
                    .find(|mission| &mission.id == mission_id)
                    .ok_or_else(|| ProgressionError::MissionNotFound(mission_id.clone()))?;
                mission.validate()?;
                if completions.mission_completed_at(mission_id).is_some() {
                    return Err(ProgressionError::AlreadyCompleted(
                        CompletionTarget::Mission(mission_id.clone()),
                    ));
                }
                if let Some(reason) =
                    classify(mission, user.rank, today, &completions).into_unavailable()
                {
                    return Err(ProgressionError::NotAvailable(reason));
                }

                user = self.award(&user, mission.exp_reward, &mut events)?;
                completions.record_mission(mission_id.clone(), today);
                mission_completion = Some(MissionCompletion {
                    user_id,
                    mission_id: mission_id.clone(),
                    completed_at: today,
                });
            }
            Activity::DailyWinRecorded { category } => {
                user = self.record_daily_win(&user, *category, today, &mut events)?;
            }
        }

        let change = StandingChange {
            previous_level: original.level,
            level: user.level,
            previous_rank: original.rank,
            rank: user.rank,
        };
        if change.leveled_up() {
            events.experience.push(ProgressEvent::LeveledUp {
                level: change.level,
                previous_level: change.previous_level,
            });
        }
        if change.ranked_up() {
            events.experience.push(ProgressEvent::RankedUp {
                rank: change.rank,
                previous_rank: change.previous_rank,
            });
        }

        let board_after = visible_missions(&catalog, user.rank, today, &completions);
        for entry in newly_unlocked(&board_before, &board_after) {
            events.unlocks.push(ProgressEvent::MissionUnlocked {
                mission_id: entry.mission.id.clone(),
                title: entry.mission.title.clone(),
            });
        }

        self.store.commit(&ProgressCommit {
            user: &user,
            quest: touched_quest.as_ref(),
            mission_completion: mission_completion.as_ref(),
        })?;

        Ok(events.into_ordered())
    }

    fn award(
        &self,
        user: &User,
        amount: i64,
        events: &mut StagedEvents,
    ) -> ProgressionResult<User> {
        let outcome = self.ledger.award(user, amount)?;
        events.experience.push(ProgressEvent::ExperienceGained {
            amount,
            total: outcome.user.experience,
        });
        Ok(outcome.user)
    }

    fn record_daily_win(
        &self,
        user: &User,
        category: DailyWinCategory,
        today: NaiveDate,
        events: &mut StagedEvents,
    ) -> ProgressionResult<User> {
        let recorded = daily_wins::record_win(user, category, today);
        if !recorded.newly_completed {
            return Ok(recorded.user);
        }
        events
            .attendance
            .push(ProgressEvent::DailyWinCompleted { category });
        if self.config.daily_win_exp > 0 {
            return self.award(&recorded.user, self.config.daily_win_exp, events);
        }
        Ok(recorded.user)
    }

    fn load_user(&self, user_id: UserId) -> ProgressionResult<User> {
        self.store
            .load_user(user_id)?
            .ok_or(ProgressionError::UserNotFound(user_id))
    }

    /// Loads a hunter with level and rank recomputed under the active config.
    fn load_standing(&self, user_id: UserId) -> ProgressionResult<User> {
        let mut user = self.load_user(user_id)?;
        self.ledger.restate(&mut user);
        Ok(user)
    }

    /// Loads a quest, hiding quests owned by other hunters.
    fn owned_quest(&self, user_id: UserId, quest_id: QuestId) -> ProgressionResult<Quest> {
        match self.store.get_quest(quest_id)? {
            Some(quest) if quest.user_id == user_id => Ok(quest),
            _ => Err(ProgressionError::QuestNotFound(quest_id)),
        }
    }

    fn completion_index(&self, user_id: UserId) -> ProgressionResult<CompletionIndex> {
        let mut index = CompletionIndex::from_completions(&self.store.mission_completions(user_id)?);
        for quest in self.store.list_quests(user_id)? {
            if quest.completed {
                index.record_prerequisite(quest.id.to_string());
            }
        }
        Ok(index)
    }

    fn valid_catalog(&self, catalog: Vec<PredefinedMission>) -> Vec<PredefinedMission> {
        catalog
            .into_iter()
            .filter(|mission| match mission.validate() {
                Ok(()) => true,
                Err(err) => {
                    warn!(
                        "event=mission_catalog module=service status=skipped mission_id={} error={}",
                        mission.id, err
                    );
                    false
                }
            })
            .collect()
    }
}

fn ensure_quest_open(quest: &Quest, today: NaiveDate) -> ProgressionResult<()> {
    if quest.completed {
        return Err(ProgressionError::AlreadyCompleted(CompletionTarget::Quest(
            quest.id,
        )));
    }
    if quest.missed || quest.is_overdue(today) {
        if let Some(deadline) = quest.deadline {
            return Err(ProgressionError::NotAvailable(Unavailable::QuestMissed {
                deadline,
            }));
        }
    }
    Ok(())
}
