//! Progression store contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist hunter snapshots, quests, the mission catalog and per-user
//!   mission completion records.
//! - Provide one atomic write (`commit`) for everything a single activity
//!   changes.
//!
//! # Invariants
//! - Write paths validate entities before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - `commit` either writes every part or nothing.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::mission::{
    MissionCompletion, MissionId, MissionValidationError, PredefinedMission,
};
use crate::model::quest::{Difficulty, Quest, QuestId, QuestTask, QuestValidationError};
use crate::model::rank::Rank;
use crate::model::user::{DailyWinCategory, DailyWinProgress, User, UserId, UserValidationError};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";

const USER_SELECT_SQL: &str = "SELECT
    id,
    display_name,
    level,
    experience,
    experience_to_next_level,
    rank,
    gold,
    streak_days,
    longest_streak,
    days_active,
    daily_wins,
    last_active,
    created_on
FROM users";

const QUEST_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    title,
    is_main_quest,
    is_daily,
    difficulty,
    exp_reward,
    completed,
    completed_on,
    deadline,
    missed,
    recovery_of,
    category,
    tasks
FROM quests";

const MISSION_SELECT_SQL: &str = "SELECT
    id,
    title,
    rank,
    day,
    release_date,
    expiry_date,
    required_tasks,
    exp_reward
FROM missions";

const REQUIRED_TABLES: [&str; 4] = ["users", "quests", "missions", "mission_completions"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for progression persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    UserNotFound(UserId),
    QuestNotFound(QuestId),
    MissionNotFound(MissionId),
    InvalidUser(UserValidationError),
    InvalidQuest(QuestValidationError),
    InvalidMission(MissionValidationError),
    /// Connection schema is not at the version this store expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UserNotFound(id) => write!(f, "user not found: {id}"),
            Self::QuestNotFound(id) => write!(f, "quest not found: {id}"),
            Self::MissionNotFound(id) => write!(f, "mission not found: {id}"),
            Self::InvalidUser(err) => write!(f, "{err}"),
            Self::InvalidQuest(err) => write!(f, "{err}"),
            Self::InvalidMission(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "progression store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "progression store requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidUser(err) => Some(err),
            Self::InvalidQuest(err) => Some(err),
            Self::InvalidMission(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<UserValidationError> for RepoError {
    fn from(value: UserValidationError) -> Self {
        Self::InvalidUser(value)
    }
}

impl From<QuestValidationError> for RepoError {
    fn from(value: QuestValidationError) -> Self {
        Self::InvalidQuest(value)
    }
}

impl From<MissionValidationError> for RepoError {
    fn from(value: MissionValidationError) -> Self {
        Self::InvalidMission(value)
    }
}

/// Everything one applied activity writes, persisted atomically.
#[derive(Debug, Clone, Copy)]
pub struct ProgressCommit<'a> {
    pub user: &'a User,
    /// Quest whose state changed (task toggled or completed).
    pub quest: Option<&'a Quest>,
    pub mission_completion: Option<&'a MissionCompletion>,
}

/// Persistence collaborator consumed by the progression service.
pub trait ProgressionStore {
    fn create_user(&self, user: &User) -> RepoResult<()>;
    fn load_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn save_user(&self, user: &User) -> RepoResult<()>;

    /// Inserts or replaces one catalog entry by id.
    fn upsert_mission(&self, mission: &PredefinedMission) -> RepoResult<()>;
    /// Catalog ordered by `day ASC, id ASC`.
    fn load_mission_catalog(&self) -> RepoResult<Vec<PredefinedMission>>;
    fn mission_completions(&self, user_id: UserId) -> RepoResult<Vec<MissionCompletion>>;

    fn create_quest(&self, quest: &Quest) -> RepoResult<()>;
    fn get_quest(&self, id: QuestId) -> RepoResult<Option<Quest>>;
    /// Quests of one user in creation order.
    fn list_quests(&self, user_id: UserId) -> RepoResult<Vec<Quest>>;
    fn update_quest(&self, quest: &Quest) -> RepoResult<()>;
    /// Recovery quest created for `quest_id`, if any.
    fn recovery_for(&self, quest_id: QuestId) -> RepoResult<Option<Quest>>;

    /// Writes user snapshot, touched quest and mission completion together.
    fn commit(&mut self, commit: &ProgressCommit<'_>) -> RepoResult<()>;
}

/// SQLite-backed progression store.
pub struct SqliteProgressionStore<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteProgressionStore<'conn> {
    /// Constructs a store from a migrated connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_store_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ProgressionStore for SqliteProgressionStore<'_> {
    fn create_user(&self, user: &User) -> RepoResult<()> {
        user.validate()?;
        self.conn.execute(
            "INSERT INTO users (
                id,
                display_name,
                level,
                experience,
                experience_to_next_level,
                rank,
                gold,
                streak_days,
                longest_streak,
                days_active,
                daily_wins,
                last_active,
                created_on
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
            params![
                user.id.to_string(),
                user.display_name.as_str(),
                user.level,
                user.experience,
                user.experience_to_next_level,
                user.rank.label(),
                user.gold,
                user.streak_days,
                user.longest_streak,
                user.days_active,
                encode_json(&user.daily_wins)?,
                user.last_active.map(format_date),
                format_date(user.created_on),
            ],
        )?;
        Ok(())
    }

    fn load_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }
        Ok(None)
    }

    fn save_user(&self, user: &User) -> RepoResult<()> {
        update_user(self.conn, user)
    }

    fn upsert_mission(&self, mission: &PredefinedMission) -> RepoResult<()> {
        mission.validate()?;
        self.conn.execute(
            "INSERT INTO missions (
                id,
                title,
                rank,
                day,
                release_date,
                expiry_date,
                required_tasks,
                exp_reward
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                rank = excluded.rank,
                day = excluded.day,
                release_date = excluded.release_date,
                expiry_date = excluded.expiry_date,
                required_tasks = excluded.required_tasks,
                exp_reward = excluded.exp_reward;",
            params![
                mission.id.as_str(),
                mission.title.as_str(),
                mission.rank.label(),
                mission.day,
                format_date(mission.release_date),
                mission.expiry_date.map(format_date),
                encode_json(&mission.required_tasks)?,
                mission.exp_reward,
            ],
        )?;
        Ok(())
    }

    fn load_mission_catalog(&self) -> RepoResult<Vec<PredefinedMission>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MISSION_SELECT_SQL} ORDER BY day ASC, id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut missions = Vec::new();
        while let Some(row) = rows.next()? {
            missions.push(parse_mission_row(row)?);
        }
        Ok(missions)
    }

    fn mission_completions(&self, user_id: UserId) -> RepoResult<Vec<MissionCompletion>> {
        let mut stmt = self.conn.prepare(
            "SELECT mission_id, completed_at
             FROM mission_completions
             WHERE user_id = ?1
             ORDER BY completed_at ASC, mission_id ASC;",
        )?;
        let mut rows = stmt.query([user_id.to_string()])?;
        let mut completions = Vec::new();
        while let Some(row) = rows.next()? {
            let completed_at: String = row.get("completed_at")?;
            completions.push(MissionCompletion {
                user_id,
                mission_id: row.get("mission_id")?,
                completed_at: parse_date(&completed_at, "mission_completions.completed_at")?,
            });
        }
        Ok(completions)
    }

    fn create_quest(&self, quest: &Quest) -> RepoResult<()> {
        quest.validate()?;
        self.conn.execute(
            "INSERT INTO quests (
                id,
                user_id,
                title,
                is_main_quest,
                is_daily,
                difficulty,
                exp_reward,
                completed,
                completed_on,
                deadline,
                missed,
                recovery_of,
                category,
                tasks
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14);",
            params![
                quest.id.to_string(),
                quest.user_id.to_string(),
                quest.title.as_str(),
                quest.is_main_quest,
                quest.is_daily,
                quest.difficulty.as_str(),
                quest.exp_reward,
                quest.completed,
                quest.completed_on.map(format_date),
                quest.deadline.map(format_date),
                quest.missed,
                quest.recovery_of.map(|id| id.to_string()),
                quest.category.map(DailyWinCategory::as_str),
                encode_json(&quest.tasks)?,
            ],
        )?;
        Ok(())
    }

    fn get_quest(&self, id: QuestId) -> RepoResult<Option<Quest>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{QUEST_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_quest_row(row)?));
        }
        Ok(None)
    }

    fn list_quests(&self, user_id: UserId) -> RepoResult<Vec<Quest>> {
        let mut stmt = self.conn.prepare(&format!(
            "{QUEST_SELECT_SQL} WHERE user_id = ?1 ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([user_id.to_string()])?;
        let mut quests = Vec::new();
        while let Some(row) = rows.next()? {
            quests.push(parse_quest_row(row)?);
        }
        Ok(quests)
    }

    fn update_quest(&self, quest: &Quest) -> RepoResult<()> {
        update_quest(self.conn, quest)
    }

    fn recovery_for(&self, quest_id: QuestId) -> RepoResult<Option<Quest>> {
        let recovery_id: Option<String> = self
            .conn
            .query_row(
                "SELECT id FROM quests WHERE recovery_of = ?1;",
                [quest_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        match recovery_id {
            Some(id) => self.get_quest(parse_uuid(&id, "quests.id")?),
            None => Ok(None),
        }
    }

    fn commit(&mut self, commit: &ProgressCommit<'_>) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        update_user(&tx, commit.user)?;
        if let Some(quest) = commit.quest {
            update_quest(&tx, quest)?;
        }
        if let Some(completion) = commit.mission_completion {
            tx.execute(
                "INSERT INTO mission_completions (user_id, mission_id, completed_at)
                 VALUES (?1, ?2, ?3);",
                params![
                    completion.user_id.to_string(),
                    completion.mission_id.as_str(),
                    format_date(completion.completed_at),
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}

fn update_user(conn: &Connection, user: &User) -> RepoResult<()> {
    user.validate()?;
    let changed = conn.execute(
        "UPDATE users
         SET
            display_name = ?2,
            level = ?3,
            experience = ?4,
            experience_to_next_level = ?5,
            rank = ?6,
            gold = ?7,
            streak_days = ?8,
            longest_streak = ?9,
            days_active = ?10,
            daily_wins = ?11,
            last_active = ?12,
            updated_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?1;",
        params![
            user.id.to_string(),
            user.display_name.as_str(),
            user.level,
            user.experience,
            user.experience_to_next_level,
            user.rank.label(),
            user.gold,
            user.streak_days,
            user.longest_streak,
            user.days_active,
            encode_json(&user.daily_wins)?,
            user.last_active.map(format_date),
        ],
    )?;
    if changed == 0 {
        return Err(RepoError::UserNotFound(user.id));
    }
    Ok(())
}

fn update_quest(conn: &Connection, quest: &Quest) -> RepoResult<()> {
    quest.validate()?;
    let changed = conn.execute(
        "UPDATE quests
         SET
            title = ?2,
            is_main_quest = ?3,
            is_daily = ?4,
            difficulty = ?5,
            exp_reward = ?6,
            completed = ?7,
            completed_on = ?8,
            deadline = ?9,
            missed = ?10,
            category = ?11,
            tasks = ?12,
            updated_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?1;",
        params![
            quest.id.to_string(),
            quest.title.as_str(),
            quest.is_main_quest,
            quest.is_daily,
            quest.difficulty.as_str(),
            quest.exp_reward,
            quest.completed,
            quest.completed_on.map(format_date),
            quest.deadline.map(format_date),
            quest.missed,
            quest.category.map(DailyWinCategory::as_str),
            encode_json(&quest.tasks)?,
        ],
    )?;
    if changed == 0 {
        return Err(RepoError::QuestNotFound(quest.id));
    }
    Ok(())
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let id_text: String = row.get("id")?;
    let rank_text: String = row.get("rank")?;
    let daily_wins_text: String = row.get("daily_wins")?;
    let last_active: Option<String> = row.get("last_active")?;
    let created_on: String = row.get("created_on")?;

    let daily_wins: BTreeMap<DailyWinCategory, DailyWinProgress> =
        decode_json(&daily_wins_text, "users.daily_wins")?;

    let user = User {
        id: parse_uuid(&id_text, "users.id")?,
        display_name: row.get("display_name")?,
        level: row.get("level")?,
        experience: row.get("experience")?,
        experience_to_next_level: row.get("experience_to_next_level")?,
        rank: parse_rank(&rank_text, "users.rank")?,
        gold: row.get("gold")?,
        streak_days: row.get("streak_days")?,
        longest_streak: row.get("longest_streak")?,
        days_active: row.get("days_active")?,
        daily_wins,
        last_active: last_active
            .map(|value| parse_date(&value, "users.last_active"))
            .transpose()?,
        created_on: parse_date(&created_on, "users.created_on")?,
    };
    user.validate()?;
    Ok(user)
}

fn parse_quest_row(row: &Row<'_>) -> RepoResult<Quest> {
    let id_text: String = row.get("id")?;
    let user_id_text: String = row.get("user_id")?;
    let difficulty_text: String = row.get("difficulty")?;
    let completed_on: Option<String> = row.get("completed_on")?;
    let deadline: Option<String> = row.get("deadline")?;
    let recovery_of: Option<String> = row.get("recovery_of")?;
    let category: Option<String> = row.get("category")?;
    let tasks_text: String = row.get("tasks")?;

    let difficulty = Difficulty::parse(&difficulty_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid difficulty `{difficulty_text}` in quests.difficulty"
        ))
    })?;
    let category = match category {
        Some(value) => Some(DailyWinCategory::parse(&value).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid category `{value}` in quests.category"))
        })?),
        None => None,
    };
    let tasks: Vec<QuestTask> = decode_json(&tasks_text, "quests.tasks")?;

    let quest = Quest {
        id: parse_uuid(&id_text, "quests.id")?,
        user_id: parse_uuid(&user_id_text, "quests.user_id")?,
        title: row.get("title")?,
        is_main_quest: row.get("is_main_quest")?,
        is_daily: row.get("is_daily")?,
        difficulty,
        exp_reward: row.get("exp_reward")?,
        completed: row.get("completed")?,
        completed_on: completed_on
            .map(|value| parse_date(&value, "quests.completed_on"))
            .transpose()?,
        deadline: deadline
            .map(|value| parse_date(&value, "quests.deadline"))
            .transpose()?,
        missed: row.get("missed")?,
        recovery_of: recovery_of
            .map(|value| parse_uuid(&value, "quests.recovery_of"))
            .transpose()?,
        category,
        tasks,
    };
    quest.validate()?;
    Ok(quest)
}

// Catalog rows are validated by callers so read-only previews can skip bad entries.
fn parse_mission_row(row: &Row<'_>) -> RepoResult<PredefinedMission> {
    let rank_text: String = row.get("rank")?;
    let release_date: String = row.get("release_date")?;
    let expiry_date: Option<String> = row.get("expiry_date")?;
    let required_text: String = row.get("required_tasks")?;

    Ok(PredefinedMission {
        id: row.get("id")?,
        title: row.get("title")?,
        rank: parse_rank(&rank_text, "missions.rank")?,
        day: row.get("day")?,
        release_date: parse_date(&release_date, "missions.release_date")?,
        expiry_date: expiry_date
            .map(|value| parse_date(&value, "missions.expiry_date"))
            .transpose()?,
        required_tasks: decode_json(&required_text, "missions.required_tasks")?,
        exp_reward: row.get("exp_reward")?,
    })
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(value: &str, column: &str) -> RepoResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| RepoError::InvalidData(format!("invalid date `{value}` in {column}")))
}

fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn parse_rank(value: &str, column: &str) -> RepoResult<Rank> {
    Rank::from_label(value)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid rank `{value}` in {column}")))
}

fn encode_json<T: serde::Serialize>(value: &T) -> RepoResult<String> {
    serde_json::to_string(value)
        .map_err(|err| RepoError::InvalidData(format!("failed to encode json column: {err}")))
}

fn decode_json<T: serde::de::DeserializeOwned>(value: &str, column: &str) -> RepoResult<T> {
    serde_json::from_str(value)
        .map_err(|err| RepoError::InvalidData(format!("invalid json in {column}: {err}")))
}

fn ensure_store_connection_ready(conn: &Connection) -> RepoResult<()> {
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let expected_version = latest_version();
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in REQUIRED_TABLES {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}
