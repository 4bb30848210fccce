//! Core progression engine for the hunter leveling app.
//! This crate is the single source of truth for progression invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod progression;
pub mod repo;
pub mod service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, EngineConfig, QuestGold};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::mission::{MissionCompletion, MissionId, PredefinedMission};
pub use model::quest::{Difficulty, NewQuest, Quest, QuestId, QuestTask};
pub use model::rank::{Rank, RankTable, RankThreshold};
pub use model::user::{DailyWinCategory, DailyWinProgress, User, UserId};
pub use progression::ledger::{ExperienceLedger, LevelCurve};
pub use progression::missions::{MissionBoard, MissionEntry, Unavailable};
pub use repo::progress_repo::{ProgressionStore, RepoError, RepoResult, SqliteProgressionStore};
pub use service::events::{Activity, CompletionTarget, ProgressEvent, ProgressionError};
pub use service::progression_service::ProgressionService;

/// Minimal health-check API for shell integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
