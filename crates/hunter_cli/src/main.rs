//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `hunter_core` linkage and run one scripted hunter day against an
//!   in-memory database.
//! - Keep output deterministic: fixed clock, one JSON event per line.
//!
//! Usage: `hunter_cli [config.json] [log_dir]`
//!
//! Logs go to `log_dir` (absolute), or `<tmp>/hunter_cli_logs` when omitted.

use chrono::NaiveDate;
use hunter_core::{
    default_log_level, init_logging, open_db_in_memory, Activity, DailyWinCategory, Difficulty,
    EngineConfig, FixedClock, NewQuest, PredefinedMission, ProgressEvent, ProgressionService, Rank,
    SqliteProgressionStore,
};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    println!("hunter_core ping={}", hunter_core::ping());
    println!("hunter_core version={}", hunter_core::core_version());

    let log_dir = resolve_log_dir(std::env::args().nth(2));
    init_logging(default_log_level(), &log_dir)?;
    println!("log_dir={log_dir}");

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let season_start = NaiveDate::from_ymd_opt(2026, 1, 1).ok_or("invalid season start")?;
    let clock = FixedClock::new(season_start);
    let mut conn = open_db_in_memory()?;
    let store = SqliteProgressionStore::try_new(&mut conn)?;
    let mut service = ProgressionService::new(store, &clock, config)?;

    service.seed_missions(&[
        PredefinedMission::scheduled("f-day-01", "Morning Run", Rank::F, 1, season_start, 120)?,
        PredefinedMission::scheduled("e-day-01", "Dungeon Warmup", Rank::E, 1, season_start, 200)?,
    ])?;

    let hunter = service.register_user("Jinwoo")?;
    println!("registered user_id={}", hunter.id);

    let mut request = NewQuest::side("Push-ups", Difficulty::Hard, 400);
    request.category = Some(DailyWinCategory::Physical);
    request.tasks = vec!["100 push-ups".to_string()];
    let quest = service.create_quest(hunter.id, request)?;

    let script = [
        Activity::DailyWinRecorded {
            category: DailyWinCategory::Mental,
        },
        Activity::TaskCompleted {
            quest_id: quest.id,
            task_index: 0,
        },
        Activity::QuestCompleted { quest_id: quest.id },
        Activity::MissionCompleted {
            mission_id: "f-day-01".to_string(),
        },
    ];
    for activity in script {
        let kind = activity.kind();
        let events = service.apply(hunter.id, activity)?;
        print_events(kind, &events)?;
    }

    clock.advance_days(2);
    let events = service.complete_mission(hunter.id, "e-day-01")?;
    print_events("mission_completed", &events)?;

    let snapshot = service.user_snapshot(hunter.id)?;
    println!("{}", serde_json::to_string(&snapshot)?);
    Ok(())
}

fn resolve_log_dir(arg: Option<String>) -> String {
    arg.unwrap_or_else(|| {
        std::env::temp_dir()
            .join("hunter_cli_logs")
            .to_string_lossy()
            .into_owned()
    })
}

fn print_events(kind: &str, events: &[ProgressEvent]) -> Result<(), Box<dyn Error>> {
    for event in events {
        println!("activity={kind} event={}", serde_json::to_string(event)?);
    }
    Ok(())
}
