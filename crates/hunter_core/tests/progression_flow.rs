use chrono::NaiveDate;
use hunter_core::db::open_db_in_memory;
use hunter_core::{
    Activity, CompletionTarget, DailyWinCategory, Difficulty, EngineConfig, FixedClock, NewQuest,
    PredefinedMission, ProgressEvent, ProgressionError, ProgressionService, ProgressionStore,
    Quest, Rank, RankThreshold, SqliteProgressionStore, Unavailable, User,
};
use rusqlite::Connection;

type Service<'a> = ProgressionService<SqliteProgressionStore<'a>, &'a FixedClock>;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 4, d).unwrap()
}

fn service<'a>(conn: &'a mut Connection, clock: &'a FixedClock) -> Service<'a> {
    service_with(conn, clock, EngineConfig::default())
}

fn service_with<'a>(
    conn: &'a mut Connection,
    clock: &'a FixedClock,
    config: EngineConfig,
) -> Service<'a> {
    let store = SqliteProgressionStore::try_new(conn).unwrap();
    ProgressionService::new(store, clock, config).unwrap()
}

fn stored_user(service: &Service<'_>, user: &User) -> User {
    service.store().load_user(user.id).unwrap().unwrap()
}

fn mission(id: &str, title: &str, rank: Rank, exp: i64) -> PredefinedMission {
    PredefinedMission::scheduled(id, title, rank, 1, day(1), exp).unwrap()
}

fn win(category: DailyWinCategory) -> Activity {
    Activity::DailyWinRecorded { category }
}

#[test]
fn registered_hunter_starts_at_level_one_rank_f() {
    let mut conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(day(1));
    let mut service = service(&mut conn, &clock);

    let user = service.register_user("  Jinwoo ").unwrap();
    assert_eq!(user.display_name, "Jinwoo");
    assert_eq!(user.level, 1);
    assert_eq!(user.rank, Rank::F);
    assert_eq!(user.experience, 0);
    assert_eq!(user.experience_to_next_level, 100);
    assert_eq!(user.created_on, day(1));
    assert_eq!(service.user_snapshot(user.id).unwrap(), user);

    assert!(matches!(
        service.register_user("   "),
        Err(ProgressionError::InvalidUser(_))
    ));
}

#[test]
fn daily_win_completes_once_per_day_and_rolls_over() {
    let mut conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(day(1));
    let mut service = service(&mut conn, &clock);
    let user = service.register_user("Jinwoo").unwrap();

    let events = service.apply(user.id, win(DailyWinCategory::Mental)).unwrap();
    assert_eq!(
        events,
        vec![
            ProgressEvent::DailyWinCompleted {
                category: DailyWinCategory::Mental
            },
            ProgressEvent::ExperienceGained {
                amount: 10,
                total: 10
            },
        ]
    );

    let repeat = service.apply(user.id, win(DailyWinCategory::Mental)).unwrap();
    assert!(repeat.is_empty());
    let snapshot = service.user_snapshot(user.id).unwrap();
    let mental = snapshot.daily_wins[&DailyWinCategory::Mental];
    assert_eq!(mental.count, 2);
    assert!(mental.is_completed);
    assert_eq!(snapshot.experience, 10);
    assert_eq!(snapshot.streak_days, 1);
    assert_eq!(snapshot.days_active, 1);

    clock.advance_days(1);
    let next_day = service.user_snapshot(user.id).unwrap();
    let mental = next_day.daily_wins[&DailyWinCategory::Mental];
    assert_eq!(mental.count, 0);
    assert!(!mental.is_completed);

    let events = service.apply(user.id, win(DailyWinCategory::Mental)).unwrap();
    assert_eq!(
        events,
        vec![
            ProgressEvent::DailyWinCompleted {
                category: DailyWinCategory::Mental
            },
            ProgressEvent::ExperienceGained {
                amount: 10,
                total: 20
            },
        ]
    );
    assert_eq!(service.user_snapshot(user.id).unwrap().streak_days, 2);
}

#[test]
fn gap_in_activity_breaks_streak_before_other_events() {
    let mut conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(day(1));
    let mut service = service(&mut conn, &clock);
    let user = service.register_user("Jinwoo").unwrap();

    service.apply(user.id, win(DailyWinCategory::Physical)).unwrap();
    clock.advance_days(1);
    service.apply(user.id, win(DailyWinCategory::Physical)).unwrap();
    clock.advance_days(3);

    let events = service.apply(user.id, win(DailyWinCategory::Physical)).unwrap();
    assert_eq!(events[0], ProgressEvent::StreakBroken { previous_days: 2 });

    let snapshot = stored_user(&service, &user);
    assert_eq!(snapshot.streak_days, 1);
    assert_eq!(snapshot.longest_streak, 2);
    assert_eq!(snapshot.days_active, 3);
    assert_eq!(snapshot.last_active, Some(day(5)));
}

#[test]
fn quest_completion_awards_experience_gold_and_category_win_in_stage_order() {
    let mut conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(day(1));
    let mut service = service(&mut conn, &clock);
    let user = service.register_user("Jinwoo").unwrap();

    let mut request = NewQuest::side("Push-ups", Difficulty::Normal, 150);
    request.category = Some(DailyWinCategory::Physical);
    let quest = service.create_quest(user.id, request).unwrap();

    let events = service
        .apply(user.id, Activity::QuestCompleted { quest_id: quest.id })
        .unwrap();
    assert_eq!(
        events,
        vec![
            ProgressEvent::DailyWinCompleted {
                category: DailyWinCategory::Physical
            },
            ProgressEvent::ExperienceGained {
                amount: 150,
                total: 150
            },
            ProgressEvent::ExperienceGained {
                amount: 10,
                total: 160
            },
            ProgressEvent::LeveledUp {
                level: 2,
                previous_level: 1
            },
        ]
    );

    let snapshot = stored_user(&service, &user);
    assert_eq!(snapshot.level, 2);
    assert_eq!(snapshot.experience_to_next_level, 140);
    assert_eq!(snapshot.gold, 10);

    let stored = service.store().get_quest(quest.id).unwrap().unwrap();
    assert!(stored.completed);
    assert_eq!(stored.completed_on, Some(day(1)));

    let again = service.apply(user.id, Activity::QuestCompleted { quest_id: quest.id });
    assert!(matches!(
        again,
        Err(ProgressionError::AlreadyCompleted(CompletionTarget::Quest(id))) if id == quest.id
    ));
    assert_eq!(stored_user(&service, &user), snapshot);
}

#[test]
fn multi_rank_jump_emits_one_rank_event_and_unlocks_in_catalog_order() {
    let mut conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(day(1));
    let mut service = service(&mut conn, &clock);
    service
        .seed_missions(&[
            mission("e-01", "Goblin Den", Rank::E, 100),
            mission("d-01", "Orc Camp", Rank::D, 200),
            mission("c-01", "Ice Elves", Rank::C, 300),
        ])
        .unwrap();
    let user = service.register_user("Jinwoo").unwrap();
    let quest = service
        .create_quest(user.id, NewQuest::side("Double Dungeon", Difficulty::Boss, 1_600))
        .unwrap();

    let events = service
        .apply(user.id, Activity::QuestCompleted { quest_id: quest.id })
        .unwrap();
    assert_eq!(
        events,
        vec![
            ProgressEvent::ExperienceGained {
                amount: 1_600,
                total: 1_600
            },
            ProgressEvent::LeveledUp {
                level: 6,
                previous_level: 1
            },
            ProgressEvent::RankedUp {
                rank: Rank::D,
                previous_rank: Rank::F
            },
            ProgressEvent::MissionUnlocked {
                mission_id: "d-01".to_string(),
                title: "Orc Camp".to_string()
            },
            ProgressEvent::MissionUnlocked {
                mission_id: "e-01".to_string(),
                title: "Goblin Den".to_string()
            },
        ]
    );
    assert_eq!(stored_user(&service, &user).gold, 100);

    let board = service.mission_board(user.id).unwrap();
    assert!(board.is_available("d-01"));
    assert!(!board.is_available("c-01"));
    assert_eq!(board.upcoming_preview.len(), 1);
}

#[test]
fn expired_mission_is_reported_as_expired_even_when_rank_locked() {
    let mut conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(day(3));
    let mut service = service(&mut conn, &clock);
    service
        .seed_missions(&[mission("s-old", "Jeju Raid", Rank::S, 500).with_expiry(day(2))])
        .unwrap();
    let user = service.register_user("Jinwoo").unwrap();
    let before = stored_user(&service, &user);

    let result = service.complete_mission(user.id, "s-old");
    assert!(matches!(
        result,
        Err(ProgressionError::NotAvailable(Unavailable::Expired { expiry_date })) if expiry_date == day(2)
    ));
    assert_eq!(stored_user(&service, &user), before);

    let board = service.mission_board(user.id).unwrap();
    assert_eq!(board.expired.len(), 1);
    assert!(board.upcoming_preview.is_empty());
    assert!(board.locked.is_empty());
}

#[test]
fn locked_missions_reject_with_the_first_failing_reason() {
    let mut conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(day(1));
    let mut service = service(&mut conn, &clock);
    let future = PredefinedMission::scheduled("f-05", "Later", Rank::F, 5, day(1), 40).unwrap();
    service
        .seed_missions(&[mission("e-01", "Goblin Den", Rank::E, 100), future])
        .unwrap();
    let user = service.register_user("Jinwoo").unwrap();

    assert!(matches!(
        service.complete_mission(user.id, "e-01"),
        Err(ProgressionError::NotAvailable(Unavailable::RankTooLow {
            required: Rank::E,
            current: Rank::F
        }))
    ));
    assert!(matches!(
        service.complete_mission(user.id, "f-05"),
        Err(ProgressionError::NotAvailable(Unavailable::NotYetReleased { release_date })) if release_date == day(5)
    ));
    assert!(matches!(
        service.complete_mission(user.id, "nope"),
        Err(ProgressionError::MissionNotFound(id)) if id == "nope"
    ));
    assert_eq!(stored_user(&service, &user).days_active, 0);
}

#[test]
fn completing_a_mission_twice_is_a_no_op_even_after_expiry() {
    let mut conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(day(1));
    let mut service = service(&mut conn, &clock);
    service
        .seed_missions(&[mission("f-01", "Morning Run", Rank::F, 50).with_expiry(day(2))])
        .unwrap();
    let user = service.register_user("Jinwoo").unwrap();

    let events = service.complete_mission(user.id, "f-01").unwrap();
    assert_eq!(
        events,
        vec![ProgressEvent::ExperienceGained {
            amount: 50,
            total: 50
        }]
    );
    let after_first = stored_user(&service, &user);

    let duplicate = service.complete_mission(user.id, "f-01");
    assert!(matches!(
        duplicate,
        Err(ProgressionError::AlreadyCompleted(CompletionTarget::Mission(ref id))) if id == "f-01"
    ));
    assert_eq!(stored_user(&service, &user), after_first);

    clock.advance_days(5);
    assert!(matches!(
        service.complete_mission(user.id, "f-01"),
        Err(ProgressionError::AlreadyCompleted(_))
    ));
    assert_eq!(stored_user(&service, &user), after_first);
    assert_eq!(service.store().mission_completions(user.id).unwrap().len(), 1);

    let board = service.mission_board(user.id).unwrap();
    assert_eq!(board.expired.len(), 1);
    assert_eq!(board.expired[0].completed_at, Some(day(1)));
}

#[test]
fn completing_a_prerequisite_unlocks_the_dependent_mission() {
    let mut conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(day(1));
    let mut service = service(&mut conn, &clock);
    service
        .seed_missions(&[
            mission("m1", "First", Rank::F, 50),
            mission("m2", "Second", Rank::F, 60).with_required(["m1"]),
        ])
        .unwrap();
    let user = service.register_user("Jinwoo").unwrap();

    assert!(matches!(
        service.complete_mission(user.id, "m2"),
        Err(ProgressionError::NotAvailable(Unavailable::PrerequisitesIncomplete { ref missing }))
            if missing == &vec!["m1".to_string()]
    ));

    let events = service.complete_mission(user.id, "m1").unwrap();
    assert_eq!(
        events,
        vec![
            ProgressEvent::ExperienceGained {
                amount: 50,
                total: 50
            },
            ProgressEvent::MissionUnlocked {
                mission_id: "m2".to_string(),
                title: "Second".to_string()
            },
        ]
    );
    assert!(service.mission_board(user.id).unwrap().is_available("m2"));
}

#[test]
fn completed_quest_counts_as_mission_prerequisite() {
    let mut conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(day(1));
    let mut service = service(&mut conn, &clock);
    let user = service.register_user("Jinwoo").unwrap();
    let quest = service
        .create_quest(user.id, NewQuest::side("Meditate", Difficulty::Easy, 20))
        .unwrap();
    service
        .seed_missions(&[mission("gate", "Gate", Rank::F, 30).with_required([quest.id.to_string()])])
        .unwrap();

    let events = service
        .apply(user.id, Activity::QuestCompleted { quest_id: quest.id })
        .unwrap();
    assert_eq!(
        events,
        vec![
            ProgressEvent::ExperienceGained {
                amount: 20,
                total: 20
            },
            ProgressEvent::MissionUnlocked {
                mission_id: "gate".to_string(),
                title: "Gate".to_string()
            },
        ]
    );
    assert_eq!(stored_user(&service, &user).gold, 5);
}

#[test]
fn task_completion_checks_off_one_task_without_experience() {
    let mut conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(day(1));
    let mut service = service(&mut conn, &clock);
    let user = service.register_user("Jinwoo").unwrap();
    let mut request = NewQuest::side("Training", Difficulty::Hard, 80);
    request.tasks = vec!["Squats".to_string(), "Sit-ups".to_string()];
    let quest = service.create_quest(user.id, request).unwrap();

    let task = |task_index| Activity::TaskCompleted {
        quest_id: quest.id,
        task_index,
    };
    assert!(service.apply(user.id, task(0)).unwrap().is_empty());

    let stored = service.store().get_quest(quest.id).unwrap().unwrap();
    assert!(stored.tasks[0].completed);
    assert!(!stored.tasks[1].completed);
    assert!(!stored.completed);

    let snapshot = stored_user(&service, &user);
    assert_eq!(snapshot.experience, 0);
    assert_eq!(snapshot.streak_days, 1);

    assert!(matches!(
        service.apply(user.id, task(0)),
        Err(ProgressionError::AlreadyCompleted(CompletionTarget::Task { task_index: 0, .. }))
    ));
    assert!(matches!(
        service.apply(user.id, task(5)),
        Err(ProgressionError::TaskNotFound { task_index: 5, .. })
    ));
}

#[test]
fn quests_of_other_hunters_and_unknown_users_are_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(day(1));
    let mut service = service(&mut conn, &clock);
    let owner = service.register_user("Jinwoo").unwrap();
    let other = service.register_user("Jinho").unwrap();
    let quest = service
        .create_quest(owner.id, NewQuest::side("Secret", Difficulty::Easy, 10))
        .unwrap();

    assert!(matches!(
        service.apply(other.id, Activity::QuestCompleted { quest_id: quest.id }),
        Err(ProgressionError::QuestNotFound(id)) if id == quest.id
    ));

    let stranger = User::new("Stranger", day(1));
    assert!(matches!(
        service.apply(stranger.id, win(DailyWinCategory::Mental)),
        Err(ProgressionError::UserNotFound(id)) if id == stranger.id
    ));
}

#[test]
fn missed_quest_can_be_recovered_once_for_half_experience() {
    let mut conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(day(1));
    let mut service = service(&mut conn, &clock);
    let user = service.register_user("Jinwoo").unwrap();
    let mut request = NewQuest::side("Read", Difficulty::Hard, 100);
    request.deadline = Some(day(2));
    request.tasks = vec!["Chapter 1".to_string()];
    let quest = service.create_quest(user.id, request).unwrap();

    clock.advance_days(1);
    assert!(matches!(
        service.create_recovery_quest(user.id, quest.id, None),
        Err(ProgressionError::QuestNotMissed(_))
    ));

    clock.advance_days(2);
    assert!(matches!(
        service.apply(user.id, Activity::QuestCompleted { quest_id: quest.id }),
        Err(ProgressionError::NotAvailable(Unavailable::QuestMissed { deadline })) if deadline == day(2)
    ));

    let missed: Vec<Quest> = service.sweep_missed_quests(user.id).unwrap();
    assert_eq!(missed.len(), 1);
    assert!(missed[0].missed);
    assert!(service.sweep_missed_quests(user.id).unwrap().is_empty());

    let recovery = service
        .create_recovery_quest(user.id, quest.id, Some(day(6)))
        .unwrap();
    assert_eq!(recovery.title, "Recovery: Read");
    assert_eq!(recovery.exp_reward, 50);
    assert_eq!(recovery.recovery_of, Some(quest.id));
    assert_eq!(recovery.deadline, Some(day(6)));
    assert!(!recovery.tasks[0].completed);

    assert!(matches!(
        service.create_recovery_quest(user.id, quest.id, None),
        Err(ProgressionError::AlreadyCompleted(CompletionTarget::Recovery(id))) if id == quest.id
    ));

    let events = service
        .apply(user.id, Activity::QuestCompleted { quest_id: recovery.id })
        .unwrap();
    assert_eq!(
        events,
        vec![ProgressEvent::ExperienceGained {
            amount: 50,
            total: 50
        }]
    );
    assert_eq!(service.list_quests(user.id).unwrap().len(), 2);
}

#[test]
fn day_gated_rank_is_granted_on_attendance() {
    let mut config = EngineConfig::default();
    config.rank_thresholds[1].min_days = Some(2);

    let mut conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(day(1));
    let mut service = service_with(&mut conn, &clock, config);
    let user = service.register_user("Jinwoo").unwrap();
    let quest = service
        .create_quest(user.id, NewQuest::side("Dungeon", Difficulty::Hard, 600))
        .unwrap();

    let events = service
        .apply(user.id, Activity::QuestCompleted { quest_id: quest.id })
        .unwrap();
    assert_eq!(
        events,
        vec![
            ProgressEvent::ExperienceGained {
                amount: 600,
                total: 600
            },
            ProgressEvent::LeveledUp {
                level: 4,
                previous_level: 1
            },
        ]
    );
    assert_eq!(stored_user(&service, &user).rank, Rank::F);

    clock.advance_days(1);
    let events = service.apply(user.id, win(DailyWinCategory::Mental)).unwrap();
    assert_eq!(
        events,
        vec![
            ProgressEvent::DailyWinCompleted {
                category: DailyWinCategory::Mental
            },
            ProgressEvent::ExperienceGained {
                amount: 10,
                total: 610
            },
            ProgressEvent::RankedUp {
                rank: Rank::E,
                previous_rank: Rank::F
            },
        ]
    );
}

#[test]
fn disabled_streaks_leave_attendance_untouched() {
    let config = EngineConfig {
        streaks_enabled: false,
        ..EngineConfig::default()
    };
    let mut conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(day(1));
    let mut service = service_with(&mut conn, &clock, config);
    let user = service.register_user("Jinwoo").unwrap();

    service.apply(user.id, win(DailyWinCategory::Spiritual)).unwrap();
    let snapshot = stored_user(&service, &user);
    assert_eq!(snapshot.streak_days, 0);
    assert_eq!(snapshot.last_active, None);
    assert_eq!(snapshot.experience, 10);
}

#[test]
fn invalid_catalog_rows_are_skipped_on_the_board_and_rejected_on_completion() {
    let mut conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO missions (id, title, rank, day, release_date, expiry_date, required_tasks, exp_reward)
         VALUES ('broken', 'Broken', 'F', 1, '2026-04-05', '2026-04-01', '[]', 10);",
        [],
    )
    .unwrap();
    let clock = FixedClock::new(day(1));
    let mut service = service(&mut conn, &clock);
    service
        .seed_missions(&[mission("f-01", "Morning Run", Rank::F, 50)])
        .unwrap();
    let user = service.register_user("Jinwoo").unwrap();

    let board = service.mission_board(user.id).unwrap();
    assert_eq!(board.open_ids(), vec!["f-01"]);
    assert!(board.expired.is_empty());
    assert!(board.locked.is_empty());

    assert!(matches!(
        service.complete_mission(user.id, "broken"),
        Err(ProgressionError::InvalidMission(_))
    ));
}

#[test]
fn standing_follows_the_active_rank_table_on_reads_and_completion() {
    let mut conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(day(1));
    let mut first = service(&mut conn, &clock);
    let user = first.register_user("Jinwoo").unwrap();
    let quest = first
        .create_quest(user.id, NewQuest::side("Warmup", Difficulty::Normal, 200))
        .unwrap();
    first
        .apply(user.id, Activity::QuestCompleted { quest_id: quest.id })
        .unwrap();
    assert_eq!(first.user_snapshot(user.id).unwrap().rank, Rank::F);
    drop(first);

    let config = EngineConfig {
        rank_thresholds: vec![RankThreshold::new(Rank::F, 0), RankThreshold::new(Rank::E, 100)],
        ..EngineConfig::default()
    };
    let mut reopened = service_with(&mut conn, &clock, config);
    reopened
        .seed_missions(&[mission("e1", "Goblin Den", Rank::E, 10)])
        .unwrap();

    let snapshot = reopened.user_snapshot(user.id).unwrap();
    assert_eq!(snapshot.experience, 200);
    assert_eq!(snapshot.rank, Rank::E);
    assert!(reopened.mission_board(user.id).unwrap().is_available("e1"));

    let events = reopened.complete_mission(user.id, "e1").unwrap();
    assert_eq!(
        events,
        vec![ProgressEvent::ExperienceGained {
            amount: 10,
            total: 210
        }]
    );
    assert_eq!(stored_user(&reopened, &user).rank, Rank::E);
}
