use anyhow::Result;
use gear_session_lib::{
    AppState, Config, PersistedSessionState, SessionService, SessionTimer, SnapshotStore,
    SqliteStore, WorkoutExercise, WorkoutSet, SCHEMA_VERSION, SESSION_KEY,
};
use tempfile::TempDir;

const DAY_MS: i64 = 86_400_000;

// Helper to create a timer over an in-memory store
fn create_test_timer(now: i64) -> Result<SessionTimer<SqliteStore>> {
    let store = SqliteStore::open_in_memory()?;
    Ok(SessionTimer::restore_at(store, &Config::default(), now))
}

// Helper for kill/restart tests: both "processes" share one on-disk store
fn open_store(dir: &TempDir) -> Result<SqliteStore> {
    Ok(SqliteStore::open(dir.path().join("session.sqlite"))?)
}

fn sample_exercise(id: &str, name: &str) -> WorkoutExercise {
    WorkoutExercise {
        workout_exercise_id: id.to_string(),
        exercise_id: format!("catalog-{id}"),
        name: name.to_string(),
        sets: vec![WorkoutSet {
            reps: "8".to_string(),
            weight: "60".to_string(),
        }],
    }
}

fn write_snapshot(store: &SqliteStore, snapshot: &PersistedSessionState) -> Result<()> {
    store.set(SESSION_KEY, &serde_json::to_string(snapshot)?)?;
    Ok(())
}

fn paused_snapshot(total: u64, last_save: i64) -> PersistedSessionState {
    PersistedSessionState {
        version: SCHEMA_VERSION,
        total_elapsed_seconds: total,
        start_timestamp: None,
        running: false,
        last_save_timestamp: last_save,
        exercises: vec![sample_exercise("wx-1", "Bench Press")],
        player_visible: false,
        current_exercise_id: None,
        active_tab: "Workouts".to_string(),
    }
}

#[test]
fn test_kill_while_running_counts_dead_time_and_stays_running() -> Result<()> {
    let dir = TempDir::new()?;

    // First launch: 40s accumulated across a pause, then running again
    // when the app is backgrounded and the process killed.
    {
        let store = open_store(&dir)?;
        let mut timer = SessionTimer::restore_at(store, &Config::default(), 0);
        timer.start_at(0);
        timer.add_exercise_at(sample_exercise("wx-1", "Bench Press"), 0);
        timer.pause_at(40_000);
        timer.start_at(50_000);
        timer.handle_app_state_at(AppState::Background, 60_000);
    }

    // Restart 120s after the running interval began.
    let store = open_store(&dir)?;
    let timer = SessionTimer::restore_at(store, &Config::default(), 170_000);

    assert_eq!(timer.seconds(), 160); // 40 accumulated + 120 since anchor
    assert!(timer.running());
    assert_eq!(timer.start_timestamp(), Some(170_000)); // re-anchored
    assert_eq!(timer.exercises().len(), 1);
    Ok(())
}

#[test]
fn test_kill_while_paused_restores_accumulated_total() -> Result<()> {
    let dir = TempDir::new()?;
    {
        let store = open_store(&dir)?;
        let mut timer = SessionTimer::restore_at(store, &Config::default(), 0);
        timer.start_at(0);
        timer.pause_at(75_000);
        timer.handle_app_state_at(AppState::Background, 80_000);
    }

    let store = open_store(&dir)?;
    let timer = SessionTimer::restore_at(store, &Config::default(), 500_000);
    assert_eq!(timer.seconds(), 75);
    assert!(!timer.running());
    assert_eq!(timer.start_timestamp(), None);
    Ok(())
}

#[test]
fn test_reset_deletes_the_stored_snapshot() -> Result<()> {
    let dir = TempDir::new()?;
    {
        let store = open_store(&dir)?;
        let mut timer = SessionTimer::restore_at(store, &Config::default(), 0);
        timer.start_at(0);
        timer.add_exercise_at(sample_exercise("wx-1", "Bench Press"), 0);
        timer.handle_app_state_at(AppState::Background, 1_000);
        assert!(timer.store().get(SESSION_KEY)?.is_some());

        timer.reset();
        assert!(timer.store().get(SESSION_KEY)?.is_none());
    }

    // A fresh launch sees nothing to restore.
    let store = open_store(&dir)?;
    let timer = SessionTimer::restore_at(store, &Config::default(), 2_000);
    assert_eq!(timer.seconds(), 0);
    assert!(timer.exercises().is_empty());
    Ok(())
}

#[test]
fn test_schema_version_mismatch_is_never_restored() -> Result<()> {
    let store = SqliteStore::open_in_memory()?;
    let mut snapshot = paused_snapshot(75, 0);
    snapshot.version = SCHEMA_VERSION + 1;
    write_snapshot(&store, &snapshot)?;

    let timer = SessionTimer::restore_at(store, &Config::default(), 1_000);
    assert_eq!(timer.seconds(), 0);
    assert!(timer.exercises().is_empty());
    assert!(timer.store().get(SESSION_KEY)?.is_none()); // key deleted
    Ok(())
}

#[test]
fn test_snapshot_age_guard() -> Result<()> {
    // 8 days old: discarded
    let store = SqliteStore::open_in_memory()?;
    write_snapshot(&store, &paused_snapshot(75, 0))?;
    let timer = SessionTimer::restore_at(store, &Config::default(), 8 * DAY_MS);
    assert_eq!(timer.seconds(), 0);
    assert!(timer.store().get(SESSION_KEY)?.is_none());

    // 6 days old: restored
    let store = SqliteStore::open_in_memory()?;
    write_snapshot(&store, &paused_snapshot(75, 0))?;
    let timer = SessionTimer::restore_at(store, &Config::default(), 6 * DAY_MS);
    assert_eq!(timer.seconds(), 75);
    assert_eq!(timer.exercises().len(), 1);
    Ok(())
}

#[test]
fn test_corrupt_snapshot_is_deleted_and_defaults_used() -> Result<()> {
    let store = SqliteStore::open_in_memory()?;
    store.set(SESSION_KEY, "{\"version\": 1, truncated")?;

    let timer = SessionTimer::restore_at(store, &Config::default(), 0);
    assert_eq!(timer.seconds(), 0);
    assert!(timer.store().get(SESSION_KEY)?.is_none());
    Ok(())
}

#[test]
fn test_upsert_position_survives_persistence() -> Result<()> {
    let dir = TempDir::new()?;
    {
        let store = open_store(&dir)?;
        let mut timer = SessionTimer::restore_at(store, &Config::default(), 0);
        timer.add_exercise_at(sample_exercise("wx-1", "Bench Press"), 0);
        timer.add_exercise_at(sample_exercise("wx-2", "Squat"), 0);

        let mut replacement = sample_exercise("wx-1", "Bench Press");
        replacement.sets = vec![
            WorkoutSet {
                reps: "5".to_string(),
                weight: "100".to_string(),
            },
            WorkoutSet {
                reps: "5".to_string(),
                weight: "105".to_string(),
            },
        ];
        timer.add_exercise_at(replacement, 0);
        timer.handle_app_state_at(AppState::Background, 100);
    }

    let store = open_store(&dir)?;
    let timer = SessionTimer::restore_at(store, &Config::default(), 200);
    assert_eq!(timer.exercises().len(), 2);
    assert_eq!(timer.exercises()[0].workout_exercise_id, "wx-1");
    assert_eq!(timer.exercises()[0].sets.len(), 2);
    assert_eq!(timer.exercises()[1].workout_exercise_id, "wx-2");
    Ok(())
}

#[test]
fn test_debounced_write_lands_only_after_quiescence() -> Result<()> {
    let mut timer = create_test_timer(0)?;
    timer.add_exercise_at(sample_exercise("wx-1", "Bench Press"), 0);
    timer.add_exercise_at(sample_exercise("wx-2", "Squat"), 300);

    timer.flush_if_due_at(700); // window re-anchored at t=300
    assert!(timer.store().get(SESSION_KEY)?.is_none());

    timer.flush_if_due_at(800);
    let raw = timer.store().get(SESSION_KEY)?.expect("snapshot written");
    let snapshot: PersistedSessionState = serde_json::from_str(&raw)?;
    assert_eq!(snapshot.exercises.len(), 2);
    Ok(())
}

#[test]
fn test_player_and_tab_state_round_trip() -> Result<()> {
    let dir = TempDir::new()?;
    {
        let store = open_store(&dir)?;
        let mut timer = SessionTimer::restore_at(store, &Config::default(), 0);
        timer.add_exercise_at(sample_exercise("wx-1", "Bench Press"), 0);
        timer.show_player_at("catalog-wx-1", 0);
        timer.set_active_tab_at("Workouts", 0);
        timer.handle_app_state_at(AppState::Background, 100);
    }

    let store = open_store(&dir)?;
    let timer = SessionTimer::restore_at(store, &Config::default(), 200);
    assert!(timer.player_visible());
    assert_eq!(timer.current_exercise_id(), Some("catalog-wx-1"));
    assert_eq!(timer.active_tab(), "Workouts");
    Ok(())
}

#[test]
fn test_finish_workout_reads_out_exercises_and_clears_session() -> Result<()> {
    let dir = TempDir::new()?;
    let store = open_store(&dir)?;
    let mut service = SessionService {
        config: Config::default(),
        timer: SessionTimer::restore_at(store, &Config::default(), 0),
        store_path: dir.path().join("session.sqlite"),
        config_path: dir.path().join("config.toml"),
    };

    service.timer.start_at(0);
    service.timer.add_exercise_at(sample_exercise("wx-1", "Bench Press"), 0);
    service.timer.pause_at(600_000);

    let exercises = service.finish_workout();
    assert_eq!(exercises.len(), 1);
    assert_eq!(exercises[0].name, "Bench Press");
    assert_eq!(exercises[0].complete_set_count(), 1);

    // the session is gone, in memory and on disk
    assert_eq!(service.timer.seconds(), 0);
    assert!(service.timer.exercises().is_empty());
    assert!(service.timer.store().get(SESSION_KEY)?.is_none());
    Ok(())
}

#[test]
fn test_custom_max_age_is_honored() -> Result<()> {
    let config = Config {
        max_snapshot_age_days: 1,
        ..Default::default()
    };
    let store = SqliteStore::open_in_memory()?;
    write_snapshot(&store, &paused_snapshot(75, 0))?;

    // 2 days old but the configured window is 1 day
    let timer = SessionTimer::restore_at(store, &config, 2 * DAY_MS);
    assert_eq!(timer.seconds(), 0);
    Ok(())
}
