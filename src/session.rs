// src/session.rs
use crate::config::Config;
use crate::models::{
    AppState, ExercisePatch, PersistedSessionState, WorkoutExercise, SCHEMA_VERSION,
};
use crate::store::SnapshotStore;
use chrono::Utc;
use tracing::{debug, warn};

/// Store key the session snapshot lives under. Owned exclusively by
/// `SessionTimer`; no other component reads or writes it.
pub const SESSION_KEY: &str = "gear.workout_session.snapshot";

const MS_PER_DAY: i64 = 86_400_000;

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn whole_seconds(delta_ms: i64) -> u64 {
    (delta_ms.max(0) / 1000) as u64
}

/// The workout session timer: elapsed-time tracking by timestamp deltas,
/// the in-progress exercise list, and the snapshot persistence protocol.
///
/// All transitions happen on the host's event loop; there is exactly one
/// logical writer, so the struct is plain owned state. The host drives it
/// with mutator calls, a periodic [`tick`](Self::tick), lifecycle
/// notifications via [`handle_app_state`](Self::handle_app_state), and
/// [`flush_if_due`](Self::flush_if_due) for the debounced write.
///
/// Every operation has an `_at` form taking an explicit epoch-ms timestamp
/// for hosts (and tests) that own the clock; the plain forms read the
/// system clock.
pub struct SessionTimer<S: SnapshotStore> {
    store: S,
    debounce_ms: i64,
    max_age_ms: i64,

    seconds: u64,
    running: bool,
    total_elapsed_seconds: u64,
    start_timestamp: Option<i64>,
    exercises: Vec<WorkoutExercise>,
    player_visible: bool,
    current_exercise_id: Option<String>,
    active_tab: String,

    pending_write_at: Option<i64>,
}

impl<S: SnapshotStore> SessionTimer<S> {
    /// Constructs the timer and rehydrates it from the store.
    ///
    /// Rehydration never fails: an absent, corrupt, version-mismatched or
    /// stale snapshot yields a fresh session, and the offending key is
    /// deleted. Store errors are logged and otherwise swallowed.
    pub fn restore(store: S, config: &Config) -> Self {
        Self::restore_at(store, config, now_ms())
    }

    pub fn restore_at(store: S, config: &Config, now: i64) -> Self {
        let mut timer = Self {
            store,
            debounce_ms: config.debounce_ms.max(1) as i64,
            max_age_ms: i64::from(config.max_snapshot_age_days) * MS_PER_DAY,
            seconds: 0,
            running: false,
            total_elapsed_seconds: 0,
            start_timestamp: None,
            exercises: Vec::new(),
            player_visible: false,
            current_exercise_id: None,
            active_tab: config.default_tab.clone(),
            pending_write_at: None,
        };
        timer.rehydrate(now);
        timer
    }

    // --- Read-only state, consumed by UI layers ---

    pub fn seconds(&self) -> u64 {
        self.seconds
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn total_elapsed_seconds(&self) -> u64 {
        self.total_elapsed_seconds
    }

    pub fn start_timestamp(&self) -> Option<i64> {
        self.start_timestamp
    }

    pub fn exercises(&self) -> &[WorkoutExercise] {
        &self.exercises
    }

    pub fn player_visible(&self) -> bool {
        self.player_visible
    }

    pub fn current_exercise_id(&self) -> Option<&str> {
        self.current_exercise_id.as_deref()
    }

    pub fn active_tab(&self) -> &str {
        &self.active_tab
    }

    pub fn has_pending_write(&self) -> bool {
        self.pending_write_at.is_some()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // --- Timer mutators ---

    /// Starts the clock. Idempotent while running: an existing anchor is
    /// never overwritten, so unrelated mutations cannot restart the clock.
    pub fn start(&mut self) {
        self.start_at(now_ms());
    }

    pub fn start_at(&mut self, now: i64) {
        let mut changed = false;
        if !self.running {
            self.running = true;
            changed = true;
        }
        if self.start_timestamp.is_none() {
            self.start_timestamp = Some(now);
            changed = true;
        }
        if changed {
            self.mark_dirty(now);
        }
    }

    /// Stops the clock, folding the elapsed interval into the accumulated
    /// total. Idempotent while paused.
    pub fn pause(&mut self) {
        self.pause_at(now_ms());
    }

    pub fn pause_at(&mut self, now: i64) {
        if !self.running && self.start_timestamp.is_none() {
            return;
        }
        if let Some(started) = self.start_timestamp.take() {
            self.total_elapsed_seconds += whole_seconds(now - started);
        }
        self.running = false;
        self.seconds = self.total_elapsed_seconds;
        self.mark_dirty(now);
    }

    /// Clears all session state and removes the persisted snapshot before
    /// returning. The only operation that deletes durable state.
    pub fn reset(&mut self) {
        self.running = false;
        self.seconds = 0;
        self.start_timestamp = None;
        self.total_elapsed_seconds = 0;
        self.exercises.clear();
        self.player_visible = false;
        self.current_exercise_id = None;
        self.pending_write_at = None;
        if let Err(err) = self.store.remove(SESSION_KEY) {
            warn!("failed to remove session snapshot on reset: {err}");
        }
    }

    /// Recomputes the displayed seconds from the running anchor. Purely
    /// derivative: never touches the accumulated total or the anchor.
    pub fn tick(&mut self) {
        self.tick_at(now_ms());
    }

    pub fn tick_at(&mut self, now: i64) {
        if !self.running {
            return;
        }
        if let Some(started) = self.start_timestamp {
            let seconds = self.total_elapsed_seconds + whole_seconds(now - started);
            if seconds != self.seconds {
                self.seconds = seconds;
                self.mark_dirty(now);
            }
        }
    }

    // --- Exercise list mutators ---

    /// Upserts by `workout_exercise_id`: an existing exercise is replaced
    /// in place, a new one is appended. Lets the exercise-editing screen
    /// save the same exercise repeatedly.
    pub fn add_exercise(&mut self, exercise: WorkoutExercise) {
        self.add_exercise_at(exercise, now_ms());
    }

    pub fn add_exercise_at(&mut self, exercise: WorkoutExercise, now: i64) {
        if let Some(existing) = self
            .exercises
            .iter_mut()
            .find(|e| e.workout_exercise_id == exercise.workout_exercise_id)
        {
            *existing = exercise;
        } else {
            self.exercises.push(exercise);
        }
        self.mark_dirty(now);
    }

    /// Merges the patch into the matching exercise; no-op when absent.
    pub fn update_exercise(&mut self, workout_exercise_id: &str, patch: ExercisePatch) {
        self.update_exercise_at(workout_exercise_id, patch, now_ms());
    }

    pub fn update_exercise_at(&mut self, workout_exercise_id: &str, patch: ExercisePatch, now: i64) {
        let Some(exercise) = self
            .exercises
            .iter_mut()
            .find(|e| e.workout_exercise_id == workout_exercise_id)
        else {
            return;
        };
        if let Some(exercise_id) = patch.exercise_id {
            exercise.exercise_id = exercise_id;
        }
        if let Some(name) = patch.name {
            exercise.name = name;
        }
        if let Some(sets) = patch.sets {
            exercise.sets = sets;
        }
        self.mark_dirty(now);
    }

    /// Removes the matching exercise; no-op when absent.
    pub fn remove_exercise(&mut self, workout_exercise_id: &str) {
        self.remove_exercise_at(workout_exercise_id, now_ms());
    }

    pub fn remove_exercise_at(&mut self, workout_exercise_id: &str, now: i64) {
        let before = self.exercises.len();
        self.exercises
            .retain(|e| e.workout_exercise_id != workout_exercise_id);
        if self.exercises.len() != before {
            self.mark_dirty(now);
        }
    }

    // --- Player and tab state ---

    pub fn show_player(&mut self, exercise_id: &str) {
        self.show_player_at(exercise_id, now_ms());
    }

    pub fn show_player_at(&mut self, exercise_id: &str, now: i64) {
        self.current_exercise_id = Some(exercise_id.to_string());
        self.player_visible = true;
        self.mark_dirty(now);
    }

    pub fn hide_player(&mut self) {
        self.hide_player_at(now_ms());
    }

    pub fn hide_player_at(&mut self, now: i64) {
        self.player_visible = false;
        self.current_exercise_id = None;
        self.mark_dirty(now);
    }

    pub fn set_active_tab(&mut self, tab: &str) {
        self.set_active_tab_at(tab, now_ms());
    }

    pub fn set_active_tab_at(&mut self, tab: &str, now: i64) {
        if self.active_tab != tab {
            self.active_tab = tab.to_string();
            self.mark_dirty(now);
        }
    }

    // --- Lifecycle and persistence protocol ---

    /// Reacts to a coarse host lifecycle transition.
    ///
    /// Going inactive or to the background is the last guaranteed write
    /// point before the process may be killed, so the snapshot is written
    /// immediately, ahead of any pending debounced write. Coming back to
    /// the foreground recomputes the displayed time at once so the stopwatch
    /// is indistinguishable from one that never stopped.
    pub fn handle_app_state(&mut self, state: AppState) {
        self.handle_app_state_at(state, now_ms());
    }

    pub fn handle_app_state_at(&mut self, state: AppState, now: i64) {
        match state {
            AppState::Background | AppState::Inactive => {
                if !self.exercises.is_empty() || self.running || self.total_elapsed_seconds > 0 {
                    // Cancel the pending debounced write so a stale payload
                    // cannot land after this fresher one.
                    self.pending_write_at = None;
                    self.persist(now);
                }
            }
            AppState::Active => {
                if self.running {
                    self.tick_at(now);
                }
            }
        }
    }

    /// Fires the debounced write once its quiescence window has elapsed.
    /// The host calls this from its periodic loop.
    pub fn flush_if_due(&mut self) {
        self.flush_if_due_at(now_ms());
    }

    pub fn flush_if_due_at(&mut self, now: i64) {
        if self.pending_write_at.is_some_and(|due| now >= due) {
            self.pending_write_at = None;
            self.persist(now);
        }
    }

    /// Reschedules the debounced snapshot write. A change arriving before
    /// the window elapses supersedes the earlier schedule.
    fn mark_dirty(&mut self, now: i64) {
        self.pending_write_at = Some(now + self.debounce_ms);
    }

    fn persist(&mut self, now: i64) {
        let snapshot = PersistedSessionState {
            version: SCHEMA_VERSION,
            total_elapsed_seconds: self.total_elapsed_seconds,
            start_timestamp: self.start_timestamp,
            running: self.running,
            last_save_timestamp: now,
            exercises: self.exercises.clone(),
            player_visible: self.player_visible,
            current_exercise_id: self.current_exercise_id.clone(),
            active_tab: self.active_tab.clone(),
        };
        let payload = match serde_json::to_string(&snapshot) {
            Ok(payload) => payload,
            Err(err) => {
                warn!("failed to serialize session snapshot: {err}");
                return;
            }
        };
        if let Err(err) = self.store.set(SESSION_KEY, &payload) {
            warn!("failed to write session snapshot: {err}");
        }
    }

    fn rehydrate(&mut self, now: i64) {
        let raw = match self.store.get(SESSION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(err) => {
                warn!("failed to read session snapshot: {err}");
                self.discard_snapshot();
                return;
            }
        };
        let snapshot: PersistedSessionState = match serde_json::from_str(&raw) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!("discarding unparseable session snapshot: {err}");
                self.discard_snapshot();
                return;
            }
        };
        if snapshot.version != SCHEMA_VERSION {
            debug!(
                "discarding session snapshot with schema version {} (current {})",
                snapshot.version, SCHEMA_VERSION
            );
            self.discard_snapshot();
            return;
        }
        if now - snapshot.last_save_timestamp > self.max_age_ms {
            debug!("discarding stale session snapshot");
            self.discard_snapshot();
            return;
        }

        self.exercises = snapshot.exercises;
        self.player_visible = snapshot.player_visible;
        self.current_exercise_id = snapshot.current_exercise_id;
        self.active_tab = snapshot.active_tab;

        match (snapshot.running, snapshot.start_timestamp) {
            (true, Some(started)) => {
                // Time the process spent dead counts as elapsed workout
                // time. Re-anchor the clock to now so future deltas are
                // computed from resumption.
                let elapsed_since_kill = whole_seconds(now - started);
                self.total_elapsed_seconds = snapshot.total_elapsed_seconds + elapsed_since_kill;
                self.seconds = self.total_elapsed_seconds;
                self.start_timestamp = Some(now);
                self.running = true;
            }
            _ => {
                self.total_elapsed_seconds = snapshot.total_elapsed_seconds;
                self.seconds = snapshot.total_elapsed_seconds;
                self.start_timestamp = None;
                self.running = false;
            }
        }
    }

    fn discard_snapshot(&self) {
        if let Err(err) = self.store.remove(SESSION_KEY) {
            warn!("failed to remove invalid session snapshot: {err}");
        }
    }
}
