// src/models.rs
use serde::{Deserialize, Serialize};

/// Schema version written into every snapshot. A stored snapshot with a
/// different version is discarded on rehydration rather than migrated.
pub const SCHEMA_VERSION: u32 = 1;

/// A single set within an exercise. Reps and weight are kept as free-form
/// text exactly as entered; numeric validation belongs to the entry UI.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkoutSet {
    pub reps: String,
    pub weight: String,
}

impl WorkoutSet {
    /// A set counts as complete once both fields have been filled in.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.reps.is_empty() && !self.weight.is_empty()
    }
}

/// An exercise added to the in-progress session. Identity within the
/// session is `workout_exercise_id`; `exercise_id` points at the catalog
/// entry it was created from.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutExercise {
    pub workout_exercise_id: String,
    pub exercise_id: String,
    pub name: String,
    pub sets: Vec<WorkoutSet>,
}

impl WorkoutExercise {
    #[must_use]
    pub fn complete_set_count(&self) -> usize {
        self.sets.iter().filter(|s| s.is_complete()).count()
    }
}

/// Partial update applied to an existing exercise; `None` fields are left
/// untouched.
#[derive(Debug, Clone, Default)]
pub struct ExercisePatch {
    pub exercise_id: Option<String>,
    pub name: Option<String>,
    pub sets: Option<Vec<WorkoutSet>>,
}

/// The durable snapshot of a session, serialized to JSON under a single
/// store key. Field names stay camelCase to match the snapshot format the
/// mobile client writes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSessionState {
    pub version: u32,
    pub total_elapsed_seconds: u64,
    /// Epoch milliseconds; set only while the timer is running.
    pub start_timestamp: Option<i64>,
    pub running: bool,
    /// Epoch milliseconds of the write; used for the stale-snapshot guard.
    pub last_save_timestamp: i64,
    pub exercises: Vec<WorkoutExercise>,
    pub player_visible: bool,
    pub current_exercise_id: Option<String>,
    pub active_tab: String,
}

/// Coarse host lifecycle states delivered by the platform layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Active,
    Inactive,
    Background,
}

#[cfg(test)]
mod tests {
    use super::{WorkoutExercise, WorkoutSet};

    #[test]
    fn set_complete_requires_both_fields() {
        let empty = WorkoutSet::default();
        assert!(!empty.is_complete());

        let reps_only = WorkoutSet {
            reps: "8".to_string(),
            weight: String::new(),
        };
        assert!(!reps_only.is_complete());

        let full = WorkoutSet {
            reps: "8".to_string(),
            weight: "60".to_string(),
        };
        assert!(full.is_complete());
    }

    #[test]
    fn snapshot_json_uses_camel_case_keys() {
        let exercise = WorkoutExercise {
            workout_exercise_id: "wx-1".to_string(),
            exercise_id: "bench-press".to_string(),
            name: "Bench Press".to_string(),
            sets: vec![WorkoutSet {
                reps: "5".to_string(),
                weight: "100".to_string(),
            }],
        };
        let json = serde_json::to_string(&exercise).unwrap();
        assert!(json.contains("\"workoutExerciseId\""));
        assert!(json.contains("\"exerciseId\""));
        let back: WorkoutExercise = serde_json::from_str(&json).unwrap();
        assert_eq!(back, exercise);
    }
}
