use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// ============================================================================
// Request DTOs
// ============================================================================

/// A workout save as sent by the client, and as replayed from the offline queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct WorkoutSavePayload {
    pub session_id: Uuid,
    pub template_id: Option<Uuid>,
    pub workout_date: DateTime<Utc>,

    #[validate(
        length(min = 1, max = 64, message = "A session needs between 1 and 64 exercises"),
        nested
    )]
    pub exercises: Vec<ExerciseEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ExerciseEntry {
    #[validate(length(min = 1, max = 120, message = "Exercise name must be 1-120 characters"))]
    pub exercise_name: String,

    #[validate(nested)]
    #[serde(default)]
    pub sets: Vec<SetEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SetEntry {
    #[validate(range(min = 0.0, max = 2000.0, message = "Weight must be between 0 and 2000"))]
    pub weight: Option<f64>,

    #[validate(range(min = 0, max = 1000, message = "Reps must be between 0 and 1000"))]
    pub reps: Option<u32>,

    #[serde(default)]
    pub unit: WeightUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[default]
    Kg,
    Lbs,
}

// ============================================================================
// Stored session
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSession {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub template_id: Option<Uuid>,
    pub workout_date: DateTime<Utc>,
    pub exercises: Vec<ExerciseEntry>,
    /// Bumped on every save; the last write wins
    pub revision: u32,
    pub updated_at: DateTime<Utc>,
}

impl WorkoutSession {
    pub fn total_sets(&self) -> usize {
        self.exercises.iter().map(|e| e.sets.len()).sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SavedSession {
    pub session: WorkoutSession,
    pub created: bool,
    /// Live connections that received the update
    pub notified_connections: usize,
}

// ============================================================================
// Live updates
// ============================================================================

/// Event pushed over `/api/sse/workout-updates`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WorkoutUpdateEvent {
    Connected {
        user_id: Uuid,
        connection_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    WorkoutUpdated {
        session_id: Uuid,
        template_id: Option<Uuid>,
        workout_date: DateTime<Utc>,
        exercise_count: usize,
        revision: u32,
        timestamp: DateTime<Utc>,
    },
}

impl WorkoutUpdateEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            WorkoutUpdateEvent::Connected { .. } => "connected",
            WorkoutUpdateEvent::WorkoutUpdated { .. } => "workout-updated",
        }
    }

    pub fn workout_updated(session: &WorkoutSession) -> Self {
        WorkoutUpdateEvent::WorkoutUpdated {
            session_id: session.session_id,
            template_id: session.template_id,
            workout_date: session.workout_date,
            exercise_count: session.exercises.len(),
            revision: session.revision,
            timestamp: Utc::now(),
        }
    }
}
