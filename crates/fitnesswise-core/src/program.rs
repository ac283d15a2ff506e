//! # Program Templates
//!
//! The three fixed workout programs. Templates are static and immutable; a
//! session gets its own deep copy when it starts (see
//! [`WorkoutSession::start`](crate::session::WorkoutSession::start)).
//!
//! ```text
//! ┌──────────┬──────────────────────────────┬───────────────────────────┐
//! │ Program  │ Title                        │ Exercises (3 sets each)   │
//! ├──────────┼──────────────────────────────┼───────────────────────────┤
//! │ A        │ Vertical Pull Focus          │ 4                         │
//! │ B        │ Horizontal Pull & Barbell    │ 4                         │
//! │ C        │ Power & Mixed Patterns       │ 5                         │
//! └──────────┴──────────────────────────────┴───────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreError;

// =============================================================================
// Workout Program
// =============================================================================

/// One of the three fixed programs.
///
/// Serialized as `"A"`, `"B"` or `"C"` (the API calls this `workoutDay`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum WorkoutProgram {
    A,
    B,
    C,
}

impl WorkoutProgram {
    /// All programs in rotation order.
    pub const ALL: [WorkoutProgram; 3] = [WorkoutProgram::A, WorkoutProgram::B, WorkoutProgram::C];

    /// Returns the single-letter code.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkoutProgram::A => "A",
            WorkoutProgram::B => "B",
            WorkoutProgram::C => "C",
        }
    }
}

impl std::fmt::Display for WorkoutProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkoutProgram {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(WorkoutProgram::A),
            "B" => Ok(WorkoutProgram::B),
            "C" => Ok(WorkoutProgram::C),
            other => Err(CoreError::UnknownProgram(other.to_string())),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Immutable definition of one exercise in a program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ExerciseTemplate {
    pub name: String,
    pub description: String,
    pub equipment: String,
    pub muscle_groups: Vec<String>,
    pub video_url: Option<String>,
    /// One entry per set, in order.
    pub target_reps: Vec<u32>,
}

/// A named program with its exercise list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProgramTemplate {
    pub program: WorkoutProgram,
    pub title: String,
    pub focus: String,
    pub exercises: Vec<ExerciseTemplate>,
}

impl ProgramTemplate {
    /// Builds the template for a program from the static catalog.
    pub fn for_program(program: WorkoutProgram) -> Self {
        let def = match program {
            WorkoutProgram::A => &PROGRAM_A,
            WorkoutProgram::B => &PROGRAM_B,
            WorkoutProgram::C => &PROGRAM_C,
        };

        ProgramTemplate {
            program,
            title: def.title.to_string(),
            focus: def.focus.to_string(),
            exercises: def.exercises.iter().map(ExerciseDef::to_template).collect(),
        }
    }

    /// Total number of sets across all exercises.
    pub fn total_sets(&self) -> usize {
        self.exercises.iter().map(|e| e.target_reps.len()).sum()
    }
}

// =============================================================================
// Static Catalog
// =============================================================================

struct ProgramDef {
    title: &'static str,
    focus: &'static str,
    exercises: &'static [ExerciseDef],
}

struct ExerciseDef {
    name: &'static str,
    description: &'static str,
    equipment: &'static str,
    muscle_groups: &'static [&'static str],
    video_url: &'static str,
    target_reps: &'static [u32],
}

impl ExerciseDef {
    fn to_template(&self) -> ExerciseTemplate {
        ExerciseTemplate {
            name: self.name.to_string(),
            description: self.description.to_string(),
            equipment: self.equipment.to_string(),
            muscle_groups: self.muscle_groups.iter().map(|m| m.to_string()).collect(),
            video_url: Some(self.video_url.to_string()),
            target_reps: self.target_reps.to_vec(),
        }
    }
}

static PROGRAM_A: ProgramDef = ProgramDef {
    title: "Vertical Pull Focus",
    focus: "Building pull-up strength and lat development for that coveted V-taper",
    exercises: &[
        ExerciseDef {
            name: "Pull-ups",
            description: "Vertical pulling movement for lat development. Focus on full range of motion and controlled tempo.",
            equipment: "pull-up bar",
            muscle_groups: &["lats", "rhomboids", "middle traps", "biceps"],
            video_url: "https://www.youtube.com/watch?v=eGo4IYlbE5g",
            target_reps: &[8, 6, 4],
        },
        ExerciseDef {
            name: "Lat Pulldowns",
            description: "Machine-based vertical pull. Use wide grip and focus on pulling elbows down and back.",
            equipment: "cable machine",
            muscle_groups: &["lats", "rear delts", "biceps"],
            video_url: "https://www.youtube.com/watch?v=CAwf7n6Luuc",
            target_reps: &[10, 8, 6],
        },
        ExerciseDef {
            name: "Cable Rows",
            description: "Horizontal pulling for thickness. Keep chest up and squeeze shoulder blades together.",
            equipment: "cable machine",
            muscle_groups: &["rhomboids", "middle traps", "rear delts", "biceps"],
            video_url: "https://www.youtube.com/watch?v=GZbfZ033f74",
            target_reps: &[12, 10, 8],
        },
        ExerciseDef {
            name: "Straight-Arm Pulldowns",
            description: "Isolation movement for lats. Keep arms straight and focus on lat engagement.",
            equipment: "cable machine",
            muscle_groups: &["lats", "rear delts"],
            video_url: "https://www.youtube.com/watch?v=kjR8Dx6R2tc",
            target_reps: &[15, 12, 10],
        },
    ],
};

static PROGRAM_B: ProgramDef = ProgramDef {
    title: "Horizontal Pull & Barbell",
    focus: "Building back thickness and strength with horizontal movements",
    exercises: &[
        ExerciseDef {
            name: "Barbell Rows",
            description: "Compound horizontal pulling movement. Maintain neutral spine and pull bar to lower chest.",
            equipment: "barbell",
            muscle_groups: &["rhomboids", "middle traps", "lats", "rear delts"],
            video_url: "https://www.youtube.com/watch?v=9efgcAjQe7E",
            target_reps: &[8, 6, 5],
        },
        ExerciseDef {
            name: "T-Bar Rows",
            description: "Heavy horizontal pulling with neutral grip. Focus on driving elbows back.",
            equipment: "T-bar row machine",
            muscle_groups: &["rhomboids", "middle traps", "lats"],
            video_url: "https://www.youtube.com/watch?v=j3Igk5nyZE4",
            target_reps: &[10, 8, 6],
        },
        ExerciseDef {
            name: "Dumbbell Rows",
            description: "Unilateral horizontal pulling. Focus on full range of motion and controlled tempo.",
            equipment: "dumbbells",
            muscle_groups: &["lats", "rhomboids", "rear delts", "biceps"],
            video_url: "https://www.youtube.com/watch?v=roCP6wCXPqo",
            target_reps: &[12, 10, 8],
        },
        ExerciseDef {
            name: "Face Pulls",
            description: "High-rep posterior delt and rhomboid exercise. Pull to face level with external rotation.",
            equipment: "cable machine",
            muscle_groups: &["rear delts", "rhomboids", "external rotators"],
            video_url: "https://www.youtube.com/watch?v=rep-qVOkqgk",
            target_reps: &[20, 15, 12],
        },
    ],
};

static PROGRAM_C: ProgramDef = ProgramDef {
    title: "Power & Mixed Patterns",
    focus: "Explosive strength and varied movement patterns for complete back development",
    exercises: &[
        ExerciseDef {
            name: "Deadlifts",
            description: "King of back exercises. Focus on hip hinge pattern and maintaining neutral spine.",
            equipment: "barbell",
            muscle_groups: &["erector spinae", "lats", "traps", "rhomboids"],
            video_url: "https://www.youtube.com/watch?v=op9kVnSso6Q",
            target_reps: &[5, 3, 2],
        },
        ExerciseDef {
            name: "Rack Pulls",
            description: "Partial deadlift from elevated position. Focus on lockout strength and trap development.",
            equipment: "barbell, power rack",
            muscle_groups: &["upper traps", "erector spinae", "lats"],
            video_url: "https://www.youtube.com/watch?v=ZWi2ZcXMMJ4",
            target_reps: &[6, 4, 3],
        },
        ExerciseDef {
            name: "Chin-ups",
            description: "Underhand grip pull-up variation. More bicep involvement and slightly different lat activation.",
            equipment: "pull-up bar",
            muscle_groups: &["lats", "biceps", "rhomboids"],
            video_url: "https://www.youtube.com/watch?v=brhRXlOhkAM",
            target_reps: &[8, 6, 4],
        },
        ExerciseDef {
            name: "Renegade Rows",
            description: "Dynamic core and back exercise. Maintain plank position while rowing.",
            equipment: "dumbbells",
            muscle_groups: &["lats", "rhomboids", "core", "shoulders"],
            video_url: "https://www.youtube.com/watch?v=KjzScCM_-h8",
            target_reps: &[10, 8, 6],
        },
        ExerciseDef {
            name: "Band Pull-Aparts",
            description: "High-rep rear delt and rhomboid exercise. Focus on squeezing shoulder blades together.",
            equipment: "resistance band",
            muscle_groups: &["rear delts", "rhomboids", "middle traps"],
            video_url: "https://www.youtube.com/watch?v=phCDeJSjzj8",
            target_reps: &[25, 20, 15],
        },
    ],
};

// =============================================================================
// Tests
// =============================================================================
