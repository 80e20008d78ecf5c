//! The JSON schema the LLM is contractually expected to return (spec §4.6).
//! `RawCurriculum` is what we deserialize into before any validation — it's
//! untrusted until every check in `validate` passes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurriculumDifficulty {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Progression {
    Flat,
    Gradual,
    Steep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseType {
    Practice,
    Quiz,
    Project,
    Reflection,
    Discussion,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawResourceRef {
    pub index: usize,
    pub minutes: u32,
    #[serde(default)]
    pub optional: bool,
    pub focus: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawExercise {
    #[serde(rename = "type")]
    pub kind: ExerciseType,
    pub description: String,
    pub minutes: u32,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDay {
    pub day: u32,
    pub theme: String,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub resources: Vec<RawResourceRef>,
    #[serde(default)]
    pub exercises: Vec<RawExercise>,
    pub total_minutes: u32,
    pub difficulty: CurriculumDifficulty,
    #[serde(default)]
    pub prerequisite_days: Vec<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawCurriculum {
    pub title: String,
    pub description: String,
    pub difficulty: CurriculumDifficulty,
    pub progression: Progression,
    pub days: Vec<RawDay>,
}
