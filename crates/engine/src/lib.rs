//! Engine Orchestrator (spec §4.8): composes the Secure Store, Scheduler,
//! Reminder Engine, and Curriculum crates behind the public operations an
//! HTTP surface calls.

pub mod engine;
pub mod goals;
pub mod params;
pub mod practice;

pub use engine::Engine;
pub use params::{CreateGoalParams, GoalProgress, OnGoalCreatedResult, QuestSeed};
