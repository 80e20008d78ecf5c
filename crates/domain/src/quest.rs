//! Quest entity: an ordered milestone under a Goal (spec §3, §4.2).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::EngineError;
use crate::ids::{GoalId, QuestId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    Pending,
    Active,
    Completed,
    Skipped,
}

impl QuestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, QuestStatus::Completed | QuestStatus::Skipped)
    }

    fn as_str(self) -> &'static str {
        match self {
            QuestStatus::Pending => "pending",
            QuestStatus::Active => "active",
            QuestStatus::Completed => "completed",
            QuestStatus::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestEvent {
    Start,
    Complete,
    Skip,
}

impl QuestEvent {
    fn as_str(self) -> &'static str {
        match self {
            QuestEvent::Start => "start",
            QuestEvent::Complete => "complete",
            QuestEvent::Skip => "skip",
        }
    }
}

/// Target state a sibling active Quest is pushed to when another Quest of
/// the same Goal starts (spec §9 Open Question, resolved in SPEC_FULL.md §6:
/// "pending").
pub const SIBLING_DEACTIVATION_TARGET: QuestStatus = QuestStatus::Pending;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quest {
    pub id: QuestId,
    pub goal_id: GoalId,
    pub title: String,
    pub description: String,
    pub status: QuestStatus,
    pub order: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quest {
    pub fn new(goal_id: GoalId, title: String, description: String, order: u32) -> Result<Self, EngineError> {
        if order == 0 {
            return Err(EngineError::Validation("quest order must be positive".into()));
        }
        Ok(Self {
            id: QuestId::new(),
            goal_id,
            title,
            description,
            status: QuestStatus::Pending,
            order,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    }

    fn allowed_events(&self) -> Vec<QuestEvent> {
        match self.status {
            QuestStatus::Pending => vec![QuestEvent::Start, QuestEvent::Skip],
            QuestStatus::Active => vec![QuestEvent::Complete, QuestEvent::Skip],
            QuestStatus::Completed | QuestStatus::Skipped => vec![],
        }
    }

    fn reject(&self, event: QuestEvent) -> EngineError {
        EngineError::invalid_transition(
            self.status.as_str(),
            event.as_str(),
            self.allowed_events()
                .into_iter()
                .map(|e| e.as_str().to_string())
                .collect(),
        )
    }

    pub fn apply(&mut self, event: QuestEvent) -> Result<(), EngineError> {
        let next = match (self.status, event) {
            (QuestStatus::Pending, QuestEvent::Start) => QuestStatus::Active,
            (QuestStatus::Pending, QuestEvent::Skip) => QuestStatus::Skipped,
            (QuestStatus::Active, QuestEvent::Complete) => QuestStatus::Completed,
            (QuestStatus::Active, QuestEvent::Skip) => QuestStatus::Skipped,
            _ => return Err(self.reject(event)),
        };
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}
