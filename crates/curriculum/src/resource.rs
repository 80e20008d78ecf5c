//! The pre-verified resource list the structurer indexes into. These never
//! come from the model — they're looked up (by the orchestrator's caller)
//! before the prompt is built, and the model is only ever allowed to
//! reference them by position (spec §4.6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    pub title: String,
    pub provider: String,
    pub difficulty: String,
    pub estimated_minutes: u32,
    pub topics: Vec<String>,
    pub url: String,
}

impl Resource {
    /// Renders one `[i] title (provider, difficulty, ~Nmin) [— Topics: …]`
    /// prompt line (spec §4.6 step 1), `index` already 1-based.
    pub fn prompt_line(&self, index: usize) -> String {
        let mut line = format!(
            "[{index}] {} ({}, {}, ~{}min)",
            self.title, self.provider, self.difficulty, self.estimated_minutes
        );
        if !self.topics.is_empty() {
            line.push_str(&format!(" — Topics: {}", self.topics.join(", ")));
        }
        line
    }
}
