//! LLM client contract (spec §6): a single-turn request/response boundary
//! the structurer calls through. Input sanitization and token-budget
//! enforcement are the client's job; this crate only ever interprets
//! `raw_content` (spec §4.6 step 2-3).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use practice_domain::UserId;

use crate::resource::Resource;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmMetrics {
    pub total_tokens: u32,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmAudit {
    pub request_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmErrorInfo {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub ok: bool,
    pub raw_content: Option<String>,
    pub error: Option<LlmErrorInfo>,
    pub metrics: LlmMetrics,
    pub audit: LlmAudit,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        sanitized_resources: &[Resource],
        temperature: f32,
        user_id: UserId,
    ) -> LlmResponse;
}

/// Test/dev double: returns a scripted sequence of raw responses, one per
/// call, repeating the last once exhausted. Lets tests script a first
/// malformed attempt followed by a valid retry (spec Scenario E).
pub struct FakeLlmClient {
    responses: std::sync::Mutex<Vec<String>>,
    model: String,
}

impl FakeLlmClient {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses),
            model: "fake-structurer".to_string(),
        }
    }

    pub fn single(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }
}

#[async_trait]
impl LlmClient for FakeLlmClient {
    async fn generate(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
        _sanitized_resources: &[Resource],
        _temperature: f32,
        _user_id: UserId,
    ) -> LlmResponse {
        let mut guard = self.responses.lock().unwrap();
        let content = if guard.len() > 1 {
            guard.remove(0)
        } else {
            guard.first().cloned().unwrap_or_default()
        };
        LlmResponse {
            ok: true,
            raw_content: Some(content),
            error: None,
            metrics: LlmMetrics {
                total_tokens: 0,
                model: self.model.clone(),
            },
            audit: LlmAudit {
                request_id: uuid::Uuid::new_v4().to_string(),
            },
        }
    }
}
