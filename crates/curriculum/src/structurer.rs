//! The LLM curriculum structurer pipeline (spec §4.6): build an index-only
//! prompt from a pre-verified resource list, send a single-turn request,
//! tolerantly extract JSON, validate it against the verified list, and
//! retry on structural failure. The model never gets to invent a resource
//! — every reference is a bounds-checked index into input it didn't write.

use chrono::{DateTime, Utc};
use serde::Serialize;

use practice_domain::UserId;

use crate::error::{CurriculumError, ValidationFailure};
use crate::llm_client::LlmClient;
use crate::resource::Resource;
use crate::schema::{CurriculumDifficulty, Progression, RawCurriculum, RawDay};

const SYSTEM_PROMPT: &str = "You are a curriculum structurer. You must reference learning \
resources exclusively by their 1-based index into the numbered list the user provides. \
Never invent a URL, a title, or a resource that is not in that list. Respond with a single \
JSON object matching the requested schema and nothing else.";

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedResourceRef {
    pub index: usize,
    pub resource: Resource,
    pub minutes: u32,
    pub optional: bool,
    pub focus: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedExercise {
    pub kind: String,
    pub description: String,
    pub minutes: u32,
    pub optional: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedDay {
    pub day: u32,
    pub theme: String,
    pub objectives: Vec<String>,
    pub resources: Vec<ResolvedResourceRef>,
    pub exercises: Vec<ResolvedExercise>,
    pub total_minutes: u32,
    pub difficulty: CurriculumDifficulty,
    pub prerequisite_days: Vec<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    pub day: u32,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedCurriculum {
    pub title: String,
    pub description: String,
    pub difficulty: CurriculumDifficulty,
    pub progression: Progression,
    pub days: Vec<ResolvedDay>,
    pub warnings: Vec<Warning>,
    pub generated_at: DateTime<Utc>,
    pub model: String,
    pub request_id: String,
    pub user_id: UserId,
    pub temperature: f32,
}

pub struct GenerateCurriculumParams<'a> {
    pub user_id: UserId,
    pub goal_title: &'a str,
    pub resources: &'a [Resource],
    pub day_count: u32,
    pub minutes_per_day: u32,
    pub temperature: f32,
    pub max_retries: u32,
}

/// Builds the user-facing prompt listing every resource exactly once,
/// 1-indexed (spec §4.6 step 1).
pub fn build_user_prompt(params: &GenerateCurriculumParams<'_>) -> String {
    let mut prompt = format!(
        "Goal: {}\nDays: {}\nMinutes per day: ~{}\n\nAvailable resources (reference ONLY by index):\n",
        params.goal_title, params.day_count, params.minutes_per_day
    );
    for (i, resource) in params.resources.iter().enumerate() {
        prompt.push_str(&resource.prompt_line(i + 1));
        prompt.push('\n');
    }
    prompt.push_str(
        "\nProduce a JSON object with title, description, difficulty, progression, and a \
         `days` array covering exactly the requested day count, referencing resources only \
         by the indices above.",
    );
    prompt
}

/// Strips prose/fences around the JSON object the model returned (spec §4.6
/// step 3): prefers the substring between the first `{` and the last `}`,
/// after removing any ```...``` fences.
pub fn extract_json(raw: &str) -> Option<&str> {
    let without_fences = strip_code_fences(raw);
    let start = without_fences.find('{')?;
    let end = without_fences.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&without_fences[start..=end])
}

fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.trim_start_matches("json").trim_start_matches('\n');
        if let Some(end) = rest.rfind("```") {
            return rest[..end].trim();
        }
        return rest.trim();
    }
    trimmed
}

/// Runs every structural check from spec §4.6 steps 5-9 against a parsed
/// `RawCurriculum`. Steps 5, 6, 8 are hard failures (return `Err`); step 7
/// and 9 produce warnings attached to the eventual success payload.
fn validate(
    raw: &RawCurriculum,
    resource_count: usize,
    expected_days: u32,
) -> Result<Vec<Warning>, ValidationFailure> {
    let mut warnings = Vec::new();

    let mut bad_indices = Vec::new();
    for day in &raw.days {
        for r in &day.resources {
            if r.index < 1 || r.index > resource_count {
                bad_indices.push(r.index);
            }
        }
    }
    if !bad_indices.is_empty() {
        return Err(ValidationFailure::InvalidResourceIndices(bad_indices));
    }

    let mut day_numbers: Vec<u32> = raw.days.iter().map(|d| d.day).collect();
    day_numbers.sort_unstable();
    let expected: Vec<u32> = (1..=expected_days).collect();
    if day_numbers != expected {
        return Err(ValidationFailure::DaySequenceGap {
            expected: expected_days,
            found: day_numbers,
        });
    }

    for day in &raw.days {
        for &prereq in &day.prerequisite_days {
            if prereq >= day.day {
                return Err(ValidationFailure::PrerequisiteNotBefore {
                    day: day.day,
                    prerequisite: prereq,
                });
            }
        }
    }

    for day in &raw.days {
        let sum: u32 = day.resources.iter().map(|r| r.minutes).sum::<u32>()
            + day.exercises.iter().map(|e| e.minutes).sum::<u32>();
        let tolerance = (day.total_minutes as i64 / 10).max(5);
        if (sum as i64 - day.total_minutes as i64).abs() > tolerance {
            warnings.push(Warning {
                day: day.day,
                message: format!(
                    "minutes mismatch: resources+exercises={sum}, totalMinutes={}",
                    day.total_minutes
                ),
            });
        }
        if !day.theme.is_ascii() || day.objectives.iter().any(|o| !o.is_ascii()) {
            warnings.push(Warning {
                day: day.day,
                message: "non-ascii content in theme or objectives".to_string(),
            });
        }
    }

    Ok(warnings)
}

fn resolve(raw: RawCurriculum, resources: &[Resource], warnings: Vec<Warning>) -> ResolvedCurriculum {
    let days = raw
        .days
        .into_iter()
        .map(|d: RawDay| ResolvedDay {
            day: d.day,
            theme: d.theme,
            objectives: d.objectives,
            resources: d
                .resources
                .into_iter()
                .map(|r| ResolvedResourceRef {
                    index: r.index,
                    resource: resources[r.index - 1].clone(),
                    minutes: r.minutes,
                    optional: r.optional,
                    focus: r.focus,
                })
                .collect(),
            exercises: d
                .exercises
                .into_iter()
                .map(|e| ResolvedExercise {
                    kind: format!("{:?}", e.kind).to_lowercase(),
                    description: e.description,
                    minutes: e.minutes,
                    optional: e.optional,
                })
                .collect(),
            total_minutes: d.total_minutes,
            difficulty: d.difficulty,
            prerequisite_days: d.prerequisite_days,
        })
        .collect();

    ResolvedCurriculum {
        title: raw.title,
        description: raw.description,
        difficulty: raw.difficulty,
        progression: raw.progression,
        days,
        warnings,
        generated_at: Utc::now(),
        model: String::new(),
        request_id: String::new(),
        user_id: UserId::new(),
        temperature: 0.0,
    }
}

/// Runs the full pipeline (spec §4.6): hard terminal errors short-circuit
/// immediately; everything else retries up to `params.max_retries` times
/// before surfacing `GENERATION_FAILED` with the last structural error
/// (spec Scenario E).
pub async fn generate_curriculum(
    client: &dyn LlmClient,
    params: &GenerateCurriculumParams<'_>,
) -> Result<ResolvedCurriculum, CurriculumError> {
    if params.resources.is_empty() {
        return Err(CurriculumError::NoResources);
    }
    if params.day_count == 0 {
        return Err(CurriculumError::InvalidDays(params.day_count));
    }

    let user_prompt = build_user_prompt(params);
    let mut last_error = String::new();
    let mut attempts = 0u32;

    while attempts <= params.max_retries {
        attempts += 1;
        let response = client
            .generate(
                SYSTEM_PROMPT,
                &user_prompt,
                params.resources,
                params.temperature,
                params.user_id,
            )
            .await;

        if !response.ok {
            let code = response
                .error
                .map(|e| e.code)
                .unwrap_or_else(|| "UNKNOWN".to_string());
            if code == "CLIENT_NOT_INITIALIZED" {
                return Err(CurriculumError::ClientNotInitialized);
            }
            return Err(CurriculumError::ClientRejected(code));
        }

        let raw_content = response.raw_content.unwrap_or_default();
        let json = match extract_json(&raw_content) {
            Some(j) => j,
            None => {
                last_error = "no JSON object found in response".to_string();
                continue;
            }
        };

        let parsed: RawCurriculum = match serde_json::from_str(json) {
            Ok(p) => p,
            Err(e) => {
                last_error = ValidationFailure::SchemaMismatch(e.to_string()).to_string();
                continue;
            }
        };

        match validate(&parsed, params.resources.len(), params.day_count) {
            Ok(warnings) => {
                let mut curriculum = resolve(parsed, params.resources, warnings);
                curriculum.model = response.metrics.model;
                curriculum.request_id = response.audit.request_id;
                curriculum.user_id = params.user_id;
                curriculum.temperature = params.temperature;
                return Ok(curriculum);
            }
            Err(failure) => {
                last_error = failure.to_string();
                continue;
            }
        }
    }

    Err(CurriculumError::GenerationFailed {
        attempts,
        last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::FakeLlmClient;

    fn resources() -> Vec<Resource> {
        vec![
            Resource {
                title: "Rust Book Ch. 1".into(),
                provider: "doc.rust-lang.org".into(),
                difficulty: "beginner".into(),
                estimated_minutes: 30,
                topics: vec!["syntax".into()],
                url: "https://doc.rust-lang.org/book/ch01".into(),
            },
            Resource {
                title: "Ownership Deep Dive".into(),
                provider: "doc.rust-lang.org".into(),
                difficulty: "intermediate".into(),
                estimated_minutes: 45,
                topics: vec!["ownership".into()],
                url: "https://doc.rust-lang.org/book/ch04".into(),
            },
            Resource {
                title: "Traits".into(),
                provider: "doc.rust-lang.org".into(),
                difficulty: "intermediate".into(),
                estimated_minutes: 40,
                topics: vec!["traits".into()],
                url: "https://doc.rust-lang.org/book/ch10".into(),
            },
        ]
    }

    fn valid_response(days: u32) -> String {
        let days_json: Vec<String> = (1..=days)
            .map(|d| {
                format!(
                    r#"{{"day":{d},"theme":"Day {d}","objectives":["learn"],"resources":[{{"index":1,"minutes":30}}],"exercises":[{{"type":"practice","description":"do it","minutes":10}}],"totalMinutes":40,"difficulty":"beginner","prerequisiteDays":[]}}"#
                )
            })
            .collect();
        format!(
            r#"Sure, here you go:
```json
{{"title":"Learn Rust","description":"A plan","difficulty":"beginner","progression":"gradual","days":[{}]}}
```"#,
            days_json.join(",")
        )
    }

    fn params<'a>(resources: &'a [Resource], days: u32) -> GenerateCurriculumParams<'a> {
        GenerateCurriculumParams {
            user_id: UserId::new(),
            goal_title: "Learn Rust",
            resources,
            day_count: days,
            minutes_per_day: 40,
            temperature: 0.4,
            max_retries: 2,
        }
    }

    #[tokio::test]
    async fn happy_path_resolves_indices_to_resources() {
        let resources = resources();
        let client = FakeLlmClient::single(valid_response(2));
        let result = generate_curriculum(&client, &params(&resources, 2)).await.unwrap();
        assert_eq!(result.days.len(), 2);
        assert_eq!(result.days[0].resources[0].resource.title, "Rust Book Ch. 1");
    }

    #[tokio::test]
    async fn no_resources_is_hard_failure() {
        let resources: Vec<Resource> = vec![];
        let client = FakeLlmClient::single(valid_response(1));
        let err = generate_curriculum(&client, &params(&resources, 1)).await.unwrap_err();
        assert!(matches!(err, CurriculumError::NoResources));
    }

    #[tokio::test]
    async fn zero_days_is_hard_failure() {
        let resources = resources();
        let client = FakeLlmClient::single(valid_response(1));
        let err = generate_curriculum(&client, &params(&resources, 0)).await.unwrap_err();
        assert!(matches!(err, CurriculumError::InvalidDays(0)));
    }

    /// Scenario E: out-of-range index retries then fails with GENERATION_FAILED.
    #[tokio::test]
    async fn out_of_range_index_exhausts_retries() {
        let resources = resources();
        let bad = r#"{"title":"x","description":"y","difficulty":"beginner","progression":"flat",
            "days":[{"day":1,"theme":"t","objectives":[],"resources":[{"index":5,"minutes":10}],
            "exercises":[],"totalMinutes":10,"difficulty":"beginner","prerequisiteDays":[]},
            {"day":2,"theme":"t2","objectives":[],"resources":[],"exercises":[],"totalMinutes":10,
            "difficulty":"beginner","prerequisiteDays":[]}]}"#;
        let client = FakeLlmClient::new(vec![bad.to_string(); 3]);
        let err = generate_curriculum(&client, &params(&resources, 2)).await.unwrap_err();
        match err {
            CurriculumError::GenerationFailed { last_error, attempts } => {
                assert!(last_error.contains("Invalid resource indices"));
                assert_eq!(attempts, 3);
            }
            _ => panic!("expected GenerationFailed"),
        }
    }

    #[tokio::test]
    async fn retry_recovers_after_initial_malformed_response() {
        let resources = resources();
        let client = FakeLlmClient::new(vec!["not json at all".to_string(), valid_response(1)]);
        let result = generate_curriculum(&client, &params(&resources, 1)).await.unwrap();
        assert_eq!(result.days.len(), 1);
    }

    #[test]
    fn extract_json_strips_fences_and_prose() {
        let raw = "Here's the plan:\n```json\n{\"a\":1}\n```\nHope that helps!";
        assert_eq!(extract_json(raw), Some("{\"a\":1}"));
    }

    #[test]
    fn day_gap_is_rejected() {
        let resources = resources();
        let raw: RawCurriculum = serde_json::from_str(
            r#"{"title":"x","description":"y","difficulty":"beginner","progression":"flat",
            "days":[{"day":1,"theme":"t","objectives":[],"resources":[],"exercises":[],
            "totalMinutes":10,"difficulty":"beginner","prerequisiteDays":[]},
            {"day":3,"theme":"t","objectives":[],"resources":[],"exercises":[],
            "totalMinutes":10,"difficulty":"beginner","prerequisiteDays":[]}]}"#,
        )
        .unwrap();
        let err = validate(&raw, resources.len(), 2).unwrap_err();
        assert!(matches!(err, ValidationFailure::DaySequenceGap { .. }));
    }
}
