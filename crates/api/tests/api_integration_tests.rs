use std::sync::Arc;
use std::time::Instant;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use jsonwebtoken::{EncodingKey, Header, encode};
use practice_api::{AppState, build_router};
use practice_config::{AppConfig, CacheConfig, LlmConfig, ReminderConfig};
use practice_domain::UserId;
use practice_engine::Engine;
use practice_store::{MemoryBackend, SecureStore};
use serde::Serialize;
use serde_json::{Value, json};
use tower::ServiceExt;

fn test_config() -> AppConfig {
    AppConfig {
        bind_address: "127.0.0.1:0".to_string(),
        jwt_secret: "test-secret".to_string(),
        encryption_key_base64: None,
        redis_url: None,
        default_timezone: "UTC".to_string(),
        mastery_threshold: 3,
        cache: CacheConfig::default(),
        reminder: ReminderConfig::default(),
        llm: LlmConfig::default(),
        provider_timeout_ms: 5_000,
    }
}

fn test_state() -> Arc<AppState<MemoryBackend>> {
    let store = SecureStore::new(Arc::new(MemoryBackend::new()), None);
    let config = test_config();
    Arc::new(AppState {
        engine: Arc::new(Engine::new(store, config.clone())),
        config,
        start_time: Instant::now(),
    })
}

#[derive(Serialize)]
struct Claims {
    sub: String,
    exp: u64,
}

fn auth_header(user_id: UserId) -> String {
    let token = encode(
        &Header::default(),
        &Claims {
            sub: user_id.to_string(),
            exp: 9_999_999_999,
        },
        &EncodingKey::from_secret(b"test-secret"),
    )
    .unwrap();
    format!("Bearer {token}")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_public_and_ok() {
    let state = test_state();
    let app = build_router(state);

    let response = app
        .oneshot(Request::builder().uri("/v1/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_bearer_token_is_unauthorized() {
    let state = test_state();
    let app = build_router(state);

    let response = app
        .oneshot(Request::builder().uri("/v1/goals").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_goal_then_get_it_roundtrips() {
    let state = test_state();
    let app = build_router(state);
    let user_id = UserId::new();

    let create = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/goals")
                .header(header::AUTHORIZATION, auth_header(user_id))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "title": "Learn Python",
                        "description": "",
                        "timezone": "America/New_York",
                        "priority": 1
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(create.status(), StatusCode::CREATED);
    let created = body_json(create).await;
    let goal_id = created["id"].as_str().unwrap().to_string();

    let fetched = app
        .oneshot(
            Request::builder()
                .uri(format!("/v1/goals/{goal_id}"))
                .header(header::AUTHORIZATION, auth_header(user_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(fetched.status(), StatusCode::OK);
    let fetched = body_json(fetched).await;
    assert_eq!(fetched["title"], "Learn Python");
    assert_eq!(fetched["status"], "active");
}

/// Scenario F — ownership isolation: a second user asking for someone
/// else's Goal gets `NOT_FOUND`, never `FORBIDDEN`.
#[tokio::test]
async fn goal_owned_by_another_user_is_not_found() {
    let state = test_state();
    let app = build_router(state);
    let owner = UserId::new();
    let other = UserId::new();

    let create = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/goals")
                .header(header::AUTHORIZATION, auth_header(owner))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"title": "G", "description": "", "timezone": "UTC", "priority": 1})
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    let goal_id = body_json(create).await["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/v1/goals/{goal_id}"))
                .header(header::AUTHORIZATION, auth_header(other))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn on_goal_created_then_today_returns_scheduled_drill() {
    let state = test_state();
    let app = build_router(state);
    let user_id = UserId::new();

    let create = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/goals")
                .header(header::AUTHORIZATION, auth_header(user_id))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"title": "Learn Rust", "description": "", "timezone": "UTC", "priority": 1})
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    let goal_id = body_json(create).await["id"].as_str().unwrap().to_string();

    let quests = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/v1/goals/{goal_id}/quests"))
                .header(header::AUTHORIZATION, auth_header(user_id))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"quests": [{"title": "Basics", "description": "", "order": 1}]}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(quests.status(), StatusCode::CREATED);

    let today = app
        .oneshot(
            Request::builder()
                .uri("/v1/practice/today")
                .header(header::AUTHORIZATION, auth_header(user_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(today.status(), StatusCode::OK);
    let today = body_json(today).await;
    assert_eq!(today["hasContent"], true);
    assert_eq!(today["spark"]["escalationLevel"], 0);
}
