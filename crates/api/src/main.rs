//! Practice Engine Server

use std::sync::Arc;
use std::time::Instant;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use practice_api::{AppState, build_router};
use practice_config::AppConfig;
use practice_engine::Engine;
use practice_scheduler::NotificationChannel;
use practice_store::{KeyRing, SecureStore};

#[cfg(not(feature = "redis-backend"))]
type Backend = practice_store::MemoryBackend;
#[cfg(feature = "redis-backend")]
type Backend = practice_store::RedisBackend;

#[cfg(not(feature = "redis-backend"))]
async fn build_backend(_config: &AppConfig) -> anyhow::Result<Backend> {
    Ok(practice_store::MemoryBackend::new())
}

#[cfg(feature = "redis-backend")]
async fn build_backend(config: &AppConfig) -> anyhow::Result<Backend> {
    let url = config
        .redis_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("REDIS_URL is required when built with redis-backend"))?;
    Ok(practice_store::RedisBackend::connect(url).await?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Practice Engine Server...");

    let config = AppConfig::from_env()?;
    tracing::info!("Binding to {}", config.bind_address);

    let backend = Arc::new(build_backend(&config).await?);
    tracing::info!("Store backend ready");

    let ring = config
        .encryption_key_base64
        .as_deref()
        .map(KeyRing::from_base64)
        .transpose()?
        .map(Arc::new);
    if ring.is_none() {
        tracing::warn!("ENCRYPTION_KEY_BASE64 not set; running with plaintext envelopes");
    }

    let store = SecureStore::new(backend, ring);
    let engine = Arc::new(Engine::new(store, config.clone()));

    let channels: Vec<Arc<dyn NotificationChannel>> = Vec::new();
    if channels.is_empty() {
        tracing::warn!("no notification channels registered; reminders will dispatch with no delivery surface");
    }
    let _dispatch_handle = engine.spawn_background_tasks(channels);

    let state = Arc::new(AppState {
        engine,
        config: config.clone(),
        start_time: Instant::now(),
    });

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    tracing::info!("Server listening on {}", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
