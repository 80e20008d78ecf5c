//! Secure Store (spec §4.1): a KV-backed persistence layer with envelope
//! encryption, optimistic concurrency, namespaced indexes, and cascade
//! delete, generic over any backend satisfying [`KvBackend`].

pub mod backend;
pub mod cascade;
pub mod crypto;
pub mod drill_repository;
pub mod envelope;
pub mod error;
pub mod goal_repository;
pub mod keys;
pub mod memory_backend;
pub mod quest_repository;
pub mod reminder_repository;
pub mod skill_repository;
pub mod spark_repository;
pub mod store;

#[cfg(feature = "redis-backend")]
pub mod redis_backend;

pub use backend::KvBackend;
pub use cascade::{CascadeCount, CascadeDeleter};
pub use crypto::KeyRing;
pub use drill_repository::DrillRepository;
pub use error::StoreError;
pub use goal_repository::GoalRepository;
pub use memory_backend::MemoryBackend;
pub use quest_repository::QuestRepository;
pub use reminder_repository::ReminderRepository;
pub use skill_repository::SkillRepository;
pub use spark_repository::SparkRepository;
pub use store::SecureStore;

#[cfg(feature = "redis-backend")]
pub use redis_backend::RedisBackend;
