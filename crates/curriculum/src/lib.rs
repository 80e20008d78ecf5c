pub mod error;
pub mod llm_client;
pub mod resolver;
pub mod resource;
pub mod schema;
pub mod structurer;

pub use error::{CurriculumError, ValidationFailure};
pub use llm_client::{FakeLlmClient, LlmAudit, LlmClient, LlmErrorInfo, LlmMetrics, LlmResponse};
pub use resolver::{
    resolve_entities, resolve_entity, Category, EntityMetadata, EntityType, ResolutionStatus,
    ResolutionTrace, ResolveEntitiesResult, ResolvedEntity,
};
pub use resource::Resource;
pub use schema::{CurriculumDifficulty, ExerciseType, Progression, RawCurriculum, RawDay, RawExercise, RawResourceRef};
pub use structurer::{generate_curriculum, GenerateCurriculumParams, ResolvedCurriculum, ResolvedDay, ResolvedExercise, ResolvedResourceRef, Warning};
