pub mod api;
pub mod config;
pub mod content_generator;
pub mod database;
pub mod errors;
pub mod llm_providers;
pub mod logging;
pub mod models;
pub mod study_service;

pub use config::Config;
pub use content_generator::{ContentGenerator, GenerationError, MAX_QUIZ_QUESTIONS, MAX_SUBTOPICS};
pub use database::Database;
pub use errors::*;
pub use llm_providers::{JsonResponseParser, LlmProvider, LlmProviderFactory, LlmProviderType};
pub use models::*;
pub use study_service::{StudyService, StudyServiceError};
