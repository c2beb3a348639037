use anyhow::Result;
use tracing::{debug, info};

use crate::content_generator::{ContentGenerator, GenerationError};
use crate::database::Database;
use crate::models::*;

/// Failures from the orchestrated study flows. Not-found cases are split
/// out so the API layer can map them to 404s; generation failures stay
/// distinct from database failures for logging.
#[derive(Debug, thiserror::Error)]
pub enum StudyServiceError {
    #[error("Subtopic not found")]
    SubtopicNotFound,

    #[error("Topic not found")]
    TopicNotFound,

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

#[derive(Clone)]
pub struct StudyService {
    db: Database,
    generator: ContentGenerator,
}

impl StudyService {
    pub fn new(db: Database, generator: ContentGenerator) -> Self {
        Self { db, generator }
    }

    // User operations

    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User> {
        self.db.create_user(request).await
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.db.get_user(id).await
    }

    #[allow(dead_code)]
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.db.get_user_by_username(username).await
    }

    pub async fn update_user(&self, id: &str, request: UpdateUserRequest) -> Result<Option<User>> {
        self.db.update_user(id, request).await
    }

    // Topic operations

    /// Generate a subtopic list for the requested title and persist topic
    /// plus subtopics together. The transaction lives in the database layer;
    /// generation happens first so a failed LLM call writes nothing.
    pub async fn create_topic(
        &self,
        request: CreateTopicRequest,
    ) -> Result<TopicWithSubtopics, StudyServiceError> {
        let generated = self.generator.generate_subtopics(&request.title).await?;
        let titles: Vec<String> = generated.into_iter().map(|s| s.title).collect();

        let (topic, subtopics) = self
            .db
            .create_topic_with_subtopics(&request, &titles)
            .await?;

        info!(
            topic_id = topic.id,
            subtopic_count = subtopics.len(),
            "Topic created with generated subtopics"
        );

        Ok(TopicWithSubtopics { topic, subtopics })
    }

    pub async fn get_topic_with_subtopics(&self, id: i64) -> Result<Option<TopicWithSubtopics>> {
        let Some(topic) = self.db.get_topic(id).await? else {
            return Ok(None);
        };
        let subtopics = self.db.get_subtopics_by_topic(id).await?;
        Ok(Some(TopicWithSubtopics { topic, subtopics }))
    }

    pub async fn get_topics_by_user(&self, user_id: &str) -> Result<Vec<Topic>> {
        self.db.get_topics_by_user(user_id).await
    }

    pub async fn get_subtopic(&self, id: i64) -> Result<Option<Subtopic>> {
        self.db.get_subtopic(id).await
    }

    // Content operations

    /// Lazy content lookup: return the stored row when present, otherwise
    /// generate, persist once, and return. Re-reads after a conflicting
    /// insert so concurrent first requests all see the same stored row.
    pub async fn get_or_generate_content(
        &self,
        subtopic_id: i64,
    ) -> Result<SubtopicContentResponse, StudyServiceError> {
        let Some(subtopic) = self.db.get_subtopic(subtopic_id).await? else {
            return Err(StudyServiceError::SubtopicNotFound);
        };

        if let Some(content) = self.db.get_content_by_subtopic(subtopic_id).await? {
            debug!(subtopic_id, "Serving stored subtopic content");
            return Ok(content.into());
        }

        let Some(topic) = self.db.get_topic(subtopic.topic_id).await? else {
            return Err(StudyServiceError::TopicNotFound);
        };

        let generated = self
            .generator
            .generate_content(&topic.title, &subtopic.title)
            .await?;

        let quiz_json = serde_json::to_string(&generated.quiz_questions)
            .map_err(|e| StudyServiceError::Database(e.into()))?;

        let content = self
            .db
            .insert_content_if_absent(
                subtopic_id,
                &generated.explanation,
                &generated.examples,
                &quiz_json,
            )
            .await?;

        info!(
            subtopic_id,
            content_id = content.id,
            question_count = generated.quiz_questions.len(),
            "Generated and stored subtopic content"
        );

        Ok(content.into())
    }

    // Progress operations

    pub async fn upsert_progress(&self, request: UpsertProgressRequest) -> Result<UserProgress> {
        self.db.upsert_progress(&request).await
    }

    pub async fn get_progress_by_user(&self, user_id: &str) -> Result<Vec<UserProgress>> {
        self.db.get_progress_by_user(user_id).await
    }

    // Quiz attempt operations

    pub async fn record_quiz_attempt(
        &self,
        request: CreateQuizAttemptRequest,
    ) -> Result<QuizAttempt> {
        self.db.create_quiz_attempt(&request).await
    }

    pub async fn get_quiz_attempts(&self, user_id: &str) -> Result<Vec<QuizAttempt>> {
        self.db.get_quiz_attempts_by_user(user_id).await
    }

    /// Aggregate accuracy over the attempt log: round(correct / total * 100).
    pub async fn quiz_accuracy(&self, user_id: &str) -> Result<QuizAccuracy> {
        let attempts = self.db.get_quiz_attempts_by_user(user_id).await?;
        let total = attempts.len() as i64;
        let correct = attempts.iter().filter(|a| a.is_correct).count() as i64;
        let accuracy = if total > 0 {
            ((correct as f64 / total as f64) * 100.0).round() as i64
        } else {
            0
        };

        Ok(QuizAccuracy {
            total,
            correct,
            accuracy,
        })
    }
}
