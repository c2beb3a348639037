use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// User as returned by the API. The password column never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            name: user.name,
            email: user.email,
            phone: user.phone,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Topic {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subtopic {
    pub id: i64,
    pub topic_id: i64,
    pub title: String,
    pub order_index: i64,
}

/// Stored lesson content. `quiz_questions` holds the serialized question
/// list exactly as generated; it is deserialized on the way out.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SubtopicContent {
    pub id: i64,
    pub subtopic_id: i64,
    pub explanation: String,
    pub examples: String,
    pub quiz_questions: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserProgress {
    pub id: i64,
    pub user_id: String,
    pub subtopic_id: i64,
    pub completed: bool,
    pub score: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuizAttempt {
    pub id: i64,
    pub user_id: String,
    pub subtopic_id: i64,
    pub topic_id: i64,
    pub question_index: i64,
    pub selected_answer: i64,
    pub correct_answer: i64,
    pub is_correct: bool,
    pub attempted_at: DateTime<Utc>,
}

/// A single four-option multiple-choice question. `correct_answer` is the
/// zero-based index into `options`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    #[serde(rename = "correctAnswer")]
    pub correct_answer: i64,
}

// Request types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTopicRequest {
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertProgressRequest {
    pub user_id: String,
    pub subtopic_id: i64,
    pub completed: bool,
    pub score: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateQuizAttemptRequest {
    pub user_id: String,
    pub subtopic_id: i64,
    pub topic_id: i64,
    pub question_index: i64,
    pub selected_answer: i64,
    pub correct_answer: i64,
    pub is_correct: bool,
}

// Response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicWithSubtopics {
    pub topic: Topic,
    pub subtopics: Vec<Subtopic>,
}

/// Content as served to clients, with the quiz deserialized. A stored quiz
/// blob that no longer parses degrades to an empty list rather than failing
/// the read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtopicContentResponse {
    pub id: i64,
    pub subtopic_id: i64,
    pub explanation: String,
    pub examples: String,
    pub quiz_questions: Vec<QuizQuestion>,
}

impl From<SubtopicContent> for SubtopicContentResponse {
    fn from(content: SubtopicContent) -> Self {
        let quiz_questions =
            match serde_json::from_str::<Vec<QuizQuestion>>(&content.quiz_questions) {
                Ok(questions) => questions,
                Err(e) => {
                    tracing::warn!(
                        content_id = content.id,
                        subtopic_id = content.subtopic_id,
                        error = %e,
                        "Stored quiz questions failed to deserialize, serving empty quiz"
                    );
                    Vec::new()
                }
            };

        Self {
            id: content.id,
            subtopic_id: content.subtopic_id,
            explanation: content.explanation,
            examples: content.examples,
            quiz_questions,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizAccuracy {
    pub total: i64,
    pub correct: i64,
    pub accuracy: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_quiz_degrades_to_empty_list() {
        let content = SubtopicContent {
            id: 1,
            subtopic_id: 42,
            explanation: "text".to_string(),
            examples: "1. example".to_string(),
            quiz_questions: "{not valid json".to_string(),
        };

        let response = SubtopicContentResponse::from(content);
        assert!(response.quiz_questions.is_empty());
        assert_eq!(response.explanation, "text");
    }

    #[test]
    fn test_quiz_round_trips_through_storage_format() {
        let questions = vec![QuizQuestion {
            question: "What is 2 + 2?".to_string(),
            options: vec!["3".into(), "4".into(), "5".into(), "6".into()],
            correct_answer: 1,
        }];
        let serialized = serde_json::to_string(&questions).unwrap();

        let content = SubtopicContent {
            id: 1,
            subtopic_id: 42,
            explanation: "arithmetic".to_string(),
            examples: "1. 2 + 2 = 4".to_string(),
            quiz_questions: serialized,
        };

        let response = SubtopicContentResponse::from(content);
        assert_eq!(response.quiz_questions.len(), 1);
        assert_eq!(response.quiz_questions[0].correct_answer, 1);
    }

    #[test]
    fn test_user_profile_drops_password() {
        let user = User {
            id: "u1".to_string(),
            username: "alice".to_string(),
            password: "secret".to_string(),
            name: None,
            email: None,
            phone: None,
        };

        let profile = UserProfile::from(user);
        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["username"], "alice");
    }
}
