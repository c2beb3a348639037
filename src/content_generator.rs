use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::llm_providers::{JsonResponseParser, LlmProvider, LlmProviderFactory, LlmProviderType};
use crate::models::QuizQuestion;

/// Upper bound on subtopics per topic. Over-generation is truncated, never
/// rejected.
pub const MAX_SUBTOPICS: usize = 6;

/// Upper bound on quiz questions per subtopic.
pub const MAX_QUIZ_QUESTIONS: usize = 5;

/// Generation failures split into the two cases that matter for diagnosis:
/// the upstream call itself failed, or it answered with something that does
/// not match the requested shape. API callers see both as the same generic
/// "content unavailable" error.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("LLM request failed: {0}")]
    RequestFailed(#[source] anyhow::Error),

    #[error("Invalid response format: {0}")]
    InvalidFormat(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedSubtopic {
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub explanation: String,
    pub examples: String,
    pub quiz_questions: Vec<QuizQuestion>,
}

#[derive(Debug, Deserialize)]
struct SubtopicListReply {
    subtopics: Vec<GeneratedSubtopic>,
}

/// The model is asked for a string of examples but sometimes answers with an
/// array of strings; both are accepted, anything else is a format error.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExamplesField {
    Text(String),
    List(Vec<String>),
}

impl ExamplesField {
    fn into_numbered_text(self) -> String {
        match self {
            ExamplesField::Text(text) => text,
            ExamplesField::List(items) => items
                .iter()
                .enumerate()
                .map(|(idx, item)| format!("{}. {}", idx + 1, item))
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LessonContentReply {
    explanation: String,
    examples: ExamplesField,
    #[serde(rename = "quizQuestions")]
    quiz_questions: Vec<QuizQuestion>,
}

/// Generates subtopic lists and lesson content by prompting an LLM provider
/// for strict-JSON replies and validating them into fixed shapes.
#[derive(Clone)]
pub struct ContentGenerator {
    provider: LlmProvider,
}

impl ContentGenerator {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self::new_with_provider(api_key, base_url, LlmProviderType::OpenAI, None)
    }

    pub fn new_with_provider(
        api_key: String,
        base_url: Option<String>,
        provider_type: LlmProviderType,
        model: Option<String>,
    ) -> Self {
        let provider = LlmProviderFactory::create_provider(provider_type, api_key, base_url, model);

        Self { provider }
    }

    #[allow(dead_code)]
    pub fn new_gemini(api_key: String, model: Option<String>) -> Self {
        Self::new_with_provider(
            api_key,
            None,
            LlmProviderType::Gemini,
            model.or_else(|| Some("gemini-2.0-flash-exp".to_string())),
        )
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Generate an ordered list of 1..=6 subtopics for a topic title.
    pub async fn generate_subtopics(
        &self,
        topic_title: &str,
    ) -> Result<Vec<GeneratedSubtopic>, GenerationError> {
        info!(
            topic_title = %topic_title,
            provider = self.provider_name(),
            "Generating subtopics for topic"
        );

        let prompt = format!(
            r#"You are an expert educator. Generate exactly {} key subtopics for learning about "{}".

Return a JSON object with a "subtopics" array like this:
{{
  "subtopics": [
    {{"title": "Subtopic 1 name"}},
    {{"title": "Subtopic 2 name"}}
  ]
}}

Make the subtopics comprehensive and logically ordered for a complete learning path."#,
            MAX_SUBTOPICS, topic_title
        );

        let system_message =
            "You are an expert educator. Always respond with valid JSON in the requested format.";
        let response_text = self
            .provider
            .make_json_request(Some(system_message), &prompt)
            .await
            .map_err(GenerationError::RequestFailed)?;

        debug!(
            topic_title = %topic_title,
            response_content = %response_text,
            "Raw LLM response for subtopic generation"
        );

        match Self::parse_subtopics_reply(&response_text) {
            Ok(subtopics) => {
                info!(
                    topic_title = %topic_title,
                    subtopic_count = subtopics.len(),
                    "Successfully generated subtopics"
                );
                Ok(subtopics)
            }
            Err(e) => {
                error!(
                    topic_title = %topic_title,
                    error = %e,
                    response_content = %response_text,
                    "Failed to parse subtopic generation response"
                );
                Err(e)
            }
        }
    }

    /// Generate lesson content (explanation, examples, quiz) for one subtopic.
    pub async fn generate_content(
        &self,
        topic_title: &str,
        subtopic_title: &str,
    ) -> Result<GeneratedContent, GenerationError> {
        info!(
            topic_title = %topic_title,
            subtopic_title = %subtopic_title,
            provider = self.provider_name(),
            "Generating lesson content for subtopic"
        );

        let prompt = format!(
            r#"You are an expert educator teaching about "{topic}", specifically the subtopic "{subtopic}".

Generate educational content in the following JSON format:
{{
  "explanation": "A clear, comprehensive explanation of {subtopic} (3-4 paragraphs)",
  "examples": "3 practical, real-world examples demonstrating {subtopic}. Format as a numbered list.",
  "quizQuestions": [
    {{
      "question": "Question text here?",
      "options": ["Option A", "Option B", "Option C", "Option D"],
      "correctAnswer": 0
    }}
  ]
}}

Generate exactly {quiz_count} multiple-choice quiz questions with 4 options each. The correctAnswer is the index (0-3) of the correct option.
Make questions test understanding, not just memorization."#,
            topic = topic_title,
            subtopic = subtopic_title,
            quiz_count = MAX_QUIZ_QUESTIONS
        );

        let system_message =
            "You are an expert educator. Always respond with valid JSON in the requested format.";
        let response_text = self
            .provider
            .make_json_request(Some(system_message), &prompt)
            .await
            .map_err(GenerationError::RequestFailed)?;

        debug!(
            subtopic_title = %subtopic_title,
            response_content = %response_text,
            "Raw LLM response for content generation"
        );

        match Self::parse_content_reply(&response_text) {
            Ok(content) => {
                info!(
                    subtopic_title = %subtopic_title,
                    explanation_length = content.explanation.len(),
                    question_count = content.quiz_questions.len(),
                    "Successfully generated lesson content"
                );
                Ok(content)
            }
            Err(e) => {
                error!(
                    subtopic_title = %subtopic_title,
                    error = %e,
                    response_content = %response_text,
                    "Failed to parse lesson content response"
                );
                Err(e)
            }
        }
    }

    /// Validate a raw subtopic-list reply. Pure so it can be tested against
    /// canned reply text without network access.
    pub fn parse_subtopics_reply(raw: &str) -> Result<Vec<GeneratedSubtopic>, GenerationError> {
        let reply: SubtopicListReply = JsonResponseParser
            .parse_json_response(raw)
            .map_err(|e| GenerationError::InvalidFormat(e.to_string()))?;

        if reply.subtopics.is_empty() {
            return Err(GenerationError::InvalidFormat(
                "subtopics array is empty".to_string(),
            ));
        }

        let mut subtopics = reply.subtopics;
        subtopics.truncate(MAX_SUBTOPICS);
        Ok(subtopics)
    }

    /// Validate a raw lesson-content reply, normalizing the examples field.
    pub fn parse_content_reply(raw: &str) -> Result<GeneratedContent, GenerationError> {
        let reply: LessonContentReply = JsonResponseParser
            .parse_json_response(raw)
            .map_err(|e| GenerationError::InvalidFormat(e.to_string()))?;

        if reply.explanation.trim().is_empty() {
            return Err(GenerationError::InvalidFormat(
                "explanation is empty".to_string(),
            ));
        }

        if reply.quiz_questions.is_empty() {
            return Err(GenerationError::InvalidFormat(
                "quizQuestions array is empty".to_string(),
            ));
        }

        let mut quiz_questions = reply.quiz_questions;
        quiz_questions.truncate(MAX_QUIZ_QUESTIONS);

        Ok(GeneratedContent {
            explanation: reply.explanation,
            examples: reply.examples.into_numbered_text(),
            quiz_questions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subtopics_truncates_over_generation() {
        let raw = r#"{"subtopics": [
            {"title": "One"}, {"title": "Two"}, {"title": "Three"},
            {"title": "Four"}, {"title": "Five"}, {"title": "Six"},
            {"title": "Seven"}, {"title": "Eight"}
        ]}"#;

        let subtopics = ContentGenerator::parse_subtopics_reply(raw).unwrap();
        assert_eq!(subtopics.len(), MAX_SUBTOPICS);
        assert_eq!(subtopics[0].title, "One");
        assert_eq!(subtopics[5].title, "Six");
    }

    #[test]
    fn test_parse_subtopics_rejects_empty_array() {
        let raw = r#"{"subtopics": []}"#;
        let result = ContentGenerator::parse_subtopics_reply(raw);
        assert!(matches!(result, Err(GenerationError::InvalidFormat(_))));
    }

    #[test]
    fn test_parse_subtopics_rejects_missing_field() {
        let raw = r#"{"topics": [{"title": "wrong key"}]}"#;
        let result = ContentGenerator::parse_subtopics_reply(raw);
        assert!(matches!(result, Err(GenerationError::InvalidFormat(_))));
    }

    #[test]
    fn test_parse_content_joins_example_list() {
        let raw = r#"{
            "explanation": "Derivatives measure rates of change.",
            "examples": ["Velocity from position", "Marginal cost", "Slope of a curve"],
            "quizQuestions": [
                {"question": "Q1?", "options": ["a", "b", "c", "d"], "correctAnswer": 2}
            ]
        }"#;

        let content = ContentGenerator::parse_content_reply(raw).unwrap();
        assert_eq!(
            content.examples,
            "1. Velocity from position\n\n2. Marginal cost\n\n3. Slope of a curve"
        );
        assert_eq!(content.quiz_questions.len(), 1);
        assert_eq!(content.quiz_questions[0].correct_answer, 2);
    }

    #[test]
    fn test_parse_content_passes_string_examples_through() {
        let raw = r#"{
            "explanation": "Some explanation.",
            "examples": "1. Already formatted",
            "quizQuestions": [
                {"question": "Q1?", "options": ["a", "b", "c", "d"], "correctAnswer": 0}
            ]
        }"#;

        let content = ContentGenerator::parse_content_reply(raw).unwrap();
        assert_eq!(content.examples, "1. Already formatted");
    }

    #[test]
    fn test_parse_content_rejects_non_string_non_array_examples() {
        let raw = r#"{
            "explanation": "Some explanation.",
            "examples": {"first": "wrong shape"},
            "quizQuestions": [
                {"question": "Q1?", "options": ["a", "b", "c", "d"], "correctAnswer": 0}
            ]
        }"#;

        let result = ContentGenerator::parse_content_reply(raw);
        assert!(matches!(result, Err(GenerationError::InvalidFormat(_))));
    }

    #[test]
    fn test_parse_content_rejects_empty_explanation() {
        let raw = r#"{
            "explanation": "   ",
            "examples": "1. x",
            "quizQuestions": [
                {"question": "Q1?", "options": ["a", "b", "c", "d"], "correctAnswer": 0}
            ]
        }"#;

        let result = ContentGenerator::parse_content_reply(raw);
        assert!(matches!(result, Err(GenerationError::InvalidFormat(_))));
    }

    #[test]
    fn test_parse_content_truncates_extra_questions() {
        let question = r#"{"question": "Q?", "options": ["a", "b", "c", "d"], "correctAnswer": 1}"#;
        let questions = vec![question; 8].join(",");
        let raw = format!(
            r#"{{"explanation": "text", "examples": "1. x", "quizQuestions": [{}]}}"#,
            questions
        );

        let content = ContentGenerator::parse_content_reply(&raw).unwrap();
        assert_eq!(content.quiz_questions.len(), MAX_QUIZ_QUESTIONS);
    }

    #[test]
    fn test_parse_content_rejects_empty_quiz() {
        let raw = r#"{"explanation": "text", "examples": "1. x", "quizQuestions": []}"#;
        let result = ContentGenerator::parse_content_reply(raw);
        assert!(matches!(result, Err(GenerationError::InvalidFormat(_))));
    }
}
