use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, patch, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    errors::{classify_database_error, ApiError, ErrorContext},
    models::*,
    study_service::{StudyService, StudyServiceError},
};

// Import logging macros
use crate::{log_api_start, log_api_success, log_api_warn};

#[derive(Clone)]
pub struct AppState {
    pub study_service: StudyService,
}

#[derive(Deserialize)]
pub struct UserIdParams {
    pub user_id: Option<String>,
}

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, (StatusCode, Json<ApiResponse<()>>)>;

fn service_error_response(
    error: StudyServiceError,
    operation: &str,
    resource_id: &str,
) -> (StatusCode, Json<ApiResponse<()>>) {
    match error {
        StudyServiceError::SubtopicNotFound => ApiError::NotFound("Subtopic not found".to_string())
            .to_response_with_context(
                ErrorContext::new(operation, "Subtopic")
                    .with_id(resource_id)
                    .with_user_message("Subtopic not found"),
            ),
        StudyServiceError::TopicNotFound => ApiError::NotFound("Topic not found".to_string())
            .to_response_with_context(
                ErrorContext::new(operation, "Topic")
                    .with_id(resource_id)
                    .with_user_message("Topic not found"),
            ),
        StudyServiceError::Generation(e) => ApiError::GenerationError(e.to_string())
            .to_response_with_context(ErrorContext::new(operation, "content").with_id(resource_id)),
        StudyServiceError::Database(e) => classify_database_error(&e)
            .to_response_with_context(ErrorContext::new(operation, "content").with_id(resource_id)),
    }
}

// Topic endpoints

pub async fn create_topic(
    State(state): State<AppState>,
    Json(request): Json<CreateTopicRequest>,
) -> ApiResult<TopicWithSubtopics> {
    info!(
        user_id = %request.user_id,
        title = %request.title,
        "Creating topic with generated subtopics"
    );

    if request.title.trim().is_empty() {
        let error = ApiError::ValidationError("title must not be empty".to_string());
        return Err(error.to_response_with_context(ErrorContext::new("create_topic", "topic")));
    }
    if request.user_id.trim().is_empty() {
        let error = ApiError::ValidationError("user_id is required".to_string());
        return Err(error.to_response_with_context(ErrorContext::new("create_topic", "topic")));
    }

    match state.study_service.create_topic(request).await {
        Ok(result) => {
            info!(
                topic_id = result.topic.id,
                subtopic_count = result.subtopics.len(),
                "Topic created successfully"
            );
            Ok(Json(ApiResponse::success(result)))
        }
        Err(e) => Err(service_error_response(e, "create_topic", "new")),
    }
}

pub async fn get_topic(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<TopicWithSubtopics> {
    log_api_start!("get_topic", topic_id = id);

    match state.study_service.get_topic_with_subtopics(id).await {
        Ok(Some(result)) => {
            log_api_success!("get_topic", topic_id = id, "topic retrieved successfully");
            Ok(Json(ApiResponse::success(result)))
        }
        Ok(None) => {
            log_api_warn!("get_topic", topic_id = id, "topic not found");
            let error = ApiError::NotFound(format!("Topic with id '{}' not found", id));
            let context = ErrorContext::new("get_topic", "Topic")
                .with_id(&id.to_string())
                .with_user_message("Topic not found");
            Err(error.to_response_with_context(context))
        }
        Err(e) => {
            let error = ApiError::DatabaseError(e);
            let context = ErrorContext::new("get_topic", "topic").with_id(&id.to_string());
            Err(error.to_response_with_context(context))
        }
    }
}

pub async fn list_topics(
    State(state): State<AppState>,
    Query(params): Query<UserIdParams>,
) -> ApiResult<Vec<Topic>> {
    let Some(user_id) = params.user_id else {
        let error = ApiError::ValidationError("user_id is required".to_string());
        return Err(error.to_response_with_context(ErrorContext::new("list_topics", "topic")));
    };

    match state.study_service.get_topics_by_user(&user_id).await {
        Ok(topics) => {
            debug!(user_id = %user_id, topic_count = topics.len(), "Topics retrieved");
            Ok(Json(ApiResponse::success(topics)))
        }
        Err(e) => {
            let error = ApiError::DatabaseError(e);
            let context = ErrorContext::new("list_topics", "topic").with_id(&user_id);
            Err(error.to_response_with_context(context))
        }
    }
}

// Subtopic endpoints

pub async fn get_subtopic(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Subtopic> {
    debug!(subtopic_id = id, "Getting subtopic");

    match state.study_service.get_subtopic(id).await {
        Ok(Some(subtopic)) => Ok(Json(ApiResponse::success(subtopic))),
        Ok(None) => {
            let error = ApiError::NotFound(format!("Subtopic with id '{}' not found", id));
            let context = ErrorContext::new("get_subtopic", "Subtopic")
                .with_id(&id.to_string())
                .with_user_message("Subtopic not found");
            Err(error.to_response_with_context(context))
        }
        Err(e) => {
            let error = ApiError::DatabaseError(e);
            let context = ErrorContext::new("get_subtopic", "subtopic").with_id(&id.to_string());
            Err(error.to_response_with_context(context))
        }
    }
}

/// Lazy content endpoint: the first request for a subtopic triggers
/// generation and persistence, later requests serve the stored row.
pub async fn get_subtopic_content(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<SubtopicContentResponse> {
    log_api_start!("get_subtopic_content", subtopic_id = id);

    match state.study_service.get_or_generate_content(id).await {
        Ok(content) => {
            log_api_success!(
                "get_subtopic_content",
                subtopic_id = id,
                "content retrieved successfully"
            );
            Ok(Json(ApiResponse::success(content)))
        }
        Err(e) => Err(service_error_response(
            e,
            "get_subtopic_content",
            &id.to_string(),
        )),
    }
}

// Progress endpoints

pub async fn upsert_progress(
    State(state): State<AppState>,
    Json(request): Json<UpsertProgressRequest>,
) -> ApiResult<UserProgress> {
    debug!(
        user_id = %request.user_id,
        subtopic_id = request.subtopic_id,
        completed = request.completed,
        "Upserting progress"
    );

    match state.study_service.upsert_progress(request).await {
        Ok(progress) => Ok(Json(ApiResponse::success(progress))),
        Err(e) => {
            let error = ApiError::DatabaseError(e);
            let context = ErrorContext::new("upsert_progress", "progress");
            Err(error.to_response_with_context(context))
        }
    }
}

pub async fn get_progress(
    State(state): State<AppState>,
    Query(params): Query<UserIdParams>,
) -> ApiResult<Vec<UserProgress>> {
    let Some(user_id) = params.user_id else {
        let error = ApiError::ValidationError("user_id is required".to_string());
        return Err(error.to_response_with_context(ErrorContext::new("get_progress", "progress")));
    };

    match state.study_service.get_progress_by_user(&user_id).await {
        Ok(progress) => Ok(Json(ApiResponse::success(progress))),
        Err(e) => {
            let error = ApiError::DatabaseError(e);
            let context = ErrorContext::new("get_progress", "progress").with_id(&user_id);
            Err(error.to_response_with_context(context))
        }
    }
}

// Quiz attempt endpoints

pub async fn create_quiz_attempt(
    State(state): State<AppState>,
    Json(request): Json<CreateQuizAttemptRequest>,
) -> ApiResult<QuizAttempt> {
    debug!(
        user_id = %request.user_id,
        subtopic_id = request.subtopic_id,
        question_index = request.question_index,
        is_correct = request.is_correct,
        "Recording quiz attempt"
    );

    match state.study_service.record_quiz_attempt(request).await {
        Ok(attempt) => Ok(Json(ApiResponse::success(attempt))),
        Err(e) => {
            let error = ApiError::DatabaseError(e);
            let context = ErrorContext::new("create_quiz_attempt", "quiz attempt");
            Err(error.to_response_with_context(context))
        }
    }
}

pub async fn get_quiz_attempts(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<QuizAttempt>> {
    match state.study_service.get_quiz_attempts(&user_id).await {
        Ok(attempts) => {
            debug!(user_id = %user_id, attempt_count = attempts.len(), "Quiz attempts retrieved");
            Ok(Json(ApiResponse::success(attempts)))
        }
        Err(e) => {
            let error = ApiError::DatabaseError(e);
            let context = ErrorContext::new("get_quiz_attempts", "quiz attempt").with_id(&user_id);
            Err(error.to_response_with_context(context))
        }
    }
}

pub async fn get_quiz_stats(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<QuizAccuracy> {
    match state.study_service.quiz_accuracy(&user_id).await {
        Ok(stats) => Ok(Json(ApiResponse::success(stats))),
        Err(e) => {
            let error = ApiError::DatabaseError(e);
            let context = ErrorContext::new("get_quiz_stats", "quiz attempt").with_id(&user_id);
            Err(error.to_response_with_context(context))
        }
    }
}

// User endpoints

pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> ApiResult<UserProfile> {
    info!(username = %request.username, "Creating user");

    if request.username.trim().is_empty() {
        let error = ApiError::ValidationError("username must not be empty".to_string());
        return Err(error.to_response_with_context(ErrorContext::new("create_user", "user")));
    }

    match state.study_service.create_user(request).await {
        Ok(user) => {
            info!(user_id = %user.id, "User created successfully");
            Ok(Json(ApiResponse::success(user.into())))
        }
        Err(e) => {
            let classified_error = classify_database_error(&e);
            let context = ErrorContext::new("create_user", "user");
            Err(classified_error.to_response_with_context(context))
        }
    }
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<UserProfile> {
    log_api_start!("get_user", user_id = id);

    match state.study_service.get_user(&id).await {
        Ok(Some(user)) => Ok(Json(ApiResponse::success(user.into()))),
        Ok(None) => {
            log_api_warn!("get_user", user_id = id, "user not found");
            let error = ApiError::NotFound(format!("User with id '{}' not found", id));
            let context = ErrorContext::new("get_user", "User")
                .with_id(&id)
                .with_user_message("User not found");
            Err(error.to_response_with_context(context))
        }
        Err(e) => {
            let error = ApiError::DatabaseError(e);
            let context = ErrorContext::new("get_user", "user").with_id(&id);
            Err(error.to_response_with_context(context))
        }
    }
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> ApiResult<UserProfile> {
    info!(user_id = %id, "Updating user profile");

    match state.study_service.update_user(&id, request).await {
        Ok(Some(user)) => {
            info!(user_id = %id, "User updated successfully");
            Ok(Json(ApiResponse::success(user.into())))
        }
        Ok(None) => {
            let error = ApiError::NotFound(format!("User with id '{}' not found", id));
            let context = ErrorContext::new("update_user", "User")
                .with_id(&id)
                .with_user_message("User not found");
            Err(error.to_response_with_context(context))
        }
        Err(e) => {
            let error = ApiError::DatabaseError(e);
            let context = ErrorContext::new("update_user", "user").with_id(&id);
            Err(error.to_response_with_context(context))
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Topic routes
        .route("/api/topics", post(create_topic))
        .route("/api/topics", get(list_topics))
        .route("/api/topics/:id", get(get_topic))
        // Subtopic routes
        .route("/api/subtopics/:id", get(get_subtopic))
        .route("/api/subtopics/:id/content", get(get_subtopic_content))
        // Progress routes
        .route("/api/progress", post(upsert_progress))
        .route("/api/progress", get(get_progress))
        // Quiz attempt routes
        .route("/api/quiz-attempts", post(create_quiz_attempt))
        .route("/api/quiz-attempts/:user_id", get(get_quiz_attempts))
        .route("/api/quiz-attempts/:user_id/stats", get(get_quiz_stats))
        // User routes
        .route("/api/users", post(create_user))
        .route("/api/users/:id", get(get_user))
        .route("/api/users/:id", patch(update_user))
        .with_state(state)
}
