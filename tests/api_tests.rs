use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use study_buddy::{api::*, ContentGenerator, Database, StudyService};

async fn create_test_server() -> TestServer {
    let db = Database::new("sqlite::memory:").await.unwrap();
    let generator = ContentGenerator::new("test_key".to_string(), None);
    let study_service = StudyService::new(db, generator);
    let app_state = AppState { study_service };

    let app = create_router(app_state);
    TestServer::new(app).unwrap()
}

async fn create_test_user(server: &TestServer, username: &str) -> String {
    let response = server
        .post("/api/users")
        .json(&json!({
            "username": username,
            "password": "secret"
        }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_api_create_user() {
    let server = create_test_server().await;

    let response = server
        .post("/api/users")
        .json(&json!({
            "username": "alice",
            "password": "secret",
            "name": "Alice",
            "email": "alice@example.com"
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["name"], "Alice");
    assert!(body["data"]["id"].is_string());
    // Passwords never appear in API responses
    assert!(body["data"].get("password").is_none());
}

#[tokio::test]
async fn test_api_create_user_empty_username() {
    let server = create_test_server().await;

    let response = server
        .post("/api/users")
        .json(&json!({
            "username": "   ",
            "password": "secret"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_api_duplicate_username_conflict() {
    let server = create_test_server().await;
    create_test_user(&server, "bob").await;

    let response = server
        .post("/api/users")
        .json(&json!({
            "username": "bob",
            "password": "other"
        }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_api_get_and_update_user() {
    let server = create_test_server().await;
    let user_id = create_test_user(&server, "carol").await;

    let get_response = server.get(&format!("/api/users/{}", user_id)).await;
    get_response.assert_status_ok();
    let body: Value = get_response.json();
    assert_eq!(body["data"]["username"], "carol");

    let patch_response = server
        .patch(&format!("/api/users/{}", user_id))
        .json(&json!({
            "name": "Carol",
            "phone": "555-0100"
        }))
        .await;
    patch_response.assert_status_ok();
    let patched: Value = patch_response.json();
    assert_eq!(patched["data"]["name"], "Carol");
    assert_eq!(patched["data"]["phone"], "555-0100");
    assert!(patched["data"].get("password").is_none());
}

#[tokio::test]
async fn test_api_get_nonexistent_user() {
    let server = create_test_server().await;

    let response = server.get("/api/users/no-such-id").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn test_api_create_topic_requires_title() {
    let server = create_test_server().await;

    let response = server
        .post("/api/topics")
        .json(&json!({
            "title": "  ",
            "user_id": "some-user"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_api_create_topic_requires_user_id() {
    let server = create_test_server().await;

    let response = server
        .post("/api/topics")
        .json(&json!({
            "title": "Rust Programming",
            "user_id": ""
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_api_list_topics_requires_user_id() {
    let server = create_test_server().await;

    let response = server.get("/api/topics").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "user_id is required");
}

#[tokio::test]
async fn test_api_list_topics_empty() {
    let server = create_test_server().await;
    let user_id = create_test_user(&server, "dave").await;

    let response = server
        .get(&format!("/api/topics?user_id={}", user_id))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_api_get_nonexistent_topic() {
    let server = create_test_server().await;

    let response = server.get("/api/topics/999").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "Topic not found");
}

#[tokio::test]
async fn test_api_get_nonexistent_subtopic() {
    let server = create_test_server().await;

    let response = server.get("/api/subtopics/999").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_content_for_nonexistent_subtopic() {
    let server = create_test_server().await;

    let response = server.get("/api/subtopics/999/content").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "Subtopic not found");
}

#[tokio::test]
async fn test_api_progress_upsert_and_list() {
    let server = create_test_server().await;
    let user_id = create_test_user(&server, "erin").await;

    let first = server
        .post("/api/progress")
        .json(&json!({
            "user_id": user_id,
            "subtopic_id": 7,
            "completed": false
        }))
        .await;
    first.assert_status_ok();
    let first_body: Value = first.json();
    let progress_id = first_body["data"]["id"].as_i64().unwrap();
    assert_eq!(first_body["data"]["completed"], false);

    // Same (user, subtopic) pair updates in place
    let second = server
        .post("/api/progress")
        .json(&json!({
            "user_id": user_id,
            "subtopic_id": 7,
            "completed": true,
            "score": 90
        }))
        .await;
    second.assert_status_ok();
    let second_body: Value = second.json();
    assert_eq!(second_body["data"]["id"].as_i64().unwrap(), progress_id);
    assert_eq!(second_body["data"]["completed"], true);
    assert_eq!(second_body["data"]["score"], 90);

    let list = server
        .get(&format!("/api/progress?user_id={}", user_id))
        .await;
    list.assert_status_ok();
    let list_body: Value = list.json();
    assert_eq!(list_body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_api_progress_requires_user_id() {
    let server = create_test_server().await;

    let response = server.get("/api/progress").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_api_quiz_attempts_and_stats() {
    let server = create_test_server().await;
    let user_id = create_test_user(&server, "frank").await;

    for (selected, correct) in [(2, 2), (1, 3)] {
        let response = server
            .post("/api/quiz-attempts")
            .json(&json!({
                "user_id": user_id,
                "subtopic_id": 1,
                "topic_id": 1,
                "question_index": 0,
                "selected_answer": selected,
                "correct_answer": correct,
                "is_correct": selected == correct
            }))
            .await;
        response.assert_status_ok();
    }

    let attempts = server
        .get(&format!("/api/quiz-attempts/{}", user_id))
        .await;
    attempts.assert_status_ok();
    let attempts_body: Value = attempts.json();
    assert_eq!(attempts_body["data"].as_array().unwrap().len(), 2);
    assert_eq!(attempts_body["data"][0]["is_correct"], true);
    assert_eq!(attempts_body["data"][1]["is_correct"], false);

    let stats = server
        .get(&format!("/api/quiz-attempts/{}/stats", user_id))
        .await;
    stats.assert_status_ok();
    let stats_body: Value = stats.json();
    assert_eq!(stats_body["data"]["total"], 2);
    assert_eq!(stats_body["data"]["correct"], 1);
    assert_eq!(stats_body["data"]["accuracy"], 50);
}

#[tokio::test]
async fn test_api_quiz_stats_for_unknown_user() {
    let server = create_test_server().await;

    let response = server.get("/api/quiz-attempts/nobody/stats").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["total"], 0);
    assert_eq!(body["data"]["accuracy"], 0);
}
