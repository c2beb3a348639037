use study_buddy::models::{CreateTopicRequest, CreateUserRequest, SubtopicContentResponse};
use study_buddy::Database;

async fn create_test_db() -> Database {
    Database::new("sqlite::memory:").await.unwrap()
}

async fn create_topic_with_subtopics(db: &Database) -> (i64, Vec<i64>) {
    let user = db
        .create_user(CreateUserRequest {
            username: "learner".to_string(),
            password: "pw".to_string(),
            name: None,
            email: None,
            phone: None,
        })
        .await
        .unwrap();

    let request = CreateTopicRequest {
        user_id: user.id,
        title: "Rust Programming".to_string(),
        description: None,
    };
    let titles = vec![
        "Ownership".to_string(),
        "Borrowing".to_string(),
        "Lifetimes".to_string(),
    ];
    let (topic, subtopics) = db
        .create_topic_with_subtopics(&request, &titles)
        .await
        .unwrap();

    (topic.id, subtopics.into_iter().map(|s| s.id).collect())
}

#[tokio::test]
async fn test_topic_and_subtopics_persist_together() {
    let db = create_test_db().await;
    let (topic_id, subtopic_ids) = create_topic_with_subtopics(&db).await;

    let topic = db.get_topic(topic_id).await.unwrap().unwrap();
    assert_eq!(topic.title, "Rust Programming");

    let subtopics = db.get_subtopics_by_topic(topic_id).await.unwrap();
    assert_eq!(subtopics.len(), 3);
    assert_eq!(subtopics[0].title, "Ownership");
    assert_eq!(subtopics[0].order_index, 0);
    assert_eq!(subtopics[2].title, "Lifetimes");
    assert_eq!(subtopics[2].order_index, 2);
    assert_eq!(subtopics[1].id, subtopic_ids[1]);
}

#[tokio::test]
async fn test_insert_content_if_absent_keeps_first_writer() {
    let db = create_test_db().await;
    let (_, subtopic_ids) = create_topic_with_subtopics(&db).await;
    let subtopic_id = subtopic_ids[0];

    let quiz = r#"[{"question": "Q?", "options": ["a", "b", "c", "d"], "correctAnswer": 0}]"#;

    let first = db
        .insert_content_if_absent(subtopic_id, "first explanation", "first examples", quiz)
        .await
        .unwrap();

    // A second writer loses the race and gets the stored row back
    let second = db
        .insert_content_if_absent(subtopic_id, "second explanation", "second examples", quiz)
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.explanation, "first explanation");

    let stored = db
        .get_content_by_subtopic(subtopic_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.explanation, "first explanation");
}

#[tokio::test]
async fn test_content_rows_are_per_subtopic() {
    let db = create_test_db().await;
    let (_, subtopic_ids) = create_topic_with_subtopics(&db).await;

    let quiz = r#"[{"question": "Q?", "options": ["a", "b", "c", "d"], "correctAnswer": 1}]"#;
    for &id in &subtopic_ids {
        db.insert_content_if_absent(id, "explanation", "examples", quiz)
            .await
            .unwrap();
    }

    for &id in &subtopic_ids {
        let content = db.get_content_by_subtopic(id).await.unwrap().unwrap();
        assert_eq!(content.subtopic_id, id);
    }
}

#[tokio::test]
async fn test_stored_quiz_json_round_trips_through_response() {
    let db = create_test_db().await;
    let (_, subtopic_ids) = create_topic_with_subtopics(&db).await;
    let subtopic_id = subtopic_ids[0];

    let quiz = r#"[
        {"question": "What moves ownership?", "options": ["let", "clone", "copy", "drop"], "correctAnswer": 0},
        {"question": "What borrows?", "options": ["&", "*", "!", "?"], "correctAnswer": 0}
    ]"#;
    db.insert_content_if_absent(subtopic_id, "explanation", "examples", quiz)
        .await
        .unwrap();

    let stored = db
        .get_content_by_subtopic(subtopic_id)
        .await
        .unwrap()
        .unwrap();
    let response: SubtopicContentResponse = stored.into();
    assert_eq!(response.quiz_questions.len(), 2);
    assert_eq!(response.quiz_questions[0].options.len(), 4);
    assert_eq!(response.quiz_questions[1].correct_answer, 0);
}

#[tokio::test]
async fn test_malformed_stored_quiz_degrades_to_empty() {
    let db = create_test_db().await;
    let (_, subtopic_ids) = create_topic_with_subtopics(&db).await;
    let subtopic_id = subtopic_ids[0];

    db.insert_content_if_absent(subtopic_id, "explanation", "examples", "not json at all")
        .await
        .unwrap();

    let stored = db
        .get_content_by_subtopic(subtopic_id)
        .await
        .unwrap()
        .unwrap();
    let response: SubtopicContentResponse = stored.into();
    assert_eq!(response.explanation, "explanation");
    assert!(response.quiz_questions.is_empty());
}

#[tokio::test]
async fn test_subtopic_order_index_unique_per_topic() {
    let db = create_test_db().await;
    let (topic_id, _) = create_topic_with_subtopics(&db).await;

    // Two topics can reuse the same order indexes independently
    let user = db
        .create_user(CreateUserRequest {
            username: "another".to_string(),
            password: "pw".to_string(),
            name: None,
            email: None,
            phone: None,
        })
        .await
        .unwrap();

    let request = CreateTopicRequest {
        user_id: user.id,
        title: "Linear Algebra".to_string(),
        description: None,
    };
    let titles = vec!["Vectors".to_string(), "Matrices".to_string()];
    let (second_topic, _) = db
        .create_topic_with_subtopics(&request, &titles)
        .await
        .unwrap();

    assert_ne!(topic_id, second_topic.id);
    let first = db.get_subtopics_by_topic(topic_id).await.unwrap();
    let second = db.get_subtopics_by_topic(second_topic.id).await.unwrap();
    assert_eq!(first[0].order_index, 0);
    assert_eq!(second[0].order_index, 0);
}
