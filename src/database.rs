use anyhow::Result;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::*;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url).await?;
        let db = Database { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                name TEXT,
                email TEXT,
                phone TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS topics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                FOREIGN KEY (user_id) REFERENCES users(id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS subtopics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                topic_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                order_index INTEGER NOT NULL,
                UNIQUE (topic_id, order_index),
                FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        // UNIQUE(subtopic_id) is what makes get-or-generate collapse
        // concurrent first reads into a single stored row.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS subtopic_content (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                subtopic_id INTEGER NOT NULL UNIQUE,
                explanation TEXT NOT NULL,
                examples TEXT NOT NULL,
                quiz_questions TEXT NOT NULL,
                FOREIGN KEY (subtopic_id) REFERENCES subtopics(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_progress (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                subtopic_id INTEGER NOT NULL,
                completed INTEGER NOT NULL DEFAULT 0,
                score INTEGER,
                UNIQUE (user_id, subtopic_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS quiz_attempts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                subtopic_id INTEGER NOT NULL,
                topic_id INTEGER NOT NULL,
                question_index INTEGER NOT NULL,
                selected_answer INTEGER NOT NULL,
                correct_answer INTEGER NOT NULL,
                is_correct INTEGER NOT NULL,
                attempted_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // User operations

    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User> {
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: request.username,
            password: request.password,
            name: request.name,
            email: request.email,
            phone: request.phone,
        };

        sqlx::query(
            r#"
            INSERT INTO users (id, username, password, name, email, phone)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.password)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .execute(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Self::row_to_user))
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ?1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Self::row_to_user))
    }

    /// Partial profile update. Absent fields keep their stored values.
    pub async fn update_user(&self, id: &str, request: UpdateUserRequest) -> Result<Option<User>> {
        let Some(mut user) = self.get_user(id).await? else {
            return Ok(None);
        };

        if let Some(name) = request.name {
            user.name = Some(name);
        }
        if let Some(email) = request.email {
            user.email = Some(email);
        }
        if let Some(phone) = request.phone {
            user.phone = Some(phone);
        }

        sqlx::query("UPDATE users SET name = ?1, email = ?2, phone = ?3 WHERE id = ?4")
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.phone)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(Some(user))
    }

    // Topic operations

    /// Insert a topic and its generated subtopics atomically. A failure on
    /// any subtopic rolls the whole batch back, so a topic never persists
    /// with a partial subtopic list.
    pub async fn create_topic_with_subtopics(
        &self,
        request: &CreateTopicRequest,
        subtopic_titles: &[String],
    ) -> Result<(Topic, Vec<Subtopic>)> {
        let mut tx = self.pool.begin().await?;

        let topic_result = sqlx::query("INSERT INTO topics (user_id, title, description) VALUES (?1, ?2, ?3)")
            .bind(&request.user_id)
            .bind(&request.title)
            .bind(&request.description)
            .execute(&mut *tx)
            .await?;
        let topic_id = topic_result.last_insert_rowid();

        let mut subtopics = Vec::with_capacity(subtopic_titles.len());
        for (index, title) in subtopic_titles.iter().enumerate() {
            let subtopic_result = sqlx::query(
                "INSERT INTO subtopics (topic_id, title, order_index) VALUES (?1, ?2, ?3)",
            )
            .bind(topic_id)
            .bind(title)
            .bind(index as i64)
            .execute(&mut *tx)
            .await?;

            subtopics.push(Subtopic {
                id: subtopic_result.last_insert_rowid(),
                topic_id,
                title: title.clone(),
                order_index: index as i64,
            });
        }

        tx.commit().await?;

        let topic = Topic {
            id: topic_id,
            user_id: request.user_id.clone(),
            title: request.title.clone(),
            description: request.description.clone(),
        };

        Ok((topic, subtopics))
    }

    pub async fn get_topic(&self, id: i64) -> Result<Option<Topic>> {
        let row = sqlx::query("SELECT * FROM topics WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Self::row_to_topic))
    }

    pub async fn get_topics_by_user(&self, user_id: &str) -> Result<Vec<Topic>> {
        let rows = sqlx::query("SELECT * FROM topics WHERE user_id = ?1 ORDER BY id")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Self::row_to_topic).collect())
    }

    // Subtopic operations

    pub async fn get_subtopic(&self, id: i64) -> Result<Option<Subtopic>> {
        let row = sqlx::query("SELECT * FROM subtopics WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Self::row_to_subtopic))
    }

    pub async fn get_subtopics_by_topic(&self, topic_id: i64) -> Result<Vec<Subtopic>> {
        let rows = sqlx::query("SELECT * FROM subtopics WHERE topic_id = ?1 ORDER BY order_index")
            .bind(topic_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Self::row_to_subtopic).collect())
    }

    // Content operations

    pub async fn get_content_by_subtopic(&self, subtopic_id: i64) -> Result<Option<SubtopicContent>> {
        let row = sqlx::query("SELECT * FROM subtopic_content WHERE subtopic_id = ?1")
            .bind(subtopic_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Self::row_to_content))
    }

    /// Conflict-tolerant insert followed by a read-back. When two requests
    /// race on the same ungenerated subtopic, the loser's insert is a no-op
    /// and both return the winner's row.
    pub async fn insert_content_if_absent(
        &self,
        subtopic_id: i64,
        explanation: &str,
        examples: &str,
        quiz_questions: &str,
    ) -> Result<SubtopicContent> {
        sqlx::query(
            r#"
            INSERT INTO subtopic_content (subtopic_id, explanation, examples, quiz_questions)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(subtopic_id) DO NOTHING
            "#,
        )
        .bind(subtopic_id)
        .bind(explanation)
        .bind(examples)
        .bind(quiz_questions)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query("SELECT * FROM subtopic_content WHERE subtopic_id = ?1")
            .bind(subtopic_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(Self::row_to_content(row))
    }

    // Progress operations

    /// Database-level upsert keyed on (user_id, subtopic_id).
    pub async fn upsert_progress(&self, request: &UpsertProgressRequest) -> Result<UserProgress> {
        sqlx::query(
            r#"
            INSERT INTO user_progress (user_id, subtopic_id, completed, score)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(user_id, subtopic_id)
            DO UPDATE SET completed = excluded.completed, score = excluded.score
            "#,
        )
        .bind(&request.user_id)
        .bind(request.subtopic_id)
        .bind(request.completed)
        .bind(request.score)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(
            "SELECT * FROM user_progress WHERE user_id = ?1 AND subtopic_id = ?2",
        )
        .bind(&request.user_id)
        .bind(request.subtopic_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Self::row_to_progress(row))
    }

    pub async fn get_progress_by_user(&self, user_id: &str) -> Result<Vec<UserProgress>> {
        let rows = sqlx::query("SELECT * FROM user_progress WHERE user_id = ?1 ORDER BY subtopic_id")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Self::row_to_progress).collect())
    }

    // Quiz attempt operations

    pub async fn create_quiz_attempt(
        &self,
        request: &CreateQuizAttemptRequest,
    ) -> Result<QuizAttempt> {
        let attempted_at = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO quiz_attempts (user_id, subtopic_id, topic_id, question_index,
                                       selected_answer, correct_answer, is_correct, attempted_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&request.user_id)
        .bind(request.subtopic_id)
        .bind(request.topic_id)
        .bind(request.question_index)
        .bind(request.selected_answer)
        .bind(request.correct_answer)
        .bind(request.is_correct)
        .bind(attempted_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(QuizAttempt {
            id: result.last_insert_rowid(),
            user_id: request.user_id.clone(),
            subtopic_id: request.subtopic_id,
            topic_id: request.topic_id,
            question_index: request.question_index,
            selected_answer: request.selected_answer,
            correct_answer: request.correct_answer,
            is_correct: request.is_correct,
            attempted_at,
        })
    }

    pub async fn get_quiz_attempts_by_user(&self, user_id: &str) -> Result<Vec<QuizAttempt>> {
        let rows = sqlx::query(
            "SELECT * FROM quiz_attempts WHERE user_id = ?1 ORDER BY attempted_at, id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_attempt).collect()
    }

    // Row mapping helpers

    fn row_to_user(row: sqlx::sqlite::SqliteRow) -> User {
        User {
            id: row.get("id"),
            username: row.get("username"),
            password: row.get("password"),
            name: row.get("name"),
            email: row.get("email"),
            phone: row.get("phone"),
        }
    }

    fn row_to_topic(row: sqlx::sqlite::SqliteRow) -> Topic {
        Topic {
            id: row.get("id"),
            user_id: row.get("user_id"),
            title: row.get("title"),
            description: row.get("description"),
        }
    }

    fn row_to_subtopic(row: sqlx::sqlite::SqliteRow) -> Subtopic {
        Subtopic {
            id: row.get("id"),
            topic_id: row.get("topic_id"),
            title: row.get("title"),
            order_index: row.get("order_index"),
        }
    }

    fn row_to_content(row: sqlx::sqlite::SqliteRow) -> SubtopicContent {
        SubtopicContent {
            id: row.get("id"),
            subtopic_id: row.get("subtopic_id"),
            explanation: row.get("explanation"),
            examples: row.get("examples"),
            quiz_questions: row.get("quiz_questions"),
        }
    }

    fn row_to_progress(row: sqlx::sqlite::SqliteRow) -> UserProgress {
        UserProgress {
            id: row.get("id"),
            user_id: row.get("user_id"),
            subtopic_id: row.get("subtopic_id"),
            completed: row.get("completed"),
            score: row.get("score"),
        }
    }

    fn row_to_attempt(row: sqlx::sqlite::SqliteRow) -> Result<QuizAttempt> {
        Ok(QuizAttempt {
            id: row.get("id"),
            user_id: row.get("user_id"),
            subtopic_id: row.get("subtopic_id"),
            topic_id: row.get("topic_id"),
            question_index: row.get("question_index"),
            selected_answer: row.get("selected_answer"),
            correct_answer: row.get("correct_answer"),
            is_correct: row.get("is_correct"),
            attempted_at: chrono::DateTime::parse_from_rfc3339(
                &row.get::<String, _>("attempted_at"),
            )?
            .with_timezone(&Utc),
        })
    }
}
