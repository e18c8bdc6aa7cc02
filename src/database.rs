use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::Instant;

use crate::log_db_operation;
use crate::models::*;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // An in-memory database lives only as long as its single connection
        let pool_options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;

        let db = Database { pool };
        db.migrate().await?;
        log_db_operation!(info, "migrate", "schema ready");
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS question_papers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                user_id INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS questions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL,
                question_paper_id INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (question_paper_id) REFERENCES question_papers(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_questions_paper ON questions(question_paper_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Closes the pool; every later query fails
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // User operations
    pub async fn create_user(&self, username: &str) -> Result<User> {
        let now = Utc::now();
        let result = sqlx::query("INSERT INTO users (username, created_at) VALUES (?1, ?2)")
            .bind(username)
            .bind(format_timestamp(&now))
            .execute(&self.pool)
            .await?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: username.to_string(),
            created_at: now,
        })
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| row_to_user(&row)).transpose()
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ?1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| row_to_user(&row)).transpose()
    }

    // Paper operations
    pub async fn create_paper(&self, title: &str, user_id: i64) -> Result<Paper> {
        let mut conn = self.pool.acquire().await?;
        insert_paper(&mut *conn, title, user_id).await
    }

    /// Stores a paper and its questions atomically; on failure neither exists
    pub async fn create_paper_with_questions(
        &self,
        title: &str,
        user_id: i64,
        texts: &[String],
    ) -> Result<(Paper, Vec<Question>)> {
        let start = Instant::now();
        let mut tx = self.pool.begin().await?;

        let paper = insert_paper(&mut *tx, title, user_id).await?;
        let mut questions = Vec::with_capacity(texts.len());
        for text in texts {
            questions.push(insert_question(&mut *tx, paper.id, text).await?);
        }

        tx.commit().await?;

        log_db_operation!(
            debug,
            "create_paper_with_questions",
            "paper stored",
            paper_id = paper.id,
            count = questions.len(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        Ok((paper, questions))
    }

    pub async fn get_paper(&self, id: i64) -> Result<Option<Paper>> {
        let row = sqlx::query("SELECT * FROM question_papers WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| row_to_paper(&row)).transpose()
    }

    pub async fn get_papers_for_user(&self, user_id: i64) -> Result<Vec<Paper>> {
        let rows = sqlx::query(
            "SELECT * FROM question_papers WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_paper).collect()
    }

    // Question operations
    /// Inserts all questions of a paper in one transaction, preserving order
    pub async fn create_questions(&self, paper_id: i64, texts: &[String]) -> Result<Vec<Question>> {
        let mut tx = self.pool.begin().await?;
        let mut questions = Vec::with_capacity(texts.len());

        for text in texts {
            questions.push(insert_question(&mut *tx, paper_id, text).await?);
        }

        tx.commit().await?;
        Ok(questions)
    }

    pub async fn create_question(&self, paper_id: i64, text: &str) -> Result<Question> {
        let mut created = self.create_questions(paper_id, &[text.to_string()]).await?;
        created
            .pop()
            .ok_or_else(|| anyhow::anyhow!("question insert returned no row"))
    }

    pub async fn get_question(&self, id: i64) -> Result<Option<Question>> {
        let row = sqlx::query("SELECT * FROM questions WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| row_to_question(&row)).transpose()
    }

    pub async fn get_questions_for_paper(&self, paper_id: i64) -> Result<Vec<Question>> {
        let rows = sqlx::query("SELECT * FROM questions WHERE question_paper_id = ?1 ORDER BY id ASC")
            .bind(paper_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_question).collect()
    }

    pub async fn update_question_text(&self, id: i64, text: &str) -> Result<()> {
        let result = sqlx::query("UPDATE questions SET text = ?1 WHERE id = ?2")
            .bind(text)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(anyhow::anyhow!("Question with id '{}' not found", id));
        }

        Ok(())
    }

    pub async fn count_papers(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM question_papers")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    pub async fn count_questions(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM questions")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }
}

async fn insert_paper(conn: &mut SqliteConnection, title: &str, user_id: i64) -> Result<Paper> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO question_papers (title, user_id, created_at) VALUES (?1, ?2, ?3)",
    )
    .bind(title)
    .bind(user_id)
    .bind(format_timestamp(&now))
    .execute(&mut *conn)
    .await?;

    Ok(Paper {
        id: result.last_insert_rowid(),
        title: title.to_string(),
        user_id,
        created_at: now,
    })
}

async fn insert_question(conn: &mut SqliteConnection, paper_id: i64, text: &str) -> Result<Question> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO questions (text, question_paper_id, created_at) VALUES (?1, ?2, ?3)",
    )
    .bind(text)
    .bind(paper_id)
    .bind(format_timestamp(&now))
    .execute(&mut *conn)
    .await?;

    Ok(Question {
        id: result.last_insert_rowid(),
        text: text.to_string(),
        question_paper_id: paper_id,
        created_at: now,
    })
}

/// Fixed-width so that `ORDER BY created_at` sorts chronologically
fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

fn row_to_user(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
    })
}

fn row_to_paper(row: &SqliteRow) -> Result<Paper> {
    Ok(Paper {
        id: row.get("id"),
        title: row.get("title"),
        user_id: row.get("user_id"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
    })
}

fn row_to_question(row: &SqliteRow) -> Result<Question> {
    Ok(Question {
        id: row.get("id"),
        text: row.get("text"),
        question_paper_id: row.get("question_paper_id"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
    })
}
