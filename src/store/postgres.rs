// src/store/postgres.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::{
    error::AppError,
    models::{
        question::{Answer, Question, QuestionSummary, QuestionWithAnswers},
        survey::{ResultSlotRow, SurveyRow},
        user::{NewUser, User, UserChanges},
    },
    store::{SurveyStore, UserStore, duplicate_email},
    survey::{ResultSlot, Submission, Survey, SurveyStatus},
};

const SLOT_COLUMNS: &str = r#"
    SELECT
        r.id,
        r.survey_id,
        r.question_id,
        q.right_answer,
        r.answered_id,
        r.answered,
        r.right_answered
    FROM survey_results r
    JOIN questions q ON q.id = r.question_id
"#;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn load_slots(conn: &mut PgConnection, survey_id: i64) -> Result<Vec<ResultSlot>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ResultSlotRow>(&format!(
        "{} WHERE r.survey_id = $1 ORDER BY r.id",
        SLOT_COLUMNS
    ))
    .bind(survey_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(ResultSlot::from).collect())
}

fn into_survey(row: SurveyRow, results: Vec<ResultSlot>) -> Survey {
    Survey {
        id: row.id,
        created_at: row.created_at,
        status: SurveyStatus::from_closed(row.closed),
        results,
    }
}

#[async_trait]
impl SurveyStore for PgStore {
    async fn question_bank(&self) -> Result<Vec<QuestionSummary>, AppError> {
        let bank = sqlx::query_as::<_, QuestionSummary>(
            r#"
            SELECT q.id, COUNT(a.id) AS answer_count
            FROM questions q
            LEFT JOIN answers a ON a.question_id = q.id
            GROUP BY q.id
            ORDER BY q.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load question bank: {:?}", e);
            AppError::from(e)
        })?;

        Ok(bank)
    }

    async fn questions_with_answers(&self, ids: &[i64]) -> Result<Vec<QuestionWithAnswers>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let questions = sqlx::query_as::<_, Question>(
            "SELECT id, question, image, right_answer FROM questions WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let answers = sqlx::query_as::<_, Answer>(
            "SELECT id, answer, image, question_id FROM answers WHERE question_id = ANY($1) ORDER BY id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<i64, Vec<Answer>> = HashMap::new();
        for answer in answers {
            grouped.entry(answer.question_id).or_default().push(answer);
        }

        Ok(questions
            .into_iter()
            .map(|question| QuestionWithAnswers {
                answers: grouped.remove(&question.id).unwrap_or_default(),
                question,
            })
            .collect())
    }

    async fn find_question(&self, id: i64) -> Result<Option<QuestionWithAnswers>, AppError> {
        Ok(self.questions_with_answers(&[id]).await?.into_iter().next())
    }

    async fn find_answer(&self, id: i64) -> Result<Option<Answer>, AppError> {
        let answer = sqlx::query_as::<_, Answer>(
            "SELECT id, answer, image, question_id FROM answers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(answer)
    }

    async fn insert_survey(&self, created_at: DateTime<Utc>, question_ids: &[i64]) -> Result<Survey, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, SurveyRow>(
            r#"
            INSERT INTO surveys (created_at, closed)
            VALUES ($1, FALSE)
            RETURNING id, created_at, closed
            "#,
        )
        .bind(created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert survey: {:?}", e);
            AppError::from(e)
        })?;

        // The bank was read outside this transaction; only questions that
        // still have an answer get a slot.
        for question_id in question_ids {
            let inserted = sqlx::query(
                r#"
                INSERT INTO survey_results (survey_id, question_id)
                SELECT $1, q.id
                FROM questions q
                WHERE q.id = $2
                  AND EXISTS (SELECT 1 FROM answers a WHERE a.question_id = q.id)
                "#,
            )
            .bind(row.id)
            .bind(question_id)
            .execute(&mut *tx)
            .await?;

            if inserted.rows_affected() == 0 {
                tracing::warn!("Question {} is no longer eligible, skipping", question_id);
            }
        }

        let results = load_slots(&mut *tx, row.id).await?;
        tx.commit().await?;

        Ok(into_survey(row, results))
    }

    async fn find_survey(&self, id: i64) -> Result<Option<Survey>, AppError> {
        let mut conn = self.pool.acquire().await?;

        let row = sqlx::query_as::<_, SurveyRow>("SELECT id, created_at, closed FROM surveys WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let results = load_slots(&mut *conn, row.id).await?;
        Ok(Some(into_survey(row, results)))
    }

    async fn find_result_slot(&self, id: i64) -> Result<Option<ResultSlot>, AppError> {
        let row = sqlx::query_as::<_, ResultSlotRow>(&format!("{} WHERE r.id = $1", SLOT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(ResultSlot::from))
    }

    async fn submit_answers(&self, survey_id: i64, entries: &[Submission]) -> Result<Survey, AppError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent submissions for the same survey.
        let row = sqlx::query_as::<_, SurveyRow>(
            "SELECT id, created_at, closed FROM surveys WHERE id = $1 FOR UPDATE",
        )
        .bind(survey_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Survey not found".to_string()))?;

        let results = load_slots(&mut *tx, row.id).await?;
        let mut survey = into_survey(row, results);

        // On error the transaction is dropped and rolled back.
        survey.submit(entries)?;

        for slot in survey.results.iter().filter(|s| s.answered) {
            sqlx::query(
                r#"
                UPDATE survey_results
                SET answered_id = $1, answered = $2, right_answered = $3
                WHERE id = $4
                "#,
            )
            .bind(slot.answered_id)
            .bind(slot.answered)
            .bind(slot.right_answered)
            .bind(slot.id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE surveys SET closed = TRUE WHERE id = $1")
            .bind(survey.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await.map_err(|e| {
            tracing::error!("Failed to commit survey submission: {:?}", e);
            AppError::from(e)
        })?;

        Ok(survey)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, username, password, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, username, password, role, created_at
            "#,
        )
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password)
        .bind(&user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => duplicate_email(&user.email),
            _ => {
                tracing::error!("Failed to insert user: {:?}", e);
                AppError::from(e)
            }
        })
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, username, password, role, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                password = COALESCE($3, password)
            WHERE id = $1
            RETURNING id, email, username, password, role, created_at
            "#,
        )
        .bind(id)
        .bind(changes.username)
        .bind(changes.password)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))
    }

    async fn delete_user(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete user: {:?}", e);
                AppError::from(e)
            })?;

        Ok(result.rows_affected() > 0)
    }
}
