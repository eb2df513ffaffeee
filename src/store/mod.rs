// src/store/mod.rs

//! Persistence seams. Handlers only talk to these traits; `PgStore` backs the
//! running service and `MemoryStore` backs tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        question::{Answer, QuestionSummary, QuestionWithAnswers},
        user::{NewUser, User, UserChanges},
    },
    survey::{ResultSlot, Submission, Survey},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait SurveyStore: Send + Sync {
    /// Every question id with its answer count, for sampling.
    async fn question_bank(&self) -> Result<Vec<QuestionSummary>, AppError>;

    /// Loads the given questions with their answers. Unknown ids are skipped.
    async fn questions_with_answers(&self, ids: &[i64]) -> Result<Vec<QuestionWithAnswers>, AppError>;

    async fn find_question(&self, id: i64) -> Result<Option<QuestionWithAnswers>, AppError>;

    async fn find_answer(&self, id: i64) -> Result<Option<Answer>, AppError>;

    /// Persists an open survey with one unanswered slot per question id.
    ///
    /// Eligibility is checked again at insert time: ids whose question has
    /// lost all of its answers (or no longer exists) get no slot.
    async fn insert_survey(&self, created_at: DateTime<Utc>, question_ids: &[i64]) -> Result<Survey, AppError>;

    async fn find_survey(&self, id: i64) -> Result<Option<Survey>, AppError>;

    async fn find_result_slot(&self, id: i64) -> Result<Option<ResultSlot>, AppError>;

    /// Scores and closes a survey as one atomic step per survey id.
    ///
    /// Concurrent calls for the same survey are serialized; every call after
    /// the first fails with `Conflict`.
    async fn submit_answers(&self, survey_id: i64, entries: &[Submission]) -> Result<Survey, AppError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `BadRequest` when the email is already registered.
    async fn insert_user(&self, user: NewUser) -> Result<User, AppError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<User, AppError>;

    /// Returns `false` when no such user existed.
    async fn delete_user(&self, id: i64) -> Result<bool, AppError>;
}

pub(crate) fn duplicate_email(email: &str) -> AppError {
    AppError::BadRequest(format!("User with email '{}' already exists", email))
}
