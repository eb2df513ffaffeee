// src/store/memory.rs

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    error::AppError,
    models::{
        question::{Answer, Question, QuestionSummary, QuestionWithAnswers},
        user::{NewUser, User, UserChanges},
    },
    store::{SurveyStore, UserStore, duplicate_email},
    survey::{ResultSlot, Submission, Survey, SurveyStatus},
};

#[derive(Default)]
struct Tables {
    next_id: i64,
    questions: BTreeMap<i64, Question>,
    answers: BTreeMap<i64, Answer>,
    surveys: BTreeMap<i64, Survey>,
    users: BTreeMap<i64, User>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn with_answers(&self, question: &Question) -> QuestionWithAnswers {
        QuestionWithAnswers {
            question: question.clone(),
            answers: self
                .answers
                .values()
                .filter(|a| a.question_id == question.id)
                .cloned()
                .collect(),
        }
    }

    /// Right answer of a question that exists and has at least one answer.
    fn eligible_right_answer(&self, question_id: i64) -> Option<i64> {
        let q = self.questions.get(&question_id)?;
        self.answers
            .values()
            .any(|a| a.question_id == question_id)
            .then_some(q.right_answer)
    }

    /// Copies the survey with each slot's right answer read from its question.
    fn current(&self, survey: &Survey) -> Survey {
        let mut survey = survey.clone();
        for slot in &mut survey.results {
            if let Some(q) = self.questions.get(&slot.question_id) {
                slot.right_answer = q.right_answer;
            }
        }
        survey
    }
}

/// In-process store with the same semantics as `PgStore`.
///
/// A single write lock covers each mutating call, which makes survey
/// submission atomic. It backs the HTTP test suite and lets the router be
/// embedded without a database.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

// The service exposes no question authoring, so these are the only way to
// fill a memory bank. `tests/` relies on them, which keeps them `pub`.
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a question to the bank and returns its id.
    pub async fn add_question(&self, text: &str, right_answer: i64) -> i64 {
        let mut t = self.tables.write().await;
        let id = t.next_id();
        t.questions.insert(
            id,
            Question {
                id,
                question: text.to_string(),
                image: None,
                right_answer,
            },
        );
        id
    }

    /// Adds an answer to an existing question and returns its id.
    pub async fn add_answer(&self, question_id: i64, text: &str) -> Result<i64, AppError> {
        let mut t = self.tables.write().await;
        if !t.questions.contains_key(&question_id) {
            return Err(AppError::NotFound("Question not found".to_string()));
        }
        let id = t.next_id();
        t.answers.insert(
            id,
            Answer {
                id,
                answer: text.to_string(),
                image: None,
                question_id,
            },
        );
        Ok(id)
    }

    /// Points a question's right answer at a new id.
    pub async fn set_right_answer(&self, question_id: i64, right_answer: i64) -> Result<(), AppError> {
        let mut t = self.tables.write().await;
        let q = t
            .questions
            .get_mut(&question_id)
            .ok_or(AppError::NotFound("Question not found".to_string()))?;
        q.right_answer = right_answer;
        Ok(())
    }
}

#[async_trait]
impl SurveyStore for MemoryStore {
    async fn question_bank(&self) -> Result<Vec<QuestionSummary>, AppError> {
        let t = self.tables.read().await;
        Ok(t.questions
            .keys()
            .map(|&id| QuestionSummary {
                id,
                answer_count: t.answers.values().filter(|a| a.question_id == id).count() as i64,
            })
            .collect())
    }

    async fn questions_with_answers(&self, ids: &[i64]) -> Result<Vec<QuestionWithAnswers>, AppError> {
        let t = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| t.questions.get(id))
            .map(|q| t.with_answers(q))
            .collect())
    }

    async fn find_question(&self, id: i64) -> Result<Option<QuestionWithAnswers>, AppError> {
        let t = self.tables.read().await;
        Ok(t.questions.get(&id).map(|q| t.with_answers(q)))
    }

    async fn find_answer(&self, id: i64) -> Result<Option<Answer>, AppError> {
        Ok(self.tables.read().await.answers.get(&id).cloned())
    }

    async fn insert_survey(&self, created_at: DateTime<Utc>, question_ids: &[i64]) -> Result<Survey, AppError> {
        let mut t = self.tables.write().await;
        let survey_id = t.next_id();

        let mut results = Vec::with_capacity(question_ids.len());
        for &question_id in question_ids {
            let Some(right_answer) = t.eligible_right_answer(question_id) else {
                tracing::warn!("Question {} is no longer eligible, skipping", question_id);
                continue;
            };
            let slot_id = t.next_id();
            results.push(ResultSlot::unanswered(slot_id, survey_id, question_id, right_answer));
        }

        let survey = Survey {
            id: survey_id,
            created_at,
            status: SurveyStatus::Open,
            results,
        };
        t.surveys.insert(survey_id, survey.clone());
        Ok(survey)
    }

    async fn find_survey(&self, id: i64) -> Result<Option<Survey>, AppError> {
        let t = self.tables.read().await;
        Ok(t.surveys.get(&id).map(|s| t.current(s)))
    }

    async fn find_result_slot(&self, id: i64) -> Result<Option<ResultSlot>, AppError> {
        let t = self.tables.read().await;
        let Some(owner) = t.surveys.values().find(|s| s.results.iter().any(|r| r.id == id)) else {
            return Ok(None);
        };
        Ok(t.current(owner).results.into_iter().find(|r| r.id == id))
    }

    async fn submit_answers(&self, survey_id: i64, entries: &[Submission]) -> Result<Survey, AppError> {
        let mut t = self.tables.write().await;
        let stored = t
            .surveys
            .get(&survey_id)
            .ok_or(AppError::NotFound("Survey not found".to_string()))?;

        // Score a copy; the stored survey only changes on success.
        let mut survey = t.current(stored);
        survey.submit(entries)?;

        t.surveys.insert(survey_id, survey.clone());
        Ok(survey)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut t = self.tables.write().await;
        if t.users.values().any(|u| u.email == user.email) {
            return Err(duplicate_email(&user.email));
        }

        let id = t.next_id();
        let user = User {
            id,
            email: user.email,
            username: user.username,
            password: user.password,
            role: user.role,
            created_at: Some(Utc::now()),
        };
        t.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let t = self.tables.read().await;
        Ok(t.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<User, AppError> {
        let mut t = self.tables.write().await;
        let user = t
            .users
            .get_mut(&id)
            .ok_or(AppError::NotFound("User not found".to_string()))?;

        if let Some(username) = changes.username {
            user.username = Some(username);
        }
        if let Some(password) = changes.password {
            user.password = password;
        }
        Ok(user.clone())
    }

    async fn delete_user(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.tables.write().await.users.remove(&id).is_some())
    }
}
