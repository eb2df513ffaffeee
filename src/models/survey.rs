// src/models/survey.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{
    models::question::{PublicQuestion, QuestionWithAnswers},
    survey::{ResultSlot, Submission, Survey, SurveyStatus},
};

/// Row of the 'surveys' table.
#[derive(Debug, Clone, FromRow)]
pub struct SurveyRow {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub closed: bool,
}

/// Row of 'survey_results' joined with the question's right answer.
#[derive(Debug, Clone, FromRow)]
pub struct ResultSlotRow {
    pub id: i64,
    pub survey_id: i64,
    pub question_id: i64,
    pub right_answer: i64,
    pub answered_id: i64,
    pub answered: bool,
    pub right_answered: bool,
}

impl From<ResultSlotRow> for ResultSlot {
    fn from(row: ResultSlotRow) -> Self {
        Self {
            id: row.id,
            survey_id: row.survey_id,
            question_id: row.question_id,
            right_answer: row.right_answer,
            answered_id: row.answered_id,
            answered: row.answered,
            right_answered: row.right_answered,
        }
    }
}

/// DTO for submitting answers to a survey.
/// Also accepts the legacy `simple_survey_result` key.
#[derive(Debug, Deserialize)]
pub struct SubmitSurveyRequest {
    #[serde(alias = "simple_survey_result")]
    pub results: Vec<Submission>,
}

/// Result slot as sent to the client.
/// `right_answered` is only present once the survey has been closed.
#[derive(Debug, Serialize)]
pub struct ResultView {
    pub id: i64,
    pub question_id: i64,
    pub answered_id: i64,
    pub answered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right_answered: Option<bool>,
}

impl ResultView {
    pub fn hidden(slot: &ResultSlot) -> Self {
        Self {
            id: slot.id,
            question_id: slot.question_id,
            answered_id: slot.answered_id,
            answered: slot.answered,
            right_answered: None,
        }
    }

    pub fn revealed(slot: &ResultSlot) -> Self {
        Self {
            right_answered: Some(slot.right_answered),
            ..Self::hidden(slot)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SurveyView {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub status: SurveyStatus,
    pub questions: Vec<PublicQuestion>,
    pub results: Vec<ResultView>,
}

impl SurveyView {
    /// View handed out while taking the survey: answers visible, right answers hidden.
    pub fn hidden(survey: &Survey, questions: &[QuestionWithAnswers]) -> Self {
        Self::build(survey, questions, false)
    }

    /// Review view of a finished survey, with right answers and correctness.
    pub fn revealed(survey: &Survey, questions: &[QuestionWithAnswers]) -> Self {
        Self::build(survey, questions, true)
    }

    fn build(survey: &Survey, questions: &[QuestionWithAnswers], reveal: bool) -> Self {
        let by_id: HashMap<i64, &QuestionWithAnswers> =
            questions.iter().map(|q| (q.question.id, q)).collect();

        // Questions follow slot order.
        let questions = survey
            .results
            .iter()
            .filter_map(|slot| by_id.get(&slot.question_id))
            .map(|q| {
                if reveal {
                    PublicQuestion::revealed(q)
                } else {
                    PublicQuestion::hidden(q)
                }
            })
            .collect();

        let results = survey
            .results
            .iter()
            .map(|slot| {
                if reveal {
                    ResultView::revealed(slot)
                } else {
                    ResultView::hidden(slot)
                }
            })
            .collect();

        Self {
            id: survey.id,
            created_at: survey.created_at,
            status: survey.status,
            questions,
            results,
        }
    }
}
