// src/models/question.rs

use serde::Serialize;
use sqlx::prelude::FromRow;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct Question {
    pub id: i64,

    /// The text of the question.
    pub question: String,

    /// Optional image reference (path or URL), stored as-is.
    pub image: Option<String>,

    /// Identifier a submitted choice must equal to count as correct.
    /// Compared by value only; it is not checked against the answers table.
    pub right_answer: i64,
}

/// Represents the 'answers' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct Answer {
    pub id: i64,
    pub answer: String,
    pub image: Option<String>,
    pub question_id: i64,
}

/// A question together with its candidate answers, as loaded for a survey.
#[derive(Debug, Clone)]
pub struct QuestionWithAnswers {
    pub question: Question,
    pub answers: Vec<Answer>,
}

/// Lightweight question bank row used by the sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct QuestionSummary {
    pub id: i64,
    pub answer_count: i64,
}

impl QuestionSummary {
    /// Only questions with at least one answer may appear in a survey.
    pub fn is_eligible(&self) -> bool {
        self.answer_count > 0
    }
}

/// DTO for an answer sent to the client.
#[derive(Debug, Serialize)]
pub struct PublicAnswer {
    pub id: i64,
    pub answer: String,
    pub image: Option<String>,
}

impl From<&Answer> for PublicAnswer {
    fn from(a: &Answer) -> Self {
        Self {
            id: a.id,
            answer: a.answer.clone(),
            image: a.image.clone(),
        }
    }
}

/// DTO for a question sent to the client.
/// `right_answer` is only present once the survey has been closed.
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub question: String,
    pub image: Option<String>,
    pub answers: Vec<PublicAnswer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right_answer: Option<i64>,
}

impl PublicQuestion {
    pub fn hidden(q: &QuestionWithAnswers) -> Self {
        Self {
            id: q.question.id,
            question: q.question.question.clone(),
            image: q.question.image.clone(),
            answers: q.answers.iter().map(PublicAnswer::from).collect(),
            right_answer: None,
        }
    }

    pub fn revealed(q: &QuestionWithAnswers) -> Self {
        Self {
            right_answer: Some(q.question.right_answer),
            ..Self::hidden(q)
        }
    }
}
