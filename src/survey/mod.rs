// src/survey/mod.rs

//! Survey lifecycle: an `Open` survey accepts exactly one submission, which
//! scores its result slots and moves it to the terminal `Closed` state.

pub mod sampler;

use std::{collections::HashSet, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SurveyStatus {
    Open,
    Closed,
}

impl SurveyStatus {
    pub fn from_closed(closed: bool) -> Self {
        if closed { SurveyStatus::Closed } else { SurveyStatus::Open }
    }

    pub fn is_closed(self) -> bool {
        self == SurveyStatus::Closed
    }
}

/// One question's outcome within one survey.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSlot {
    pub id: i64,
    pub survey_id: i64,
    pub question_id: i64,
    /// Snapshot of the owning question's `right_answer`.
    pub right_answer: i64,
    /// Chosen answer id, 0 while unanswered.
    pub answered_id: i64,
    pub answered: bool,
    pub right_answered: bool,
}

impl ResultSlot {
    pub fn unanswered(id: i64, survey_id: i64, question_id: i64, right_answer: i64) -> Self {
        Self {
            id,
            survey_id,
            question_id,
            right_answer,
            answered_id: 0,
            answered: false,
            right_answered: false,
        }
    }

    fn record(&mut self, chosen_answer_id: i64) {
        self.answered_id = chosen_answer_id;
        self.answered = true;
        self.right_answered = chosen_answer_id == self.right_answer;
    }
}

#[derive(Debug, Clone)]
pub struct Survey {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub status: SurveyStatus,
    pub results: Vec<ResultSlot>,
}

/// A single `(result slot, chosen answer)` pair from a client submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Submission {
    #[serde(alias = "id")]
    pub result_id: i64,
    #[serde(alias = "answered_id")]
    pub chosen_answer_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurveyError {
    AlreadyClosed(i64),
    UnknownSlot { survey_id: i64, result_id: i64 },
}

impl fmt::Display for SurveyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurveyError::AlreadyClosed(id) => {
                write!(f, "Survey {} has already been submitted", id)
            }
            SurveyError::UnknownSlot { survey_id, result_id } => {
                write!(f, "Result {} not found in survey {}", result_id, survey_id)
            }
        }
    }
}

impl std::error::Error for SurveyError {}

impl Survey {
    /// Applies a submission and closes the survey.
    ///
    /// Every entry is checked against this survey's slots before any slot is
    /// touched, so a rejected submission leaves the survey unchanged. Slots
    /// not mentioned stay unanswered; the survey closes regardless.
    pub fn submit(&mut self, entries: &[Submission]) -> Result<(), SurveyError> {
        if self.status.is_closed() {
            return Err(SurveyError::AlreadyClosed(self.id));
        }

        let own: HashSet<i64> = self.results.iter().map(|r| r.id).collect();
        if let Some(unknown) = entries.iter().find(|e| !own.contains(&e.result_id)) {
            return Err(SurveyError::UnknownSlot {
                survey_id: self.id,
                result_id: unknown.result_id,
            });
        }

        // Later entries for the same slot win.
        for entry in entries {
            if let Some(slot) = self.results.iter_mut().find(|r| r.id == entry.result_id) {
                slot.record(entry.chosen_answer_id);
            }
        }

        self.status = SurveyStatus::Closed;
        Ok(())
    }

    pub fn question_ids(&self) -> Vec<i64> {
        self.results.iter().map(|r| r.question_id).collect()
    }

    /// Number of correctly answered slots. Derived on demand, never stored.
    pub fn correct_count(&self) -> usize {
        self.results.iter().filter(|r| r.right_answered).count()
    }
}
