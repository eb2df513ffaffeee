// src/handlers/survey.rs

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use crate::{
    error::AppError,
    models::{
        question::QuestionWithAnswers,
        survey::{ResultView, SubmitSurveyRequest, SurveyView},
    },
    state::AppState,
    survey::{Survey, sampler},
    utils::jwt::Claims,
};

async fn load_survey(state: &AppState, id: i64) -> Result<(Survey, Vec<QuestionWithAnswers>), AppError> {
    let survey = state
        .surveys
        .find_survey(id)
        .await?
        .ok_or(AppError::NotFound("Survey not found".to_string()))?;

    let questions = state
        .surveys
        .questions_with_answers(&survey.question_ids())
        .await?;

    Ok((survey, questions))
}

/// Loads a survey only once it has been submitted.
async fn load_closed_survey(state: &AppState, id: i64) -> Result<(Survey, Vec<QuestionWithAnswers>), AppError> {
    let (survey, questions) = load_survey(state, id).await?;
    if !survey.status.is_closed() {
        return Err(AppError::NotFound("Survey not found".to_string()));
    }
    Ok((survey, questions))
}

/// Creates a new survey from a random selection of the question bank.
///
/// Only questions that have at least one answer are drawn. Returns 201 with
/// the survey, its questions (right answers hidden) and unanswered slots.
pub async fn create_survey(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let bank = state.surveys.question_bank().await?;

    let question_ids = {
        let mut rng = state
            .rng
            .lock()
            .map_err(|_| AppError::InternalServerError("Sampler lock poisoned".to_string()))?;
        sampler::sample(&bank, state.config.questions_per_survey, &mut *rng)
    };

    if question_ids.is_empty() {
        tracing::warn!("No eligible questions in the bank; creating an empty survey");
    }

    let survey = state
        .surveys
        .insert_survey(Utc::now(), &question_ids)
        .await?;
    let questions = state
        .surveys
        .questions_with_answers(&survey.question_ids())
        .await?;

    tracing::info!(
        "Survey {} created for user {} with {} questions",
        survey.id,
        claims.sub,
        survey.results.len()
    );

    Ok((StatusCode::CREATED, Json(SurveyView::hidden(&survey, &questions))))
}

/// Retrieves a survey in either state, without revealing right answers.
pub async fn get_survey(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let (survey, questions) = load_survey(&state, id).await?;
    Ok(Json(SurveyView::hidden(&survey, &questions)))
}

/// Submits answers and closes the survey.
///
/// * 404 if the survey or any referenced result slot is unknown to it.
/// * 409 if the survey was already submitted.
/// * Returns the scored survey with right answers revealed.
pub async fn submit_survey(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<SubmitSurveyRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;

    let survey = state
        .surveys
        .submit_answers(id, &req.results)
        .await
        .inspect_err(|e| {
            if let AppError::Conflict(_) = e {
                tracing::warn!("Rejected repeated submission for survey {}", id);
            }
        })?;

    tracing::info!(
        "Survey {} closed: {}/{} answered correctly",
        survey.id,
        survey.correct_count(),
        survey.results.len()
    );

    let questions = state
        .surveys
        .questions_with_answers(&survey.question_ids())
        .await?;

    Ok(Json(SurveyView::revealed(&survey, &questions)))
}

/// Review of a finished survey.
///
/// Responds with a one-element list when the survey is closed and an empty
/// list otherwise.
pub async fn get_survey_result(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    match load_closed_survey(&state, id).await {
        Ok((survey, questions)) => Ok(Json(vec![SurveyView::revealed(&survey, &questions)])),
        Err(AppError::NotFound(_)) => Ok(Json(Vec::new())),
        Err(e) => Err(e),
    }
}

/// Retrieves a single result slot.
pub async fn get_result_slot(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let slot = state
        .surveys
        .find_result_slot(id)
        .await?
        .ok_or(AppError::NotFound("Result not found".to_string()))?;

    Ok(Json(ResultView::hidden(&slot)))
}
