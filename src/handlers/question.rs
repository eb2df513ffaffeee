// src/handlers/question.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::question::{PublicAnswer, PublicQuestion},
    state::AppState,
};

/// Retrieves a question with its answers. The right answer is never exposed here.
pub async fn get_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let question = state
        .surveys
        .find_question(id)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    Ok(Json(PublicQuestion::hidden(&question)))
}

/// Lists the answers of a question.
pub async fn list_question_answers(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let question = state
        .surveys
        .find_question(id)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    let answers: Vec<PublicAnswer> = question.answers.iter().map(PublicAnswer::from).collect();
    Ok(Json(answers))
}

pub async fn get_answer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let answer = state
        .surveys
        .find_answer(id)
        .await?
        .ok_or(AppError::NotFound("Answer not found".to_string()))?;

    Ok(Json(PublicAnswer::from(&answer)))
}
