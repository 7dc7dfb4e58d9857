// src/handlers/quiz.rs

use std::sync::Arc;

use axum::{Extension, Json, extract::State, response::IntoResponse};
use chrono::Utc;
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::quiz::{QuizSubmitResponse, SubmitQuizRequest},
    settlement::SettlementEngine,
    utils::jwt::Claims,
};

/// Whether the caller can still take this week's quiz.
#[utoipa::path(
    get,
    path = "/api/quiz/status",
    tag = "quiz",
    responses((status = 200, description = "`{can_take_quiz}`"))
)]
pub async fn quiz_status(
    State(engine): State<Arc<SettlementEngine>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let can_take_quiz = engine.quiz_status(claims.user_id()?, Utc::now()).await?;

    Ok(Json(json!({ "success": true, "can_take_quiz": can_take_quiz })))
}

/// This week's questions for the caller, without their answers.
///
/// The first call of the week draws the assignment; later calls return the same set.
#[utoipa::path(
    get,
    path = "/api/quiz/available",
    tag = "quiz",
    responses((status = 200, description = "Assigned questions", body = [crate::models::quiz::PublicQuizQuestion]))
)]
pub async fn available_quiz(
    State(engine): State<Arc<SettlementEngine>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let questions = engine.assign_quiz(claims.user_id()?, Utc::now()).await?;

    Ok(Json(json!({
        "success": true,
        "can_take_quiz": !questions.is_empty(),
        "questions": questions
    })))
}

/// Grades the caller's answers for this week and credits the points.
#[utoipa::path(
    post,
    path = "/api/quiz/submit",
    tag = "quiz",
    request_body = SubmitQuizRequest,
    responses(
        (status = 200, description = "Answers graded", body = QuizSubmitResponse),
        (status = 400, description = "Empty, oversized or malformed batch")
    )
)]
pub async fn submit_quiz(
    State(engine): State<Arc<SettlementEngine>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let user_id = claims.user_id()?;

    let result = engine
        .submit_quiz_answers(user_id, &req.answers, Utc::now())
        .await?;

    let message = if result.correct + result.wrong == 0 {
        "No new answers were graded".to_string()
    } else {
        format!("{} of {} answers correct", result.correct, result.correct + result.wrong)
    };

    Ok(Json(QuizSubmitResponse {
        success: true,
        message,
        correct: result.correct,
        wrong: result.wrong,
        earned: result.earned,
    }))
}
