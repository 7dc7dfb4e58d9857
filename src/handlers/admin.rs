// src/handlers/admin.rs

use std::{collections::BTreeMap, sync::Arc};

use axum::{
    Json,
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::matches::MATCH_COLUMNS,
    models::{
        matches::{CreateMatchRequest, FinishMatchRequest, FinishMatchResponse, Match},
        quiz::{CreateQuizRequest, QuizQuestion},
        settings::UpdatePointsRequest,
    },
    settlement::SettlementEngine,
    utils::jwt::Claims,
};

/// Creates an upcoming fixture.
/// Admin only.
pub async fn create_match(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateMatchRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let created = sqlx::query_as::<_, Match>(&format!(
        r#"
        INSERT INTO matches (home_team, away_team, match_date, league_id, match_week)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {}
        "#,
        MATCH_COLUMNS
    ))
    .bind(&payload.home_team)
    .bind(&payload.away_team)
    .bind(payload.match_date)
    .bind(payload.league_id)
    .bind(payload.match_week)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create match: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(json!({ "success": true, "match": created }))))
}

/// Records a final score and settles the match's predictions.
/// Admin only. Repeating the call never credits a prediction twice.
#[utoipa::path(
    post,
    path = "/api/admin/finish-match",
    tag = "settlement",
    request_body = FinishMatchRequest,
    responses(
        (status = 200, description = "Match finished and predictions graded", body = FinishMatchResponse),
        (status = 400, description = "Missing or negative score"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Match not found")
    )
)]
pub async fn finish_match(
    State(engine): State<Arc<SettlementEngine>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<FinishMatchRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let (Some(home_score), Some(away_score)) = (payload.home_score, payload.away_score) else {
        return Err(AppError::BadRequest("Both scores are required".to_string()));
    };

    tracing::info!(admin = %claims.sub, match_id = payload.match_id, "Finishing match");

    let settlement = engine
        .finish_match(payload.match_id, home_score, away_score, Utc::now())
        .await?;

    Ok(Json(FinishMatchResponse {
        success: true,
        message: format!(
            "Match finished ({}). {} predictions graded, {} correct.",
            settlement.outcome, settlement.graded, settlement.winners
        ),
        graded: settlement.graded,
        winners: settlement.winners,
        points_per_winner: settlement.points_per_winner,
    }))
}

/// Re-grades predictions left ungraded on any finished match.
/// Admin only.
#[utoipa::path(
    post,
    path = "/api/admin/settle-finished",
    tag = "settlement",
    responses((status = 200, description = "Matches that had predictions graded by this sweep"))
)]
pub async fn settle_finished(
    State(engine): State<Arc<SettlementEngine>>,
) -> Result<impl IntoResponse, AppError> {
    let settled = engine.settle_finished_matches(Utc::now()).await?;

    let matches: Vec<_> = settled
        .iter()
        .map(|s| {
            json!({
                "match_id": s.match_id,
                "outcome": s.outcome,
                "graded": s.graded,
                "winners": s.winners,
            })
        })
        .collect();

    Ok(Json(json!({ "success": true, "settled": matches })))
}

/// Lists every system setting.
/// Admin only.
pub async fn list_settings(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT name, value FROM system_settings ORDER BY name")
            .fetch_all(&pool)
            .await?;

    let settings: BTreeMap<String, String> = rows.into_iter().collect();

    Ok(Json(json!({ "success": true, "settings": settings })))
}

/// Sets a point value. Takes effect from the next settlement.
/// Admin only.
pub async fn update_points(
    State(pool): State<PgPool>,
    Json(payload): Json<UpdatePointsRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    sqlx::query(
        r#"
        INSERT INTO system_settings (name, value)
        VALUES ($1, $2)
        ON CONFLICT (name) DO UPDATE SET value = EXCLUDED.value
        "#,
    )
    .bind(&payload.setting)
    .bind(payload.value.to_string())
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to update setting {}: {:?}", payload.setting, e);
        AppError::InternalServerError(e.to_string())
    })?;

    tracing::info!(setting = %payload.setting, value = payload.value, "Point setting updated");

    Ok(Json(json!({
        "success": true,
        "setting": payload.setting,
        "value": payload.value
    })))
}

/// Lists quiz questions with their answers.
/// Admin only.
pub async fn list_quiz(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let questions = sqlx::query_as::<_, QuizQuestion>(
        r#"
        SELECT id, question, option_a, option_b, option_c, option_d, correct_option, image_url
        FROM quizzes
        ORDER BY id DESC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(json!({ "success": true, "questions": questions })))
}

/// Adds a quiz question to the pool.
/// Admin only.
pub async fn create_quiz(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO quizzes (question, option_a, option_b, option_c, option_d, correct_option, image_url)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(&payload.question)
    .bind(&payload.option_a)
    .bind(&payload.option_b)
    .bind(&payload.option_c)
    .bind(&payload.option_d)
    .bind(payload.correct_option.as_str())
    .bind(&payload.image_url)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create quiz question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(json!({ "success": true, "id": id }))))
}
