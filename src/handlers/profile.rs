// src/handlers/profile.rs

use std::sync::Arc;

use axum::{Extension, Json, extract::State, response::IntoResponse};
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::{auth::USER_COLUMNS, scoreboard::ranks_of},
    models::{
        ledger::LedgerBalance,
        user::{ActivityStats, ChangePasswordRequest, ProfileResponse, User},
    },
    ranking::RankingService,
    settlement::SettlementEngine,
    utils::{
        hash::{hash_password, verify_password},
        jwt::Claims,
    },
};

#[derive(sqlx::FromRow)]
struct GradedCounts {
    total: i64,
    correct: i64,
}

/// Get current user's profile, ledger balance, statistics and ranks.
pub async fn get_me(
    State(pool): State<PgPool>,
    State(engine): State<Arc<SettlementEngine>>,
    State(ranking): State<Arc<RankingService>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE id = $1",
        USER_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    let scores = ranking
        .balance(user_id)
        .await?
        .unwrap_or_else(|| LedgerBalance::empty(user_id));

    // Only graded rows count; pending predictions and unanswered questions do not.
    let predictions = sqlx::query_as::<_, GradedCounts>(
        r#"
        SELECT COUNT(*) AS total, COUNT(*) FILTER (WHERE is_correct) AS correct
        FROM predictions
        WHERE user_id = $1 AND is_correct IS NOT NULL
        "#,
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await?;

    let quizzes = sqlx::query_as::<_, GradedCounts>(
        r#"
        SELECT COUNT(*) AS total, COUNT(*) FILTER (WHERE is_correct) AS correct
        FROM quiz_attempts
        WHERE user_id = $1 AND is_correct IS NOT NULL
        "#,
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await?;

    let profile = ProfileResponse {
        user,
        scores,
        quiz_available: engine.quiz_status(user_id, Utc::now()).await?,
        prediction_stats: ActivityStats::new(predictions.total, predictions.correct),
        quiz_stats: ActivityStats::new(quizzes.total, quizzes.correct),
        rankings: ranks_of(&ranking, user_id).await?,
    };

    Ok(Json(json!({ "success": true, "profile": profile })))
}

/// Changes the current user's password after checking the old one.
pub async fn change_password(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id()?;

    let stored: String = sqlx::query_scalar("SELECT password FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    if !verify_password(&payload.current_password, &stored)? {
        return Err(AppError::AuthError("Current password is incorrect".to_string()));
    }

    let hashed_password = hash_password(&payload.new_password)?;
    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(&hashed_password)
        .bind(user_id)
        .execute(&pool)
        .await?;

    tracing::info!(user_id, "Password changed");

    Ok(Json(json!({ "success": true, "message": "Password changed successfully" })))
}
