// src/handlers/predictions.rs

use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::prediction::{GuessOutcome, PredictionView, SubmitPredictionRequest},
    settlement::SettlementEngine,
    utils::jwt::Claims,
};

/// Creates or changes the caller's guess for a match.
///
/// Predictions close at kickoff; a closed match answers 403.
#[utoipa::path(
    post,
    path = "/api/predictions",
    tag = "predictions",
    request_body = SubmitPredictionRequest,
    responses(
        (status = 201, description = "Prediction created"),
        (status = 200, description = "Prediction updated"),
        (status = 403, description = "Match already started or prediction graded"),
        (status = 404, description = "Match not found")
    )
)]
pub async fn submit_prediction(
    State(engine): State<Arc<SettlementEngine>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitPredictionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let stored = engine
        .submit_prediction(user_id, req.match_id, req.predicted_result, Utc::now())
        .await?;

    let (status, message) = match stored {
        GuessOutcome::Created => (StatusCode::CREATED, "Prediction saved"),
        _ => (StatusCode::OK, "Prediction updated"),
    };

    Ok((
        status,
        Json(json!({
            "success": true,
            "message": message,
            "match_id": req.match_id,
            "predicted_result": req.predicted_result
        })),
    ))
}

/// The caller's predictions with match details, newest match first.
pub async fn my_predictions(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let predictions = sqlx::query_as::<_, PredictionView>(
        r#"
        SELECT
            p.id, p.match_id, m.home_team, m.away_team, m.match_date,
            m.home_score, m.away_score, p.predicted_result, p.is_correct
        FROM predictions p
        JOIN matches m ON m.id = p.match_id
        WHERE p.user_id = $1
        ORDER BY m.match_date DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch predictions: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(json!({ "success": true, "predictions": predictions })))
}
