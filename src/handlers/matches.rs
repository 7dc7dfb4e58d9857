// src/handlers/matches.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::matches::{Match, MatchRangeParams, WeekParams},
};

pub(crate) const MATCH_COLUMNS: &str =
    "id, home_team, away_team, match_date, home_score, away_score, status, league_id, match_week";

/// Lists matches whose kickoff falls inside an optional date range.
pub async fn list_matches(
    State(pool): State<PgPool>,
    Query(params): Query<MatchRangeParams>,
) -> Result<impl IntoResponse, AppError> {
    if let (Some(start), Some(end)) = (params.start_date, params.end_date) {
        if start > end {
            return Err(AppError::BadRequest(
                "start_date must not be after end_date".to_string(),
            ));
        }
    }

    let matches = sqlx::query_as::<_, Match>(&format!(
        r#"
        SELECT {}
        FROM matches
        WHERE ($1::TIMESTAMPTZ IS NULL OR match_date >= $1)
          AND ($2::TIMESTAMPTZ IS NULL OR match_date <= $2)
        ORDER BY match_date ASC
        "#,
        MATCH_COLUMNS
    ))
    .bind(params.start_date)
    .bind(params.end_date)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list matches: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(json!({ "success": true, "matches": matches })))
}

/// Matches that have not been played yet, soonest first.
pub async fn upcoming_matches(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let matches = sqlx::query_as::<_, Match>(&format!(
        r#"
        SELECT {}
        FROM matches
        WHERE status = 'upcoming' AND match_date > NOW()
        ORDER BY match_date ASC
        "#,
        MATCH_COLUMNS
    ))
    .fetch_all(&pool)
    .await?;

    Ok(Json(json!({ "success": true, "matches": matches })))
}

pub async fn week_matches(
    State(pool): State<PgPool>,
    Path(week): Path<i32>,
    Query(params): Query<WeekParams>,
) -> Result<impl IntoResponse, AppError> {
    let matches = sqlx::query_as::<_, Match>(&format!(
        r#"
        SELECT {}
        FROM matches
        WHERE match_week = $1 AND ($2::BIGINT IS NULL OR league_id = $2)
        ORDER BY match_date ASC
        "#,
        MATCH_COLUMNS
    ))
    .bind(week)
    .bind(params.league_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(json!({ "success": true, "week": week, "matches": matches })))
}
