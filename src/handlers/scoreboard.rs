// src/handlers/scoreboard.rs

use std::sync::Arc;

use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde_json::{Value, json};

use crate::{
    config::SCOREBOARD_LIMIT,
    error::AppError,
    models::{ledger::Bucket, user::Ranks},
    ranking::RankingService,
    utils::jwt::Claims,
};

async fn board(ranking: &RankingService, bucket: Bucket) -> Result<Value, AppError> {
    let standings = ranking.standings(bucket, SCOREBOARD_LIMIT).await.map_err(|e| {
        tracing::error!("Failed to load {:?} standings: {:?}", bucket, e);
        AppError::InternalServerError(e.to_string())
    })?;

    // Each line names its bucket column, e.g. `monthly_points`.
    let list: Vec<Value> = standings
        .into_iter()
        .map(|s| {
            json!({
                "user_id": s.user_id,
                "first_name": s.first_name,
                "last_name": s.last_name,
                (bucket.column()): s.points,
            })
        })
        .collect();

    Ok(json!({ "success": true, "list": list }))
}

/// Top players by points earned this month.
#[utoipa::path(
    get,
    path = "/api/scoreboard/monthly",
    tag = "scoreboard",
    responses((status = 200, description = "Monthly standings, top 30"))
)]
pub async fn monthly(
    State(ranking): State<Arc<RankingService>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(board(&ranking, Bucket::Monthly).await?))
}

/// Top players by points earned this season.
#[utoipa::path(
    get,
    path = "/api/scoreboard/seasonal",
    tag = "scoreboard",
    responses((status = 200, description = "Seasonal standings, top 30"))
)]
pub async fn seasonal(
    State(ranking): State<Arc<RankingService>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(board(&ranking, Bucket::Seasonal).await?))
}

pub(crate) async fn ranks_of(ranking: &RankingService, user_id: i64) -> Result<Ranks, AppError> {
    let monthly = ranking.rank(user_id, Bucket::Monthly).await?;
    let seasonal = ranking.rank(user_id, Bucket::Seasonal).await?;

    Ok(Ranks { monthly, seasonal })
}

/// The caller's position on both boards; `null` before their first points.
#[utoipa::path(
    get,
    path = "/api/scoreboard/my-rank",
    tag = "scoreboard",
    responses((status = 200, description = "`{ranks: {monthly, seasonal}}`"))
)]
pub async fn my_rank(
    State(ranking): State<Arc<RankingService>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let ranks = ranks_of(&ranking, claims.user_id()?).await?;

    Ok(Json(json!({ "success": true, "ranks": ranks })))
}
