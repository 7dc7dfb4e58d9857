// src/routes.rs

use axum::{
    Json, Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;

use crate::{
    handlers::{admin, auth, matches, predictions, profile, quiz, scoreboard},
    models::{
        matches::{FinishMatchRequest, FinishMatchResponse},
        prediction::{Outcome, SubmitPredictionRequest},
        quiz::{OptionLabel, PublicQuizQuestion, QuizAnswer, QuizSubmitResponse, SubmitQuizRequest},
    },
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        admin::finish_match,
        admin::settle_finished,
        predictions::submit_prediction,
        quiz::quiz_status,
        quiz::available_quiz,
        quiz::submit_quiz,
        scoreboard::monthly,
        scoreboard::seasonal,
        scoreboard::my_rank,
    ),
    components(schemas(
        FinishMatchRequest,
        FinishMatchResponse,
        Outcome,
        SubmitPredictionRequest,
        OptionLabel,
        PublicQuizQuestion,
        QuizAnswer,
        SubmitQuizRequest,
        QuizSubmitResponse,
    )),
    tags(
        (name = "settlement", description = "Match settlement (admin)"),
        (name = "predictions", description = "Match outcome predictions"),
        (name = "quiz", description = "Weekly trivia quiz"),
        (name = "scoreboard", description = "Monthly and seasonal standings")
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Assembles the main application router.
///
/// * Public routes: auth, matches, scoreboards, OpenAPI document.
/// * User routes behind `auth_middleware`.
/// * Admin routes behind `auth_middleware` then `admin_middleware`.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_layer = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let match_routes = Router::new()
        .route("/", get(matches::list_matches))
        .route("/upcoming", get(matches::upcoming_matches))
        .route("/week/{week}", get(matches::week_matches));

    let prediction_routes = Router::new()
        .route("/", post(predictions::submit_prediction))
        .route("/me", get(predictions::my_predictions))
        .layer(auth_layer.clone());

    let quiz_routes = Router::new()
        .route("/status", get(quiz::quiz_status))
        .route("/available", get(quiz::available_quiz))
        .route("/submit", post(quiz::submit_quiz))
        .layer(auth_layer.clone());

    let scoreboard_routes = Router::new()
        .route("/monthly", get(scoreboard::monthly))
        .route("/seasonal", get(scoreboard::seasonal))
        // Protected scoreboard routes
        .merge(
            Router::new()
                .route("/my-rank", get(scoreboard::my_rank))
                .layer(auth_layer.clone()),
        );

    let profile_routes = Router::new()
        .route("/me", get(profile::get_me))
        .route("/change-password", put(profile::change_password))
        .layer(auth_layer.clone());

    let admin_routes = Router::new()
        .route("/matches", post(admin::create_match))
        .route("/finish-match", post(admin::finish_match))
        .route("/settle-finished", post(admin::settle_finished))
        .route("/settings", get(admin::list_settings))
        .route("/points", put(admin::update_points))
        .route("/quiz", get(admin::list_quiz).post(admin::create_quiz))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(auth_layer);

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/matches", match_routes)
        .nest("/api/predictions", prediction_routes)
        .nest("/api/quiz", quiz_routes)
        .nest("/api/scoreboard", scoreboard_routes)
        .nest("/api/profile", profile_routes)
        .nest("/api/admin", admin_routes)
        .route("/api-docs/openapi.json", get(openapi_json))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
