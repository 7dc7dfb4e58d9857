// src/store/mod.rs

//! Storage seams used by the settlement engine and the ranking service.
//!
//! Every grading write is a *claim*: a conditional write that only touches
//! rows still ungraded and reports back the rows it actually changed. Callers
//! credit points for the returned rows only, which makes settlement safe to
//! retry and safe under concurrent callers.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    ledger::{Bucket, Credit, LedgerBalance, StandingEntry},
    matches::Match,
    prediction::{GradedPrediction, GuessOutcome, Outcome},
    quiz::{AttemptGrade, QuizQuestion, WeekStatus},
};
use crate::settlement::period::QuizWeek;

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait MatchRegistry: Send + Sync {
    async fn find_match(&self, match_id: i64) -> StoreResult<Option<Match>>;

    /// Writes the final score and marks the match finished.
    /// Returns `None` when the match does not exist.
    async fn record_final_score(
        &self,
        match_id: i64,
        home_score: i32,
        away_score: i32,
    ) -> StoreResult<Option<Match>>;

    async fn finished_matches(&self) -> StoreResult<Vec<Match>>;
}

#[async_trait]
pub trait PredictionStore: Send + Sync {
    /// Creates or overwrites a user's guess. Graded predictions are never touched.
    async fn upsert_guess(
        &self,
        user_id: i64,
        match_id: i64,
        guess: Outcome,
    ) -> StoreResult<GuessOutcome>;

    /// Grades every still-ungraded prediction of the match against `actual`
    /// and returns exactly the predictions graded by this call.
    async fn claim_and_grade(
        &self,
        match_id: i64,
        actual: Outcome,
    ) -> StoreResult<Vec<GradedPrediction>>;
}

#[async_trait]
pub trait QuizAttemptStore: Send + Sync {
    /// Correct option per question id, for the ids that exist.
    async fn answer_keys(&self, question_ids: &[i64]) -> StoreResult<HashMap<i64, String>>;

    async fn week_status(&self, user_id: i64, week: QuizWeek) -> StoreResult<WeekStatus>;

    /// Returns the user's assignment for the week, topping it up with random
    /// questions not yet attempted this week until it holds `limit` questions.
    async fn assign_questions(
        &self,
        user_id: i64,
        week: QuizWeek,
        limit: usize,
    ) -> StoreResult<Vec<QuizQuestion>>;

    /// Records each answer on its (user, question, week) attempt and returns
    /// the grades actually written. Writes nothing once any attempt of the
    /// user's week is graded, so a week is graded as a single batch.
    async fn claim_and_grade(
        &self,
        user_id: i64,
        week: QuizWeek,
        grades: &[AttemptGrade],
    ) -> StoreResult<Vec<AttemptGrade>>;
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Adds the credit to the user's counters and appends its history row.
    async fn credit(&self, credit: &Credit) -> StoreResult<()>;

    async fn balance(&self, user_id: i64) -> StoreResult<Option<LedgerBalance>>;

    /// `(user_id, points)` for every ledger row, in no particular order.
    async fn bucket_points(&self, bucket: Bucket) -> StoreResult<Vec<(i64, i64)>>;

    /// Top `limit` users by bucket; ties go to the lower user id.
    async fn standings(&self, bucket: Bucket, limit: i64) -> StoreResult<Vec<StandingEntry>>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn settings(&self) -> StoreResult<HashMap<String, String>>;
}
