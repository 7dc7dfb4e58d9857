// src/settlement/mod.rs

//! Settlement: turning finished matches and submitted quizzes into graded
//! outcomes and ledger credits.
//!
//! The engine never wraps a whole settlement in one transaction. Each grading
//! step is a claim on the store (see [`crate::store`]), so a failed or
//! concurrent run converges by simply running again.

use std::sync::Arc;

use thiserror::Error;

use crate::models::{
    ledger::{Credit, PointSource},
    settings::PointsConfig,
};
use crate::store::{
    LedgerStore, MatchRegistry, PredictionStore, QuizAttemptStore, SettingsStore, StoreError,
};

pub mod matches;
pub mod period;
pub mod quiz;

pub use matches::MatchSettlement;
pub use quiz::QuizSettlement;

use period::Period;

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Prediction closed: {0}")]
    PredictionClosed(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, SettlementError>;

pub struct SettlementEngine {
    matches: Arc<dyn MatchRegistry>,
    predictions: Arc<dyn PredictionStore>,
    attempts: Arc<dyn QuizAttemptStore>,
    ledger: Arc<dyn LedgerStore>,
    settings: Arc<dyn SettingsStore>,
}

impl SettlementEngine {
    pub fn new(
        matches: Arc<dyn MatchRegistry>,
        predictions: Arc<dyn PredictionStore>,
        attempts: Arc<dyn QuizAttemptStore>,
        ledger: Arc<dyn LedgerStore>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        Self { matches, predictions, attempts, ledger, settings }
    }

    /// Builds an engine whose every seam is served by one store.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: MatchRegistry + PredictionStore + QuizAttemptStore + LedgerStore + SettingsStore + 'static,
    {
        Self::new(store.clone(), store.clone(), store.clone(), store.clone(), store)
    }

    /// Point values in force right now. Read once per operation.
    async fn points(&self) -> Result<PointsConfig> {
        let settings = self.settings.settings().await?;
        Ok(PointsConfig::from_settings(&settings))
    }

    /// Credits `points` to a user unless there is nothing to credit.
    async fn credit(
        &self,
        user_id: i64,
        source: PointSource,
        points: i64,
        period: Period,
    ) -> Result<()> {
        if points <= 0 {
            return Ok(());
        }

        self.ledger
            .credit(&Credit { user_id, source, points, period })
            .await?;
        Ok(())
    }
}
