// src/settlement/matches.rs

use chrono::{DateTime, Utc};

use super::{Result, SettlementEngine, SettlementError, period::Period};
use crate::models::{
    ledger::PointSource,
    prediction::{GuessOutcome, Outcome},
};

/// Summary of one grading pass over a match's predictions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSettlement {
    pub match_id: i64,
    pub outcome: Outcome,
    /// Predictions graded by this pass.
    pub graded: usize,
    /// Of those, how many guessed right.
    pub winners: usize,
    /// Points credited to each winner.
    pub points_per_winner: i64,
}

impl SettlementEngine {
    /// Records the final score of a match and settles its predictions.
    ///
    /// Calling this again for a finished match rewrites the score and grades
    /// only predictions that are still ungraded.
    pub async fn finish_match(
        &self,
        match_id: i64,
        home_score: i32,
        away_score: i32,
        at: DateTime<Utc>,
    ) -> Result<MatchSettlement> {
        if home_score < 0 || away_score < 0 {
            return Err(SettlementError::InvalidInput(
                "Scores must be non-negative".to_string(),
            ));
        }

        self.matches
            .record_final_score(match_id, home_score, away_score)
            .await?
            .ok_or_else(|| SettlementError::NotFound(format!("Match {} not found", match_id)))?;

        let outcome = Outcome::from_score(home_score, away_score);
        let settlement = self.grade_predictions(match_id, outcome, at).await?;

        tracing::info!(
            match_id,
            outcome = %outcome,
            graded = settlement.graded,
            winners = settlement.winners,
            "Match settled"
        );

        Ok(settlement)
    }

    /// Re-runs prediction grading for every finished match.
    ///
    /// Picks up predictions left ungraded by an interrupted settlement.
    pub async fn settle_finished_matches(&self, at: DateTime<Utc>) -> Result<Vec<MatchSettlement>> {
        let finished = self.matches.finished_matches().await?;
        let mut settled = Vec::new();

        for m in finished {
            let Some((home, away)) = m.final_score() else {
                tracing::warn!(match_id = m.id, "Finished match has no score, skipping");
                continue;
            };

            let settlement = self
                .grade_predictions(m.id, Outcome::from_score(home, away), at)
                .await?;
            if settlement.graded > 0 {
                settled.push(settlement);
            }
        }

        tracing::info!(matches = settled.len(), "Finished matches re-settled");
        Ok(settled)
    }

    /// Stores a user's guess for a match that has not kicked off yet.
    pub async fn submit_prediction(
        &self,
        user_id: i64,
        match_id: i64,
        guess: Outcome,
        at: DateTime<Utc>,
    ) -> Result<GuessOutcome> {
        let m = self
            .matches
            .find_match(match_id)
            .await?
            .ok_or_else(|| SettlementError::NotFound(format!("Match {} not found", match_id)))?;

        if m.is_finished() || at >= m.match_date {
            return Err(SettlementError::PredictionClosed(
                "The match has started, predictions can no longer be made or changed".to_string(),
            ));
        }

        match self.predictions.upsert_guess(user_id, match_id, guess).await? {
            GuessOutcome::Locked => Err(SettlementError::PredictionClosed(
                "This prediction has already been graded".to_string(),
            )),
            stored => Ok(stored),
        }
    }

    async fn grade_predictions(
        &self,
        match_id: i64,
        outcome: Outcome,
        at: DateTime<Utc>,
    ) -> Result<MatchSettlement> {
        // Read before claiming: a claimed row is never handed out again.
        let points = self.points().await?.correct_prediction;
        let graded = self.predictions.claim_and_grade(match_id, outcome).await?;
        let period = Period::at(at);

        let mut winners = 0;
        for prediction in graded.iter().filter(|p| p.is_correct) {
            self.credit(prediction.user_id, PointSource::Prediction, points, period)
                .await?;
            winners += 1;
        }

        Ok(MatchSettlement {
            match_id,
            outcome,
            graded: graded.len(),
            winners,
            points_per_winner: points,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::models::ledger::HistoryEntry;
    use crate::models::settings::CORRECT_PREDICTION_POINT;
    use crate::store::memory::MemoryStore;
    use crate::store::{SettingsStore, StoreError, StoreResult};

    /// Settings that fail on the first read, then serve the wrapped store.
    struct FlakySettings {
        inner: Arc<MemoryStore>,
        failed: AtomicBool,
    }

    #[async_trait]
    impl SettingsStore for FlakySettings {
        async fn settings(&self) -> StoreResult<HashMap<String, String>> {
            if !self.failed.swap(true, Ordering::SeqCst) {
                return Err(StoreError::Corrupt("settings unavailable".to_string()));
            }
            self.inner.settings().await
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 4, 18, 0, 0).unwrap()
    }

    fn setup(points: &str) -> (Arc<MemoryStore>, SettlementEngine) {
        let store = Arc::new(MemoryStore::new());
        store.set_setting(CORRECT_PREDICTION_POINT, points);
        let engine = SettlementEngine::from_store(store.clone());
        (store, engine)
    }

    #[tokio::test]
    async fn finish_match_grades_and_credits_winners() {
        let (store, engine) = setup("10");
        store.insert_match_with_id(7, "Home", "Away", now() + Duration::hours(1));
        store.insert_prediction(5, 7, Outcome::Home);

        let settlement = engine.finish_match(7, 2, 0, now() + Duration::hours(3)).await.unwrap();

        assert_eq!(settlement.outcome, Outcome::Home);
        assert_eq!(settlement.graded, 1);
        assert_eq!(settlement.winners, 1);

        let prediction = store.prediction(5, 7).unwrap();
        assert_eq!(prediction.is_correct, Some(true));

        let balance = store.balance_of(5).unwrap();
        assert_eq!(balance.prediction_points, 10);
        assert_eq!(balance.monthly_points, 10);
        assert_eq!(balance.seasonal_points, 10);

        let history = store.history();
        assert_eq!(history.len(), 1);
        assert_eq!(
            history[0],
            HistoryEntry {
                user_id: 5,
                source: PointSource::Prediction,
                points: 10,
                month: 10,
                year: 2025,
                season_year: 2025,
            }
        );
    }

    #[tokio::test]
    async fn finish_match_twice_never_double_credits() {
        let (store, engine) = setup("10");
        store.insert_match_with_id(1, "Home", "Away", now());
        store.insert_prediction(1, 1, Outcome::Draw);
        store.insert_prediction(2, 1, Outcome::Away);

        let first = engine.finish_match(1, 1, 1, now()).await.unwrap();
        assert_eq!(first.graded, 2);
        assert_eq!(first.winners, 1);

        let second = engine.finish_match(1, 1, 1, now()).await.unwrap();
        assert_eq!(second.graded, 0);
        assert_eq!(second.winners, 0);

        assert_eq!(store.balance_of(1).unwrap().total_points, 10);
        assert!(store.balance_of(2).is_none());
        assert_eq!(store.history().len(), 1);
    }

    #[tokio::test]
    async fn grading_follows_derived_outcome() {
        let (store, engine) = setup("3");
        let cases = [(10, 2, 1, Outcome::Home), (11, 1, 1, Outcome::Draw), (12, 0, 3, Outcome::Away)];

        for (match_id, home, away, expected) in cases {
            store.insert_match_with_id(match_id, "H", "A", now());
            store.insert_prediction(1, match_id, Outcome::Home);
            store.insert_prediction(2, match_id, Outcome::Draw);
            store.insert_prediction(3, match_id, Outcome::Away);

            let settlement = engine.finish_match(match_id, home, away, now()).await.unwrap();
            assert_eq!(settlement.outcome, expected);

            for (user_id, guess) in [(1, Outcome::Home), (2, Outcome::Draw), (3, Outcome::Away)] {
                let p = store.prediction(user_id, match_id).unwrap();
                assert_eq!(p.is_correct, Some(guess == expected), "match {} user {}", match_id, user_id);
            }
        }
    }

    #[tokio::test]
    async fn finish_match_rejects_bad_input() {
        let (store, engine) = setup("10");
        store.insert_match_with_id(1, "Home", "Away", now());

        let negative = engine.finish_match(1, -1, 0, now()).await;
        assert!(matches!(negative, Err(SettlementError::InvalidInput(_))));
        assert!(!store.match_by_id(1).unwrap().is_finished());

        let missing = engine.finish_match(99, 1, 0, now()).await;
        assert!(matches!(missing, Err(SettlementError::NotFound(_))));
    }

    #[tokio::test]
    async fn late_predictions_are_graded_on_resettle() {
        let (store, engine) = setup("4");
        store.insert_match_with_id(1, "Home", "Away", now());

        engine.finish_match(1, 3, 1, now()).await.unwrap();

        // A prediction that slipped in ungraded (e.g. after an interrupted run).
        store.insert_prediction(8, 1, Outcome::Home);

        let settled = engine.settle_finished_matches(now()).await.unwrap();
        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].winners, 1);
        assert_eq!(store.balance_of(8).unwrap().prediction_points, 4);

        let again = engine.settle_finished_matches(now()).await.unwrap();
        assert!(again.is_empty());
        assert_eq!(store.balance_of(8).unwrap().prediction_points, 4);
    }

    #[tokio::test]
    async fn zero_points_grade_without_crediting() {
        let (store, engine) = setup("not a number");
        store.insert_match_with_id(1, "Home", "Away", now());
        store.insert_prediction(1, 1, Outcome::Away);

        let settlement = engine.finish_match(1, 0, 1, now()).await.unwrap();
        assert_eq!(settlement.winners, 1);
        assert_eq!(settlement.points_per_winner, 0);
        assert!(store.balance_of(1).is_none());
        assert!(store.history().is_empty());
    }

    #[tokio::test]
    async fn settings_failure_leaves_predictions_ungraded() {
        let store = Arc::new(MemoryStore::new());
        store.set_setting(CORRECT_PREDICTION_POINT, "10");
        let settings = Arc::new(FlakySettings { inner: store.clone(), failed: AtomicBool::new(false) });
        let engine = SettlementEngine::new(store.clone(), store.clone(), store.clone(), store.clone(), settings);
        store.insert_match_with_id(7, "Home", "Away", now());
        store.insert_prediction(5, 7, Outcome::Home);

        let failed = engine.finish_match(7, 2, 0, now()).await;
        assert!(matches!(failed, Err(SettlementError::Store(_))));
        assert_eq!(store.prediction(5, 7).unwrap().is_correct, None);
        assert!(store.balance_of(5).is_none());

        let retried = engine.finish_match(7, 2, 0, now()).await.unwrap();
        assert_eq!(retried.graded, 1);
        assert_eq!(retried.winners, 1);
        assert_eq!(store.balance_of(5).unwrap().prediction_points, 10);
        assert_eq!(store.history().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_finish_grades_each_prediction_once() {
        let (store, engine) = setup("10");
        let engine = Arc::new(engine);
        store.insert_match_with_id(3, "Home", "Away", now());
        for user_id in 1..=20 {
            let guess = if user_id % 2 == 0 { Outcome::Home } else { Outcome::Away };
            store.insert_prediction(user_id, 3, guess);
        }

        let runs: Vec<_> = (0..4)
            .map(|_| {
                let engine = engine.clone();
                tokio::spawn(async move { engine.finish_match(3, 1, 0, now()).await })
            })
            .collect();

        let mut graded = 0;
        let mut winners = 0;
        for run in runs {
            let settlement = run.await.unwrap().unwrap();
            graded += settlement.graded;
            winners += settlement.winners;
        }

        assert_eq!(graded, 20);
        assert_eq!(winners, 10);
        assert_eq!(store.history().len(), 10);
        for user_id in (2..=20).step_by(2) {
            assert_eq!(store.balance_of(user_id).unwrap().prediction_points, 10);
        }
    }

    #[tokio::test]
    async fn predictions_close_at_kickoff() {
        let (store, engine) = setup("10");
        let kickoff = now();
        store.insert_match_with_id(1, "Home", "Away", kickoff);

        let early = engine
            .submit_prediction(3, 1, Outcome::Draw, kickoff - Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(early, GuessOutcome::Created);

        let changed = engine
            .submit_prediction(3, 1, Outcome::Away, kickoff - Duration::minutes(1))
            .await
            .unwrap();
        assert_eq!(changed, GuessOutcome::Updated);
        assert_eq!(store.prediction(3, 1).unwrap().predicted_result, Outcome::Away);

        let late = engine.submit_prediction(3, 1, Outcome::Home, kickoff).await;
        assert!(matches!(late, Err(SettlementError::PredictionClosed(_))));

        let unknown = engine
            .submit_prediction(3, 42, Outcome::Home, kickoff - Duration::hours(1))
            .await;
        assert!(matches!(unknown, Err(SettlementError::NotFound(_))));
    }
}
