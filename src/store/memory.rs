// src/store/memory.rs

//! In-process store backing every settlement seam with plain collections.
//!
//! Each trait method takes the lock once, so every claim is atomic with
//! respect to other callers, the same guarantee the Postgres statements give.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{
    LedgerStore, MatchRegistry, PredictionStore, QuizAttemptStore, SettingsStore, StoreResult,
};
use crate::models::{
    ledger::{Bucket, Credit, HistoryEntry, LedgerBalance, StandingEntry},
    matches::{Match, STATUS_FINISHED, STATUS_UPCOMING},
    prediction::{GradedPrediction, GuessOutcome, Outcome, Prediction},
    quiz::{AttemptGrade, OptionLabel, QuizQuestion, WeekStatus},
};
use crate::settlement::period::QuizWeek;

type AttemptKey = (i64, i64, i32, i32);

/// A quiz attempt as held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryAttempt {
    pub question_id: i64,
    pub week: i32,
    pub selected: Option<OptionLabel>,
    pub is_correct: Option<bool>,
}

#[derive(Default)]
struct State {
    matches: BTreeMap<i64, Match>,
    predictions: BTreeMap<(i64, i64), Prediction>,
    next_prediction_id: i64,
    questions: BTreeMap<i64, QuizQuestion>,
    // (user_id, question_id, iso year, iso week)
    attempts: BTreeMap<AttemptKey, MemoryAttempt>,
    balances: BTreeMap<i64, LedgerBalance>,
    history: Vec<HistoryEntry>,
    settings: HashMap<String, String>,
    names: HashMap<i64, (String, String)>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_setting(&self, name: &str, value: &str) {
        self.lock().settings.insert(name.to_string(), value.to_string());
    }

    pub fn set_user_name(&self, user_id: i64, first_name: &str, last_name: &str) {
        self.lock()
            .names
            .insert(user_id, (first_name.to_string(), last_name.to_string()));
    }

    pub fn insert_match_with_id(
        &self,
        id: i64,
        home_team: &str,
        away_team: &str,
        match_date: DateTime<Utc>,
    ) {
        self.lock().matches.insert(
            id,
            Match {
                id,
                home_team: home_team.to_string(),
                away_team: away_team.to_string(),
                match_date,
                home_score: None,
                away_score: None,
                status: STATUS_UPCOMING.to_string(),
                league_id: None,
                match_week: None,
            },
        );
    }

    /// Inserts an ungraded prediction directly, bypassing the kickoff check.
    pub fn insert_prediction(&self, user_id: i64, match_id: i64, guess: Outcome) {
        let mut state = self.lock();
        state.next_prediction_id += 1;
        let id = state.next_prediction_id;
        state.predictions.insert(
            (user_id, match_id),
            Prediction {
                id,
                user_id,
                match_id,
                predicted_result: guess,
                is_correct: None,
                updated_at: Utc::now(),
            },
        );
    }

    pub fn insert_question(&self, id: i64, correct_option: &str) {
        self.lock().questions.insert(
            id,
            QuizQuestion {
                id,
                question: format!("Question {}", id),
                option_a: "Option A".to_string(),
                option_b: "Option B".to_string(),
                option_c: "Option C".to_string(),
                option_d: "Option D".to_string(),
                correct_option: correct_option.to_string(),
                image_url: None,
            },
        );
    }

    pub fn match_by_id(&self, id: i64) -> Option<Match> {
        self.lock().matches.get(&id).cloned()
    }

    pub fn prediction(&self, user_id: i64, match_id: i64) -> Option<Prediction> {
        self.lock().predictions.get(&(user_id, match_id)).cloned()
    }

    pub fn balance_of(&self, user_id: i64) -> Option<LedgerBalance> {
        self.lock().balances.get(&user_id).cloned()
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.lock().history.clone()
    }

    pub fn attempts_of(&self, user_id: i64) -> Vec<MemoryAttempt> {
        self.lock()
            .attempts
            .iter()
            .filter(|((user, ..), _)| *user == user_id)
            .map(|(_, attempt)| attempt.clone())
            .collect()
    }
}

fn week_attempts(state: &State, user_id: i64, week: QuizWeek) -> Vec<&MemoryAttempt> {
    state
        .attempts
        .iter()
        .filter(|((user, _, year, wk), _)| *user == user_id && *year == week.year && *wk == week.week)
        .map(|(_, attempt)| attempt)
        .collect()
}

#[async_trait]
impl MatchRegistry for MemoryStore {
    async fn find_match(&self, match_id: i64) -> StoreResult<Option<Match>> {
        Ok(self.match_by_id(match_id))
    }

    async fn record_final_score(
        &self,
        match_id: i64,
        home_score: i32,
        away_score: i32,
    ) -> StoreResult<Option<Match>> {
        let mut state = self.lock();
        Ok(state.matches.get_mut(&match_id).map(|m| {
            m.home_score = Some(home_score);
            m.away_score = Some(away_score);
            m.status = STATUS_FINISHED.to_string();
            m.clone()
        }))
    }

    async fn finished_matches(&self) -> StoreResult<Vec<Match>> {
        Ok(self
            .lock()
            .matches
            .values()
            .filter(|m| m.is_finished())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PredictionStore for MemoryStore {
    async fn upsert_guess(
        &self,
        user_id: i64,
        match_id: i64,
        guess: Outcome,
    ) -> StoreResult<GuessOutcome> {
        let mut state = self.lock();

        if let Some(existing) = state.predictions.get_mut(&(user_id, match_id)) {
            if existing.is_correct.is_some() {
                return Ok(GuessOutcome::Locked);
            }
            existing.predicted_result = guess;
            existing.updated_at = Utc::now();
            return Ok(GuessOutcome::Updated);
        }

        state.next_prediction_id += 1;
        let id = state.next_prediction_id;
        state.predictions.insert(
            (user_id, match_id),
            Prediction {
                id,
                user_id,
                match_id,
                predicted_result: guess,
                is_correct: None,
                updated_at: Utc::now(),
            },
        );
        Ok(GuessOutcome::Created)
    }

    async fn claim_and_grade(
        &self,
        match_id: i64,
        actual: Outcome,
    ) -> StoreResult<Vec<GradedPrediction>> {
        let mut state = self.lock();

        Ok(state
            .predictions
            .values_mut()
            .filter(|p| p.match_id == match_id && p.is_correct.is_none())
            .map(|p| {
                let is_correct = p.predicted_result == actual;
                p.is_correct = Some(is_correct);
                GradedPrediction { id: p.id, user_id: p.user_id, is_correct }
            })
            .collect())
    }
}

#[async_trait]
impl QuizAttemptStore for MemoryStore {
    async fn answer_keys(&self, question_ids: &[i64]) -> StoreResult<HashMap<i64, String>> {
        let state = self.lock();
        Ok(question_ids
            .iter()
            .filter_map(|id| state.questions.get(id).map(|q| (*id, q.correct_option.clone())))
            .collect())
    }

    async fn week_status(&self, user_id: i64, week: QuizWeek) -> StoreResult<WeekStatus> {
        let state = self.lock();
        let attempts = week_attempts(&state, user_id, week);

        Ok(WeekStatus {
            assigned: attempts.iter().map(|a| a.question_id).collect(),
            graded: attempts.iter().filter(|a| a.is_correct.is_some()).count(),
        })
    }

    async fn assign_questions(
        &self,
        user_id: i64,
        week: QuizWeek,
        limit: usize,
    ) -> StoreResult<Vec<QuizQuestion>> {
        let mut state = self.lock();

        let mut assigned: Vec<i64> = week_attempts(&state, user_id, week)
            .iter()
            .map(|a| a.question_id)
            .collect();

        let fresh: Vec<i64> = state
            .questions
            .keys()
            .filter(|id| !assigned.contains(id))
            .take(limit.saturating_sub(assigned.len()))
            .copied()
            .collect();

        for question_id in fresh {
            state.attempts.insert(
                (user_id, question_id, week.year, week.week),
                MemoryAttempt { question_id, week: week.week, ..Default::default() },
            );
            assigned.push(question_id);
        }

        Ok(assigned
            .iter()
            .filter_map(|id| state.questions.get(id).cloned())
            .collect())
    }

    async fn claim_and_grade(
        &self,
        user_id: i64,
        week: QuizWeek,
        grades: &[AttemptGrade],
    ) -> StoreResult<Vec<AttemptGrade>> {
        let mut state = self.lock();
        let mut claimed = Vec::new();

        if week_attempts(&state, user_id, week).iter().any(|a| a.is_correct.is_some()) {
            return Ok(claimed);
        }

        for grade in grades {
            let attempt = state
                .attempts
                .entry((user_id, grade.question_id, week.year, week.week))
                .or_insert_with(|| MemoryAttempt {
                    question_id: grade.question_id,
                    week: week.week,
                    ..Default::default()
                });

            if attempt.is_correct.is_some() {
                continue;
            }
            attempt.selected = Some(grade.selected);
            attempt.is_correct = Some(grade.is_correct);
            claimed.push(grade.clone());
        }

        Ok(claimed)
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn credit(&self, credit: &Credit) -> StoreResult<()> {
        let mut state = self.lock();
        state
            .balances
            .entry(credit.user_id)
            .or_insert_with(|| LedgerBalance::empty(credit.user_id))
            .apply(credit);
        state.history.push(HistoryEntry::from(credit));
        Ok(())
    }

    async fn balance(&self, user_id: i64) -> StoreResult<Option<LedgerBalance>> {
        Ok(self.balance_of(user_id))
    }

    async fn bucket_points(&self, bucket: Bucket) -> StoreResult<Vec<(i64, i64)>> {
        Ok(self
            .lock()
            .balances
            .values()
            .map(|b| (b.user_id, b.points(bucket)))
            .collect())
    }

    async fn standings(&self, bucket: Bucket, limit: i64) -> StoreResult<Vec<StandingEntry>> {
        let state = self.lock();

        let mut rows: Vec<&LedgerBalance> = state.balances.values().collect();
        rows.sort_by(|a, b| {
            b.points(bucket)
                .cmp(&a.points(bucket))
                .then(a.user_id.cmp(&b.user_id))
        });

        Ok(rows
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(0))
            .map(|b| {
                let (first_name, last_name) =
                    state.names.get(&b.user_id).cloned().unwrap_or_default();
                StandingEntry {
                    user_id: b.user_id,
                    first_name,
                    last_name,
                    points: b.points(bucket),
                }
            })
            .collect())
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn settings(&self) -> StoreResult<HashMap<String, String>> {
        Ok(self.lock().settings.clone())
    }
}
