// src/store/postgres.rs

//! PostgreSQL implementation of the settlement seams.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};

use super::{
    LedgerStore, MatchRegistry, PredictionStore, QuizAttemptStore, SettingsStore, StoreError,
    StoreResult,
};
use crate::models::{
    ledger::{Bucket, Credit, LedgerBalance, PointSource, StandingEntry},
    matches::Match,
    prediction::{GradedPrediction, GuessOutcome, Outcome},
    quiz::{AttemptGrade, OptionLabel, QuizQuestion, WeekStatus},
};
use crate::settlement::period::QuizWeek;

const MATCH_COLUMNS: &str = "id, home_team, away_team, match_date, home_score, away_score, status, league_id, match_week";

const QUIZ_COLUMNS: &str =
    "q.id, q.question, q.option_a, q.option_b, q.option_c, q.option_d, q.correct_option, q.image_url";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct GradedRow {
    id: i64,
    user_id: i64,
    is_correct: Option<bool>,
}

#[derive(FromRow)]
struct UpsertRow {
    inserted: bool,
}

#[derive(FromRow)]
struct AnswerKeyRow {
    id: i64,
    correct_option: String,
}

#[derive(FromRow)]
struct WeekAttemptRow {
    quiz_id: i64,
    is_correct: Option<bool>,
}

#[derive(FromRow)]
struct ClaimedAttemptRow {
    quiz_id: i64,
    selected_option: Option<String>,
    is_correct: Option<bool>,
}

#[derive(FromRow)]
struct SettingRow {
    name: String,
    value: String,
}

/// Serializes a user's quiz assignment and submission within `tx`.
async fn lock_user(tx: &mut Transaction<'_, Postgres>, user_id: i64) -> StoreResult<()> {
    sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(())
}

#[async_trait]
impl MatchRegistry for PgStore {
    async fn find_match(&self, match_id: i64) -> StoreResult<Option<Match>> {
        let m = sqlx::query_as::<_, Match>(&format!(
            "SELECT {} FROM matches WHERE id = $1",
            MATCH_COLUMNS
        ))
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(m)
    }

    async fn record_final_score(
        &self,
        match_id: i64,
        home_score: i32,
        away_score: i32,
    ) -> StoreResult<Option<Match>> {
        let m = sqlx::query_as::<_, Match>(&format!(
            r#"
            UPDATE matches
            SET home_score = $2, away_score = $3, status = 'finished'
            WHERE id = $1
            RETURNING {}
            "#,
            MATCH_COLUMNS
        ))
        .bind(match_id)
        .bind(home_score)
        .bind(away_score)
        .fetch_optional(&self.pool)
        .await?;

        Ok(m)
    }

    async fn finished_matches(&self) -> StoreResult<Vec<Match>> {
        let matches = sqlx::query_as::<_, Match>(&format!(
            "SELECT {} FROM matches WHERE status = 'finished' ORDER BY match_date ASC",
            MATCH_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(matches)
    }
}

#[async_trait]
impl PredictionStore for PgStore {
    async fn upsert_guess(
        &self,
        user_id: i64,
        match_id: i64,
        guess: Outcome,
    ) -> StoreResult<GuessOutcome> {
        // xmax = 0 only for freshly inserted rows. A graded row matches the
        // conflict but not the WHERE, so nothing is returned for it.
        let row = sqlx::query_as::<_, UpsertRow>(
            r#"
            INSERT INTO predictions (user_id, match_id, predicted_result)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, match_id) DO UPDATE SET
                predicted_result = EXCLUDED.predicted_result,
                updated_at = NOW()
            WHERE predictions.is_correct IS NULL
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(user_id)
        .bind(match_id)
        .bind(guess.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some(UpsertRow { inserted: true }) => GuessOutcome::Created,
            Some(UpsertRow { inserted: false }) => GuessOutcome::Updated,
            None => GuessOutcome::Locked,
        })
    }

    async fn claim_and_grade(
        &self,
        match_id: i64,
        actual: Outcome,
    ) -> StoreResult<Vec<GradedPrediction>> {
        let rows = sqlx::query_as::<_, GradedRow>(
            r#"
            UPDATE predictions
            SET is_correct = (predicted_result = $2), updated_at = NOW()
            WHERE match_id = $1 AND is_correct IS NULL
            RETURNING id, user_id, is_correct
            "#,
        )
        .bind(match_id)
        .bind(actual.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| GradedPrediction {
                id: r.id,
                user_id: r.user_id,
                is_correct: r.is_correct.unwrap_or(false),
            })
            .collect())
    }
}

#[async_trait]
impl QuizAttemptStore for PgStore {
    async fn answer_keys(&self, question_ids: &[i64]) -> StoreResult<HashMap<i64, String>> {
        if question_ids.is_empty() {
            return Ok(HashMap::new());
        }

        // Use QueryBuilder for dynamic IN clause
        let mut query_builder =
            QueryBuilder::<Postgres>::new("SELECT id, correct_option FROM quizzes WHERE id IN (");

        let mut separated = query_builder.separated(",");
        for id in question_ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let rows: Vec<AnswerKeyRow> = query_builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|k| (k.id, k.correct_option)).collect())
    }

    async fn week_status(&self, user_id: i64, week: QuizWeek) -> StoreResult<WeekStatus> {
        let rows = sqlx::query_as::<_, WeekAttemptRow>(
            r#"
            SELECT quiz_id, is_correct
            FROM quiz_attempts
            WHERE user_id = $1 AND quiz_year = $2 AND quiz_week = $3
            ORDER BY id ASC
            "#,
        )
        .bind(user_id)
        .bind(week.year)
        .bind(week.week)
        .fetch_all(&self.pool)
        .await?;

        Ok(WeekStatus {
            graded: rows.iter().filter(|r| r.is_correct.is_some()).count(),
            assigned: rows.into_iter().map(|r| r.quiz_id).collect(),
        })
    }

    async fn assign_questions(
        &self,
        user_id: i64,
        week: QuizWeek,
        limit: usize,
    ) -> StoreResult<Vec<QuizQuestion>> {
        let mut tx = self.pool.begin().await?;
        lock_user(&mut tx, user_id).await?;

        let assigned: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM quiz_attempts WHERE user_id = $1 AND quiz_year = $2 AND quiz_week = $3",
        )
        .bind(user_id)
        .bind(week.year)
        .bind(week.week)
        .fetch_one(&mut *tx)
        .await?;

        let missing = (limit as i64 - assigned).max(0);
        if missing > 0 {
            sqlx::query(
                r#"
                INSERT INTO quiz_attempts (user_id, quiz_id, quiz_year, quiz_week)
                SELECT $1, q.id, $2, $3
                FROM quizzes q
                WHERE NOT EXISTS (
                    SELECT 1 FROM quiz_attempts a
                    WHERE a.user_id = $1 AND a.quiz_id = q.id
                      AND a.quiz_year = $2 AND a.quiz_week = $3
                )
                ORDER BY RANDOM()
                LIMIT $4
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(week.year)
            .bind(week.week)
            .bind(missing)
            .execute(&mut *tx)
            .await?;
        }

        let questions = sqlx::query_as::<_, QuizQuestion>(&format!(
            r#"
            SELECT {}
            FROM quiz_attempts a
            JOIN quizzes q ON q.id = a.quiz_id
            WHERE a.user_id = $1 AND a.quiz_year = $2 AND a.quiz_week = $3
            ORDER BY a.id ASC
            "#,
            QUIZ_COLUMNS
        ))
        .bind(user_id)
        .bind(week.year)
        .bind(week.week)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(questions)
    }

    async fn claim_and_grade(
        &self,
        user_id: i64,
        week: QuizWeek,
        grades: &[AttemptGrade],
    ) -> StoreResult<Vec<AttemptGrade>> {
        if grades.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = grades.iter().map(|g| g.question_id).collect();
        let selected: Vec<String> = grades.iter().map(|g| g.selected.as_str().to_string()).collect();
        let correct: Vec<bool> = grades.iter().map(|g| g.is_correct).collect();

        let mut tx = self.pool.begin().await?;
        lock_user(&mut tx, user_id).await?;

        // One graded batch per week: a concurrent submit that got here first wins.
        let graded: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM quiz_attempts
            WHERE user_id = $1 AND quiz_year = $2 AND quiz_week = $3 AND is_correct IS NOT NULL
            "#,
        )
        .bind(user_id)
        .bind(week.year)
        .bind(week.week)
        .fetch_one(&mut *tx)
        .await?;

        if graded > 0 {
            tx.rollback().await?;
            return Ok(Vec::new());
        }

        // Inserts unassigned attempts, fills assigned ones, and skips graded ones:
        // a conflicting row failing the WHERE is neither updated nor returned.
        let rows = sqlx::query_as::<_, ClaimedAttemptRow>(
            r#"
            INSERT INTO quiz_attempts
                (user_id, quiz_id, quiz_year, quiz_week, selected_option, is_correct, answered_at)
            SELECT $1, a.quiz_id, $2, $3, a.selected_option, a.is_correct, NOW()
            FROM UNNEST($4::BIGINT[], $5::TEXT[], $6::BOOLEAN[])
                AS a(quiz_id, selected_option, is_correct)
            ON CONFLICT (user_id, quiz_id, quiz_year, quiz_week) DO UPDATE SET
                selected_option = EXCLUDED.selected_option,
                is_correct = EXCLUDED.is_correct,
                answered_at = EXCLUDED.answered_at
            WHERE quiz_attempts.is_correct IS NULL
            RETURNING quiz_id, selected_option, is_correct
            "#,
        )
        .bind(user_id)
        .bind(week.year)
        .bind(week.week)
        .bind(&ids)
        .bind(&selected)
        .bind(&correct)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        rows.into_iter()
            .map(|r| {
                let selected = r
                    .selected_option
                    .as_deref()
                    .unwrap_or_default()
                    .parse::<OptionLabel>()
                    .map_err(StoreError::Corrupt)?;
                Ok(AttemptGrade {
                    question_id: r.quiz_id,
                    selected,
                    is_correct: r.is_correct.unwrap_or(false),
                })
            })
            .collect()
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn credit(&self, credit: &Credit) -> StoreResult<()> {
        let (prediction_points, quiz_points) = match credit.source {
            PointSource::Prediction => (credit.points, 0),
            PointSource::Quiz => (0, credit.points),
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO user_scores
                (user_id, monthly_points, seasonal_points, prediction_points, quiz_points, total_points)
            VALUES ($1, $2, $2, $3, $4, $2)
            ON CONFLICT (user_id) DO UPDATE SET
                monthly_points = user_scores.monthly_points + EXCLUDED.monthly_points,
                seasonal_points = user_scores.seasonal_points + EXCLUDED.seasonal_points,
                prediction_points = user_scores.prediction_points + EXCLUDED.prediction_points,
                quiz_points = user_scores.quiz_points + EXCLUDED.quiz_points,
                total_points = user_scores.total_points + EXCLUDED.total_points,
                updated_at = NOW()
            "#,
        )
        .bind(credit.user_id)
        .bind(credit.points)
        .bind(prediction_points)
        .bind(quiz_points)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO user_score_history (user_id, source, points, month, year, season_year)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(credit.user_id)
        .bind(credit.source.as_str())
        .bind(credit.points)
        .bind(credit.period.month)
        .bind(credit.period.year)
        .bind(credit.period.season_year)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn balance(&self, user_id: i64) -> StoreResult<Option<LedgerBalance>> {
        let balance = sqlx::query_as::<_, LedgerBalance>(
            r#"
            SELECT user_id, monthly_points, seasonal_points, quiz_points, prediction_points, total_points
            FROM user_scores
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(balance)
    }

    async fn bucket_points(&self, bucket: Bucket) -> StoreResult<Vec<(i64, i64)>> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(&format!(
            "SELECT user_id, {} FROM user_scores",
            bucket.column()
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn standings(&self, bucket: Bucket, limit: i64) -> StoreResult<Vec<StandingEntry>> {
        let column = bucket.column();
        let rows = sqlx::query_as::<_, StandingEntry>(&format!(
            r#"
            SELECT u.id AS user_id, u.first_name, u.last_name, s.{column} AS points
            FROM user_scores s
            JOIN users u ON u.id = s.user_id
            ORDER BY s.{column} DESC, s.user_id ASC
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[async_trait]
impl SettingsStore for PgStore {
    async fn settings(&self) -> StoreResult<HashMap<String, String>> {
        let rows = sqlx::query_as::<_, SettingRow>("SELECT name, value FROM system_settings")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|r| (r.name, r.value)).collect())
    }
}
