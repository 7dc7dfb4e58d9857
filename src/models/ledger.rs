// src/models/ledger.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::settlement::period::Period;

/// What earned the points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointSource {
    Prediction,
    Quiz,
}

impl PointSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointSource::Prediction => "prediction",
            PointSource::Quiz => "quiz",
        }
    }
}

/// A single additive credit to a user's ledger.
///
/// Applying a credit bumps the source bucket, the monthly, seasonal and total
/// counters, and appends one history row for `period`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credit {
    pub user_id: i64,
    pub source: PointSource,
    pub points: i64,
    pub period: Period,
}

/// Represents the 'user_scores' table in the database.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize)]
pub struct LedgerBalance {
    pub user_id: i64,
    pub monthly_points: i64,
    pub seasonal_points: i64,
    pub quiz_points: i64,
    pub prediction_points: i64,
    pub total_points: i64,
}

impl LedgerBalance {
    pub fn empty(user_id: i64) -> Self {
        Self { user_id, ..Default::default() }
    }

    pub fn apply(&mut self, credit: &Credit) {
        self.monthly_points += credit.points;
        self.seasonal_points += credit.points;
        self.total_points += credit.points;
        match credit.source {
            PointSource::Prediction => self.prediction_points += credit.points,
            PointSource::Quiz => self.quiz_points += credit.points,
        }
    }

    pub fn points(&self, bucket: Bucket) -> i64 {
        match bucket {
            Bucket::Monthly => self.monthly_points,
            Bucket::Seasonal => self.seasonal_points,
        }
    }
}

/// Represents a row of the 'user_score_history' table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub user_id: i64,
    pub source: PointSource,
    pub points: i64,
    pub month: i32,
    pub year: i32,
    pub season_year: i32,
}

impl From<&Credit> for HistoryEntry {
    fn from(credit: &Credit) -> Self {
        Self {
            user_id: credit.user_id,
            source: credit.source,
            points: credit.points,
            month: credit.period.month,
            year: credit.period.year,
            season_year: credit.period.season_year,
        }
    }
}

/// Leaderboard bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Monthly,
    Seasonal,
}

impl Bucket {
    /// Ledger column backing this bucket.
    pub fn column(&self) -> &'static str {
        match self {
            Bucket::Monthly => "monthly_points",
            Bucket::Seasonal => "seasonal_points",
        }
    }
}

/// A leaderboard line joined with the user's name.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, ToSchema)]
pub struct StandingEntry {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub points: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period() -> Period {
        Period { month: 9, year: 2025, season_year: 2025 }
    }

    #[test]
    fn apply_credits_source_and_period_buckets() {
        let mut balance = LedgerBalance::empty(5);
        balance.apply(&Credit { user_id: 5, source: PointSource::Prediction, points: 10, period: period() });
        balance.apply(&Credit { user_id: 5, source: PointSource::Quiz, points: 5, period: period() });

        assert_eq!(balance.prediction_points, 10);
        assert_eq!(balance.quiz_points, 5);
        assert_eq!(balance.monthly_points, 15);
        assert_eq!(balance.seasonal_points, 15);
        assert_eq!(balance.total_points, 15);
        assert_eq!(balance.points(Bucket::Monthly), 15);
    }
}
