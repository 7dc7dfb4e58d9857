// src/models/matches.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

pub const STATUS_UPCOMING: &str = "upcoming";
pub const STATUS_FINISHED: &str = "finished";

/// Represents the 'matches' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Match {
    pub id: i64,
    pub home_team: String,
    pub away_team: String,

    /// Kickoff time. Predictions close at this instant.
    pub match_date: DateTime<Utc>,

    /// Final scores, present only once the match is finished.
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,

    /// 'upcoming' or 'finished'.
    pub status: String,

    pub league_id: Option<i64>,
    pub match_week: Option<i32>,
}

impl Match {
    pub fn is_finished(&self) -> bool {
        self.status == STATUS_FINISHED
    }

    /// Final score as `(home, away)` when the match has been finished.
    pub fn final_score(&self) -> Option<(i32, i32)> {
        match (self.is_finished(), self.home_score, self.away_score) {
            (true, Some(home), Some(away)) => Some((home, away)),
            _ => None,
        }
    }
}

/// DTO for an admin creating a fixture.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateMatchRequest {
    #[validate(length(min = 1, max = 100))]
    pub home_team: String,
    #[validate(length(min = 1, max = 100))]
    pub away_team: String,
    pub match_date: DateTime<Utc>,
    pub league_id: Option<i64>,
    #[validate(range(min = 1, max = 60))]
    pub match_week: Option<i32>,
}

/// DTO for finishing a match. Scores are optional on the wire so that
/// a missing score is reported as a validation error instead of a parse error.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct FinishMatchRequest {
    pub match_id: i64,
    #[validate(required(message = "home_score is required"), range(min = 0))]
    pub home_score: Option<i32>,
    #[validate(required(message = "away_score is required"), range(min = 0))]
    pub away_score: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FinishMatchResponse {
    pub success: bool,
    pub message: String,
    /// Predictions graded by this call.
    pub graded: usize,
    /// Graded predictions that guessed the outcome.
    pub winners: usize,
    /// Points credited to each winner.
    pub points_per_winner: i64,
}

/// Query parameters for listing matches in a date range.
#[derive(Debug, Deserialize)]
pub struct MatchRangeParams {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Query parameters for listing a week's matches.
#[derive(Debug, Deserialize)]
pub struct WeekParams {
    pub league_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(status: &str, home: Option<i32>, away: Option<i32>) -> Match {
        Match {
            id: 1,
            home_team: "Home".into(),
            away_team: "Away".into(),
            match_date: Utc::now(),
            home_score: home,
            away_score: away,
            status: status.into(),
            league_id: None,
            match_week: None,
        }
    }

    #[test]
    fn final_score_requires_finished_status() {
        assert_eq!(fixture(STATUS_FINISHED, Some(2), Some(1)).final_score(), Some((2, 1)));
        assert_eq!(fixture(STATUS_UPCOMING, Some(2), Some(1)).final_score(), None);
        assert_eq!(fixture(STATUS_FINISHED, None, Some(1)).final_score(), None);
    }

    #[test]
    fn finish_request_rejects_missing_or_negative_scores() {
        let missing = FinishMatchRequest { match_id: 1, home_score: None, away_score: Some(0) };
        assert!(missing.validate().is_err());

        let negative = FinishMatchRequest { match_id: 1, home_score: Some(-1), away_score: Some(0) };
        assert!(negative.validate().is_err());

        let ok = FinishMatchRequest { match_id: 1, home_score: Some(0), away_score: Some(0) };
        assert!(ok.validate().is_ok());
    }
}
