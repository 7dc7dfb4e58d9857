// src/models/prediction.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// The three ways a match can end, from the home side's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    #[serde(alias = "home_team")]
    Home,
    Draw,
    #[serde(alias = "away_team")]
    Away,
}

impl Outcome {
    /// Derives the result of a match from its final score.
    pub fn from_score(home_score: i32, away_score: i32) -> Self {
        match home_score.cmp(&away_score) {
            std::cmp::Ordering::Greater => Outcome::Home,
            std::cmp::Ordering::Less => Outcome::Away,
            std::cmp::Ordering::Equal => Outcome::Draw,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Home => "home",
            Outcome::Draw => "draw",
            Outcome::Away => "away",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "home" | "home_team" => Ok(Outcome::Home),
            "draw" => Ok(Outcome::Draw),
            "away" | "away_team" => Ok(Outcome::Away),
            other => Err(format!("unknown outcome '{}'", other)),
        }
    }
}

/// Represents the 'predictions' table in the database.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub id: i64,
    pub user_id: i64,
    pub match_id: i64,
    pub predicted_result: Outcome,
    /// `None` until the match is settled.
    pub is_correct: Option<bool>,
    pub updated_at: DateTime<Utc>,
}

/// A prediction claimed and graded by a settlement pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedPrediction {
    pub id: i64,
    pub user_id: i64,
    pub is_correct: bool,
}

/// Result of storing a user's guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessOutcome {
    Created,
    Updated,
    /// The prediction was already graded and was left untouched.
    Locked,
}

/// DTO for submitting or changing a prediction.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitPredictionRequest {
    pub match_id: i64,
    pub predicted_result: Outcome,
}

/// A user's prediction joined with its match, for the "my predictions" view.
#[derive(Debug, Serialize, FromRow)]
pub struct PredictionView {
    pub id: i64,
    pub match_id: i64,
    pub home_team: String,
    pub away_team: String,
    pub match_date: DateTime<Utc>,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub predicted_result: String,
    pub is_correct: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_follows_the_score() {
        assert_eq!(Outcome::from_score(2, 1), Outcome::Home);
        assert_eq!(Outcome::from_score(1, 1), Outcome::Draw);
        assert_eq!(Outcome::from_score(0, 3), Outcome::Away);
        assert_eq!(Outcome::from_score(0, 0), Outcome::Draw);
    }

    #[test]
    fn outcome_accepts_legacy_aliases() {
        let parsed: Outcome = serde_json::from_str("\"home_team\"").unwrap();
        assert_eq!(parsed, Outcome::Home);
        let parsed: Outcome = serde_json::from_str("\"away\"").unwrap();
        assert_eq!(parsed, Outcome::Away);
        assert!(serde_json::from_str::<Outcome>("\"win\"").is_err());

        assert_eq!("away_team".parse::<Outcome>(), Ok(Outcome::Away));
        assert!("HOME".parse::<Outcome>().is_err());
    }

    #[test]
    fn outcome_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Outcome::Draw).unwrap(), "\"draw\"");
        assert_eq!(Outcome::Home.to_string(), "home");
    }
}
