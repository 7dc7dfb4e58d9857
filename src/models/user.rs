// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::ledger::LedgerBalance;

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique login email.
    pub email: String,

    /// Unique display handle.
    pub username: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    pub first_name: String,
    pub last_name: String,

    /// User role: 'user' or 'admin'.
    pub role: String,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username length must be between 3 and 50 characters."
    ))]
    pub username: String,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// DTO for changing the signed-in user's password.
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[serde(alias = "currentPassword")]
    #[validate(length(min = 1, max = 128))]
    pub current_password: String,
    #[serde(alias = "newPassword")]
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub new_password: String,
}

/// Correct/total counts for one kind of graded activity.
#[derive(Debug, Serialize, PartialEq)]
pub struct ActivityStats {
    pub total: i64,
    pub correct: i64,
    /// Percentage with one decimal, e.g. "66.7".
    pub success_rate: String,
}

impl ActivityStats {
    pub fn new(total: i64, correct: i64) -> Self {
        let success_rate = if total > 0 {
            format!("{:.1}", correct as f64 / total as f64 * 100.0)
        } else {
            "0.0".to_string()
        };
        Self { total, correct, success_rate }
    }
}

#[derive(Debug, Serialize)]
pub struct Ranks {
    pub monthly: Option<i64>,
    pub seasonal: Option<i64>,
}

/// Aggregated profile data for the current user.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: User,
    pub scores: LedgerBalance,
    pub quiz_available: bool,
    pub prediction_stats: ActivityStats,
    pub quiz_stats: ActivityStats,
    pub rankings: Ranks,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_rate_has_one_decimal() {
        assert_eq!(ActivityStats::new(3, 2).success_rate, "66.7");
        assert_eq!(ActivityStats::new(4, 4).success_rate, "100.0");
        assert_eq!(ActivityStats::new(0, 0).success_rate, "0.0");
    }

    #[test]
    fn registration_requires_valid_email() {
        let req = CreateUserRequest {
            email: "not-an-email".into(),
            username: "player".into(),
            password: "secret".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
        };
        assert!(req.validate().is_err());
    }
}
