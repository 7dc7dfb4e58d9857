// src/models/settings.rs

use std::collections::HashMap;

use serde::Deserialize;
use validator::Validate;

pub const CORRECT_PREDICTION_POINT: &str = "correct_prediction_point";
pub const CORRECT_QUIZ_POINT: &str = "correct_quiz_point";

/// Point values in force for one settlement operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointsConfig {
    pub correct_prediction: i64,
    pub correct_quiz: i64,
}

impl PointsConfig {
    /// Builds the config from raw setting values.
    /// Missing, non-numeric or negative values count as zero.
    pub fn from_settings(settings: &HashMap<String, String>) -> Self {
        Self {
            correct_prediction: parse_points(settings.get(CORRECT_PREDICTION_POINT).map(String::as_str)),
            correct_quiz: parse_points(settings.get(CORRECT_QUIZ_POINT).map(String::as_str)),
        }
    }
}

pub fn parse_points(raw: Option<&str>) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v >= 0)
        .unwrap_or(0)
}

/// DTO for an admin changing a point setting.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePointsRequest {
    #[validate(custom(function = validate_setting_name))]
    pub setting: String,
    #[validate(range(min = 0, max = 1000))]
    pub value: i64,
}

fn validate_setting_name(name: &str) -> Result<(), validator::ValidationError> {
    match name {
        CORRECT_PREDICTION_POINT | CORRECT_QUIZ_POINT => Ok(()),
        _ => Err(validator::ValidationError::new("unknown_setting")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_points_defaults_to_zero() {
        assert_eq!(parse_points(Some("10")), 10);
        assert_eq!(parse_points(Some(" 7 ")), 7);
        assert_eq!(parse_points(Some("ten")), 0);
        assert_eq!(parse_points(Some("-3")), 0);
        assert_eq!(parse_points(None), 0);
    }

    #[test]
    fn points_config_reads_named_settings() {
        let mut settings = HashMap::new();
        settings.insert(CORRECT_PREDICTION_POINT.to_string(), "10".to_string());
        settings.insert("unrelated".to_string(), "99".to_string());

        let config = PointsConfig::from_settings(&settings);
        assert_eq!(config.correct_prediction, 10);
        assert_eq!(config.correct_quiz, 0);
    }

    #[test]
    fn update_request_rejects_unknown_settings() {
        let bad = UpdatePointsRequest { setting: "bonus".into(), value: 1 };
        assert!(bad.validate().is_err());

        let negative = UpdatePointsRequest { setting: CORRECT_QUIZ_POINT.into(), value: -1 };
        assert!(negative.validate().is_err());

        let ok = UpdatePointsRequest { setting: CORRECT_QUIZ_POINT.into(), value: 5 };
        assert!(ok.validate().is_ok());
    }
}
