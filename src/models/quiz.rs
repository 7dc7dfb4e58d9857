// src/models/quiz.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// One of the four answer slots of a quiz question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionLabel {
    A,
    B,
    C,
    D,
}

impl OptionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionLabel::A => "A",
            OptionLabel::B => "B",
            OptionLabel::C => "C",
            OptionLabel::D => "D",
        }
    }

    /// True when a stored correct option names this label.
    /// Comparison ignores case and surrounding whitespace.
    pub fn matches(&self, stored: &str) -> bool {
        stored.trim().eq_ignore_ascii_case(self.as_str())
    }
}

impl fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(OptionLabel::A),
            "B" => Ok(OptionLabel::B),
            "C" => Ok(OptionLabel::C),
            "D" => Ok(OptionLabel::D),
            _ => Err(format!("'{}' is not one of A, B, C, D", s)),
        }
    }
}

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: i64,
    pub question: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    /// Label of the correct option ('A'..'D'); stored as entered by the admin.
    pub correct_option: String,
    pub image_url: Option<String>,
}

/// DTO for sending a question to a player (excludes the correct option).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicQuizQuestion {
    pub id: i64,
    pub question: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub image_url: Option<String>,
}

impl From<QuizQuestion> for PublicQuizQuestion {
    fn from(q: QuizQuestion) -> Self {
        Self {
            id: q.id,
            question: q.question,
            option_a: q.option_a,
            option_b: q.option_b,
            option_c: q.option_c,
            option_d: q.option_d,
            image_url: q.image_url,
        }
    }
}

/// DTO for an admin creating a question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 1000))]
    pub question: String,
    #[validate(length(min = 1, max = 500))]
    pub option_a: String,
    #[validate(length(min = 1, max = 500))]
    pub option_b: String,
    #[validate(length(min = 1, max = 500))]
    pub option_c: String,
    #[validate(length(min = 1, max = 500))]
    pub option_d: String,
    pub correct_option: OptionLabel,
    #[validate(length(max = 500))]
    pub image_url: Option<String>,
}

/// A single answer inside a quiz submission.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuizAnswer {
    #[serde(alias = "question_id")]
    pub quiz_id: i64,
    /// Raw label as sent by the client; validated by the settlement engine.
    pub selected_option: String,
}

/// DTO for submitting a week's quiz answers.
/// The upper bound mirrors `config::QUIZ_QUESTIONS_PER_WEEK`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SubmitQuizRequest {
    #[validate(length(
        min = 1,
        max = 10,
        message = "Between 1 and 10 answers must be submitted"
    ))]
    pub answers: Vec<QuizAnswer>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuizSubmitResponse {
    pub success: bool,
    pub message: String,
    pub correct: usize,
    pub wrong: usize,
    pub earned: i64,
}

/// A graded answer, as handed to the attempt store for claiming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptGrade {
    pub question_id: i64,
    pub selected: OptionLabel,
    pub is_correct: bool,
}

/// A user's attempts for one quiz week.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeekStatus {
    /// Question ids assigned (or answered) this week.
    pub assigned: Vec<i64>,
    /// Number of attempts already graded this week.
    pub graded: usize,
}

impl WeekStatus {
    pub fn has_submitted(&self) -> bool {
        self.graded > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_labels_parse_case_insensitively() {
        assert_eq!("a".parse::<OptionLabel>(), Ok(OptionLabel::A));
        assert_eq!(" D ".parse::<OptionLabel>(), Ok(OptionLabel::D));
        assert!("E".parse::<OptionLabel>().is_err());
        assert!("".parse::<OptionLabel>().is_err());
    }

    #[test]
    fn option_label_matches_stored_answer() {
        assert!(OptionLabel::B.matches("b"));
        assert!(OptionLabel::B.matches(" B "));
        assert!(!OptionLabel::B.matches("C"));
    }

    #[test]
    fn submit_request_enforces_batch_size() {
        let empty = SubmitQuizRequest { answers: vec![] };
        assert!(empty.validate().is_err());

        let answer = QuizAnswer { quiz_id: 1, selected_option: "A".into() };
        let too_many = SubmitQuizRequest { answers: vec![answer.clone(); 11] };
        assert!(too_many.validate().is_err());

        let ok = SubmitQuizRequest { answers: vec![answer] };
        assert!(ok.validate().is_ok());
    }
}
