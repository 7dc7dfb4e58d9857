// src/settlement/quiz.rs

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use super::{
    Result, SettlementEngine, SettlementError,
    period::{Period, QuizWeek},
};
use crate::config::QUIZ_QUESTIONS_PER_WEEK;
use crate::models::{
    ledger::PointSource,
    quiz::{AttemptGrade, OptionLabel, PublicQuizQuestion, QuizAnswer},
};

/// Result of grading one quiz submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuizSettlement {
    pub correct: usize,
    pub wrong: usize,
    pub earned: i64,
}

impl SettlementEngine {
    /// Whether the user can still take this week's quiz.
    pub async fn quiz_status(&self, user_id: i64, at: DateTime<Utc>) -> Result<bool> {
        let status = self.attempts.week_status(user_id, QuizWeek::at(at)).await?;
        Ok(!status.has_submitted())
    }

    /// Returns the user's questions for this week, assigning them on first call.
    /// Once the week's answers are submitted there is nothing left to assign.
    pub async fn assign_quiz(
        &self,
        user_id: i64,
        at: DateTime<Utc>,
    ) -> Result<Vec<PublicQuizQuestion>> {
        let week = QuizWeek::at(at);

        if self.attempts.week_status(user_id, week).await?.has_submitted() {
            return Ok(Vec::new());
        }

        let questions = self
            .attempts
            .assign_questions(user_id, week, QUIZ_QUESTIONS_PER_WEEK)
            .await?;

        Ok(questions.into_iter().map(PublicQuizQuestion::from).collect())
    }

    /// Grades a batch of quiz answers and credits the points earned.
    ///
    /// Answers for unknown questions, for questions outside the user's weekly
    /// assignment, or for attempts already graded are skipped.
    pub async fn submit_quiz_answers(
        &self,
        user_id: i64,
        answers: &[QuizAnswer],
        at: DateTime<Utc>,
    ) -> Result<QuizSettlement> {
        let parsed = parse_answers(answers)?;
        let week = QuizWeek::at(at);
        let points = self.points().await?.correct_quiz;

        let status = self.attempts.week_status(user_id, week).await?;
        if status.has_submitted() {
            tracing::info!(user_id, week = week.week, "Quiz already submitted this week");
            return Ok(QuizSettlement::default());
        }

        let parsed = restrict_to_assignment(parsed, &status.assigned);
        if parsed.is_empty() {
            return Ok(QuizSettlement::default());
        }

        let ids: Vec<i64> = parsed.iter().map(|(id, _)| *id).collect();
        let keys = self.attempts.answer_keys(&ids).await?;
        let grades = grade_answers(&parsed, &keys);

        let claimed = self.attempts.claim_and_grade(user_id, week, &grades).await?;
        let correct = claimed.iter().filter(|g| g.is_correct).count();
        let wrong = claimed.len() - correct;

        let earned = correct as i64 * points;
        self.credit(user_id, PointSource::Quiz, earned, Period::at(at)).await?;

        tracing::info!(user_id, correct, wrong, earned, "Quiz graded");

        Ok(QuizSettlement { correct, wrong, earned })
    }
}

/// Validates the batch and keeps the first answer per question.
fn parse_answers(answers: &[QuizAnswer]) -> Result<Vec<(i64, OptionLabel)>> {
    if answers.is_empty() {
        return Err(SettlementError::InvalidInput("No answers submitted".to_string()));
    }
    if answers.len() > QUIZ_QUESTIONS_PER_WEEK {
        return Err(SettlementError::InvalidInput(format!(
            "At most {} answers can be submitted",
            QUIZ_QUESTIONS_PER_WEEK
        )));
    }

    let mut seen = HashSet::new();
    let mut parsed = Vec::with_capacity(answers.len());
    for answer in answers {
        let label = answer
            .selected_option
            .parse::<OptionLabel>()
            .map_err(SettlementError::InvalidInput)?;
        if seen.insert(answer.quiz_id) {
            parsed.push((answer.quiz_id, label));
        }
    }

    Ok(parsed)
}

/// With an assignment in place only assigned questions count.
fn restrict_to_assignment(
    answers: Vec<(i64, OptionLabel)>,
    assigned: &[i64],
) -> Vec<(i64, OptionLabel)> {
    if assigned.is_empty() {
        return answers;
    }
    answers
        .into_iter()
        .filter(|(id, _)| assigned.contains(id))
        .collect()
}

fn grade_answers(answers: &[(i64, OptionLabel)], keys: &HashMap<i64, String>) -> Vec<AttemptGrade> {
    answers
        .iter()
        .filter_map(|(id, selected)| {
            keys.get(id).map(|correct| AttemptGrade {
                question_id: *id,
                selected: *selected,
                is_correct: selected.matches(correct),
            })
        })
        .collect()
}
