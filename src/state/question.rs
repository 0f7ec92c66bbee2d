use std::collections::BTreeSet;

use serde_json::Value;
use thiserror::Error;

/// A single trivia question played during one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Text shown to participants.
    pub prompt: String,
    /// Seconds participants have to answer; re-stamped from the session settings.
    pub time_limit_secs: u32,
    /// Maximum points awarded for a fully correct answer.
    pub points: u32,
    /// Kind-specific data (choices and expected answer).
    pub kind: QuestionKind,
}

/// Closed set of supported question kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionKind {
    /// Exactly one of `choices` is correct.
    SingleChoice {
        /// Displayed options.
        choices: Vec<String>,
        /// Index of the correct option.
        correct: usize,
    },
    /// Any subset of `choices` may be correct; partial credit is awarded.
    MultiChoice {
        /// Displayed options.
        choices: Vec<String>,
        /// Indices of the correct options.
        correct: BTreeSet<usize>,
    },
    /// True/false question.
    Boolean {
        /// Expected answer.
        correct: bool,
    },
}

/// Answer decoded from a raw submission according to the question kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// Selected option index.
    Choice(usize),
    /// Selected option indices, deduplicated.
    Choices(BTreeSet<usize>),
    /// Boolean answer.
    Boolean(bool),
}

/// Result of scoring one accepted answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scored {
    /// Points awarded, between 0 and the question point value.
    pub points: u32,
    /// Whether the answer was fully correct.
    pub correct: bool,
}

/// Raised when a submission does not match the shape expected by the question kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnswerError {
    /// Payload type does not match the question kind.
    #[error("expected {expected}, got `{got}`")]
    WrongShape { expected: &'static str, got: String },
    /// Choice index beyond the displayed options.
    #[error("choice {index} is out of range (question has {available} choices)")]
    OutOfRange { index: usize, available: usize },
}

impl Question {
    /// Stable identifier of the question kind, used on the wire.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            QuestionKind::SingleChoice { .. } => "single_choice",
            QuestionKind::MultiChoice { .. } => "multi_choice",
            QuestionKind::Boolean { .. } => "boolean",
        }
    }

    /// Options displayed to participants; empty for boolean questions.
    pub fn choices(&self) -> &[String] {
        match &self.kind {
            QuestionKind::SingleChoice { choices, .. } | QuestionKind::MultiChoice { choices, .. } => {
                choices
            }
            QuestionKind::Boolean { .. } => &[],
        }
    }

    /// Expected answer encoded the same way participants submit it.
    pub fn correct_answer(&self) -> Value {
        match &self.kind {
            QuestionKind::SingleChoice { correct, .. } => Value::from(*correct),
            QuestionKind::MultiChoice { correct, .. } => {
                Value::from(correct.iter().copied().collect::<Vec<_>>())
            }
            QuestionKind::Boolean { correct } => Value::from(*correct),
        }
    }

    /// Decode a raw submission into a typed [`Answer`].
    pub fn parse_answer(&self, raw: &Value) -> Result<Answer, AnswerError> {
        match &self.kind {
            QuestionKind::SingleChoice { choices, .. } => {
                parse_index(raw, choices.len(), "a choice index").map(Answer::Choice)
            }
            QuestionKind::MultiChoice { choices, .. } => {
                let Value::Array(items) = raw else {
                    return Err(wrong_shape("an array of choice indices", raw));
                };
                items
                    .iter()
                    .map(|item| parse_index(item, choices.len(), "an array of choice indices"))
                    .collect::<Result<BTreeSet<_>, _>>()
                    .map(Answer::Choices)
            }
            QuestionKind::Boolean { .. } => raw
                .as_bool()
                .map(Answer::Boolean)
                .ok_or_else(|| wrong_shape("a boolean", raw)),
        }
    }

    /// Score an answer previously produced by [`Question::parse_answer`].
    ///
    /// Multi-choice answers earn `floor(|selected ∩ correct| * points / |correct|)`;
    /// selections outside the correct set are ignored, and a question without any
    /// correct option always scores zero.
    pub fn score(&self, answer: &Answer) -> Scored {
        match (&self.kind, answer) {
            (QuestionKind::SingleChoice { correct, .. }, Answer::Choice(selected)) => {
                self.all_or_nothing(selected == correct)
            }
            (QuestionKind::Boolean { correct }, Answer::Boolean(selected)) => {
                self.all_or_nothing(selected == correct)
            }
            (QuestionKind::MultiChoice { correct, .. }, Answer::Choices(selected)) => {
                if correct.is_empty() {
                    return Scored {
                        points: 0,
                        correct: false,
                    };
                }
                let hits = selected.intersection(correct).count() as u64;
                let points = hits * u64::from(self.points) / correct.len() as u64;
                Scored {
                    points: u32::try_from(points).unwrap_or(self.points),
                    correct: selected == correct,
                }
            }
            _ => Scored {
                points: 0,
                correct: false,
            },
        }
    }

    /// Parse then score a raw submission.
    pub fn evaluate(&self, raw: &Value) -> Result<Scored, AnswerError> {
        let answer = self.parse_answer(raw)?;
        Ok(self.score(&answer))
    }

    fn all_or_nothing(&self, correct: bool) -> Scored {
        Scored {
            points: if correct { self.points } else { 0 },
            correct,
        }
    }
}

fn parse_index(raw: &Value, available: usize, expected: &'static str) -> Result<usize, AnswerError> {
    let index = raw
        .as_u64()
        .and_then(|value| usize::try_from(value).ok())
        .ok_or_else(|| wrong_shape(expected, raw))?;
    if index >= available {
        return Err(AnswerError::OutOfRange { index, available });
    }
    Ok(index)
}

fn wrong_shape(expected: &'static str, raw: &Value) -> AnswerError {
    AnswerError::WrongShape {
        expected,
        got: raw.to_string(),
    }
}
