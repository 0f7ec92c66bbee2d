use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::question::{Question, QuestionKind};

/// Points granted by a question that does not declare its own value.
pub const DEFAULT_QUESTION_POINTS: u32 = 100;
/// Time budget of a question that does not declare its own value.
pub const DEFAULT_TIME_LIMIT_SECS: u32 = 20;

/// Question as exchanged with content sources and stored in the question cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    /// Text shown to participants.
    pub prompt: String,
    /// Seconds allotted to answer.
    #[serde(default = "default_time_limit")]
    pub time_limit_secs: u32,
    /// Points for a fully correct answer.
    #[serde(default = "default_points")]
    pub points: u32,
    /// Kind-specific payload.
    #[serde(flatten)]
    pub kind: QuestionKindEntity,
}

/// Kind-specific part of [`QuestionEntity`], tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionKindEntity {
    /// One correct option among `choices`.
    SingleChoice {
        /// Displayed options.
        choices: Vec<String>,
        /// Index of the correct option.
        correct_index: usize,
    },
    /// Any subset of `choices` may be correct.
    MultiChoice {
        /// Displayed options.
        choices: Vec<String>,
        /// Indices of the correct options.
        correct_indices: Vec<usize>,
    },
    /// True/false question.
    Boolean {
        /// Expected answer.
        correct_answer: bool,
    },
}

/// Raised when a stored or fetched question is internally inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidQuestion {
    /// The prompt is blank.
    #[error("question prompt must not be empty")]
    EmptyPrompt,
    /// A choice question without options.
    #[error("choice question `{0}` has no choices")]
    NoChoices(String),
    /// A correct index points past the options.
    #[error("question `{prompt}` references choice {index} out of {available}")]
    CorrectOutOfRange {
        prompt: String,
        index: usize,
        available: usize,
    },
}

fn default_points() -> u32 {
    DEFAULT_QUESTION_POINTS
}

fn default_time_limit() -> u32 {
    DEFAULT_TIME_LIMIT_SECS
}

fn check_choices(prompt: &str, choices: &[String], indices: &[usize]) -> Result<(), InvalidQuestion> {
    if choices.is_empty() {
        return Err(InvalidQuestion::NoChoices(prompt.to_string()));
    }
    if let Some(&index) = indices.iter().find(|&&index| index >= choices.len()) {
        return Err(InvalidQuestion::CorrectOutOfRange {
            prompt: prompt.to_string(),
            index,
            available: choices.len(),
        });
    }
    Ok(())
}

impl TryFrom<QuestionEntity> for Question {
    type Error = InvalidQuestion;

    fn try_from(value: QuestionEntity) -> Result<Self, Self::Error> {
        if value.prompt.trim().is_empty() {
            return Err(InvalidQuestion::EmptyPrompt);
        }

        let kind = match value.kind {
            QuestionKindEntity::SingleChoice {
                choices,
                correct_index,
            } => {
                check_choices(&value.prompt, &choices, &[correct_index])?;
                QuestionKind::SingleChoice {
                    choices,
                    correct: correct_index,
                }
            }
            QuestionKindEntity::MultiChoice {
                choices,
                correct_indices,
            } => {
                check_choices(&value.prompt, &choices, &correct_indices)?;
                QuestionKind::MultiChoice {
                    choices,
                    correct: correct_indices.into_iter().collect::<BTreeSet<_>>(),
                }
            }
            QuestionKindEntity::Boolean { correct_answer } => QuestionKind::Boolean {
                correct: correct_answer,
            },
        };

        Ok(Self {
            prompt: value.prompt,
            time_limit_secs: value.time_limit_secs,
            points: value.points,
            kind,
        })
    }
}

impl From<Question> for QuestionEntity {
    fn from(value: Question) -> Self {
        let kind = match value.kind {
            QuestionKind::SingleChoice { choices, correct } => QuestionKindEntity::SingleChoice {
                choices,
                correct_index: correct,
            },
            QuestionKind::MultiChoice { choices, correct } => QuestionKindEntity::MultiChoice {
                choices,
                correct_indices: correct.into_iter().collect(),
            },
            QuestionKind::Boolean { correct } => QuestionKindEntity::Boolean {
                correct_answer: correct,
            },
        };

        Self {
            prompt: value.prompt,
            time_limit_secs: value.time_limit_secs,
            points: value.points,
            kind,
        }
    }
}
