//! Per-question answer validation. Pure — never touches storage.

use crate::catalog::{Question, QuestionKind};

/// A human-readable validation failure for the current answer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct Rejection {
    pub message: String,
}

impl Rejection {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Validate a raw answer against the question's constraints.
pub fn validate(raw: &str, question: &Question) -> Result<(), Rejection> {
    match &question.kind {
        QuestionKind::Select { options } => {
            if options.iter().any(|o| o == raw) {
                Ok(())
            } else {
                Err(Rejection::new(format!(
                    "Please choose one of: {}",
                    options.join(", ")
                )))
            }
        }
        QuestionKind::MultiSelect { options } => {
            let selected: Vec<&str> = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();
            if selected.is_empty() {
                return Err(Rejection::new("Please choose at least one option"));
            }
            let invalid: Vec<&str> = selected
                .iter()
                .copied()
                .filter(|s| !options.iter().any(|o| o == s))
                .collect();
            if invalid.is_empty() {
                Ok(())
            } else {
                Err(Rejection::new(format!(
                    "Invalid options: {}",
                    invalid.join(", ")
                )))
            }
        }
        QuestionKind::Number { min, max } | QuestionKind::Range { min, max, .. } => {
            let value: i64 = raw
                .trim()
                .parse()
                .map_err(|_| Rejection::new("Please enter a valid number"))?;
            if value < *min || value > *max {
                Err(Rejection::new(format!(
                    "Please enter a number between {min} and {max}"
                )))
            } else {
                Ok(())
            }
        }
        QuestionKind::Line { max_length } | QuestionKind::Text { max_length } => {
            if raw.trim().is_empty() {
                return Err(Rejection::new("The answer cannot be empty"));
            }
            // Character count over the untrimmed input; the limit is
            // user-facing, not a byte budget.
            if raw.chars().count() > *max_length {
                return Err(Rejection::new(format!(
                    "The answer must be at most {max_length} characters"
                )));
            }
            Ok(())
        }
    }
}
