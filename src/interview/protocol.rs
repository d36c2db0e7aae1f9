//! Wire protocol frames (server → client).
//!
//! Frames serialize to the exact JSON shapes the web client consumes.
//! Client → server traffic is a single raw text frame per turn — the
//! answer to the pending question — so there is no client frame type.

use serde::Serialize;

use crate::catalog::{Question, QuestionKind};
use crate::interview::model::Role;

/// Progress indicator shown alongside each question.
#[derive(Debug, Clone, Serialize)]
pub struct Progress {
    /// 1-based number of the question being asked.
    pub current: usize,
    pub total: usize,
}

/// Type-specific constraints attached to a question frame.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Constraints {
    Numeric {
        min: i64,
        max: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        step: Option<i64>,
    },
    Length {
        max_length: usize,
    },
}

/// A question presented to the client.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionFrame {
    pub id: String,
    pub prompt: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub module: String,
    pub module_title: String,
    pub progress: Progress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Constraints>,
}

/// Structured validation error body.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationErrorBody {
    pub code: &'static str,
    pub message: String,
    pub details: serde_json::Value,
}

/// Everything the server can send over the interview channel.
///
/// Untagged: each variant already carries its discriminating shape.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ServerFrame {
    Question(QuestionFrame),
    History {
        role: Role,
        content: String,
    },
    ValidationError {
        error: ValidationErrorBody,
    },
    Duplicate {
        error: &'static str,
    },
    Consultation {
        event: &'static str,
        data: ConsultationData,
    },
    Recommendations {
        event: &'static str,
        data: RecommendationsData,
    },
    Finished {
        event: &'static str,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsultationData {
    pub consultation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendationsData {
    pub hh_ids: Vec<String>,
    pub recommendations: Vec<serde_json::Value>,
}

impl ServerFrame {
    /// Build the enriched question frame for a catalog entry.
    pub fn question(question: &Question, total: usize) -> Self {
        let (options, multiple, constraints) = match &question.kind {
            QuestionKind::Select { options } => (Some(options.clone()), None, None),
            QuestionKind::MultiSelect { options } => (Some(options.clone()), Some(true), None),
            QuestionKind::Number { min, max } => (
                None,
                None,
                Some(Constraints::Numeric {
                    min: *min,
                    max: *max,
                    step: None,
                }),
            ),
            QuestionKind::Range { min, max, step } => (
                None,
                None,
                Some(Constraints::Numeric {
                    min: *min,
                    max: *max,
                    step: Some(*step),
                }),
            ),
            QuestionKind::Line { max_length } | QuestionKind::Text { max_length } => (
                None,
                None,
                Some(Constraints::Length {
                    max_length: *max_length,
                }),
            ),
        };

        Self::Question(QuestionFrame {
            id: question.id.clone(),
            prompt: question.prompt.clone(),
            kind: question.kind.type_tag(),
            module: question.module.clone(),
            module_title: question.module_title.clone(),
            progress: Progress {
                current: question.global_index + 1,
                total,
            },
            options,
            multiple,
            constraints,
        })
    }

    /// A transcript line replayed on reconnect.
    pub fn history(role: Role, content: impl Into<String>) -> Self {
        Self::History {
            role,
            content: content.into(),
        }
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::ValidationError {
            error: ValidationErrorBody {
                code: "validation_failed",
                message: message.into(),
                details: serde_json::json!({}),
            },
        }
    }

    pub fn duplicate() -> Self {
        Self::Duplicate { error: "duplicate" }
    }

    pub fn consultation(text: impl Into<String>) -> Self {
        Self::Consultation {
            event: "career_consultation",
            data: ConsultationData {
                consultation: text.into(),
            },
        }
    }

    pub fn recommendations(hh_ids: Vec<String>, recommendations: Vec<serde_json::Value>) -> Self {
        Self::Recommendations {
            event: "recommendations",
            data: RecommendationsData {
                hh_ids,
                recommendations,
            },
        }
    }

    pub fn finished() -> Self {
        Self::Finished { event: "finished" }
    }
}
