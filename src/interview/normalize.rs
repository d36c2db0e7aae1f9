//! Answer normalization for the duplicate guard.
//!
//! Produces a canonical comparison key only — the raw answer is what
//! gets persisted.

use crate::catalog::QuestionKind;

/// Canonicalize an answer for duplicate comparison.
///
/// Multiselect answers become order- and case-insensitive: parts are
/// split on commas, trimmed, lowercased, sorted and rejoined. Every
/// other kind is trimmed and lowercased whole.
pub fn normalize(answer: Option<&str>, kind: &QuestionKind) -> Option<String> {
    let answer = answer?;
    match kind {
        QuestionKind::MultiSelect { .. } => {
            let mut parts: Vec<String> = answer
                .split(',')
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect();
            parts.sort();
            Some(parts.join(","))
        }
        _ => Some(answer.trim().to_lowercase()),
    }
}
