//! Case-insensitive substring filters for the message list and project sidebar.

use crate::models::{Message, ProjectSummary};

/// True when `query` (case-insensitively) occurs in the question or any answer.
pub fn message_matches(message: &Message, query: &str) -> bool {
    matches_folded(message, &query.to_lowercase())
}

/// Messages matching `query`, in their original order. An empty query keeps all.
pub fn filter_messages<'a>(messages: &'a [Message], query: &str) -> Vec<&'a Message> {
    let needle = query.to_lowercase();
    messages
        .iter()
        .filter(|m| matches_folded(m, &needle))
        .collect()
}

/// Sidebar rows whose project name contains `query`.
pub fn filter_projects<'a>(summaries: &'a [ProjectSummary], query: &str) -> Vec<&'a ProjectSummary> {
    let needle = query.to_lowercase();
    summaries
        .iter()
        .filter(|s| contains_folded(&s.name, &needle))
        .collect()
}

fn matches_folded(message: &Message, lowered_needle: &str) -> bool {
    contains_folded(&message.user, lowered_needle)
        || message.responses.iter().any(|r| contains_folded(&r.content, lowered_needle))
}

fn contains_folded(haystack: &str, lowered_needle: &str) -> bool {
    lowered_needle.is_empty() || haystack.to_lowercase().contains(lowered_needle)
}
