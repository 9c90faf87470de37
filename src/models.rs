//! Data model: projects own messages, messages own one response per model.
//!
//! Wire format is camelCase JSON with RFC 3339 timestamps, the same shape the
//! store keeps under `chat-projects` and the export document embeds.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ChatError;

/// Id of the project created implicitly when a message is sent with nothing selected.
pub const DEFAULT_PROJECT_ID: &str = "default";
/// Display name of the implicit default project.
pub const DEFAULT_PROJECT_NAME: &str = "General Chat";

// ---------------------------------------------------------------------------
// Rating / Score
// ---------------------------------------------------------------------------

/// A star rating, always within 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(stars: u8) -> Result<Self, ChatError> {
        if (Self::MIN..=Self::MAX).contains(&stars) {
            Ok(Rating(stars))
        } else {
            Err(ChatError::InvalidRating(stars))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = ChatError;

    fn try_from(stars: u8) -> Result<Self, Self::Error> {
        Rating::new(stars)
    }
}

impl From<Rating> for u8 {
    fn from(r: Rating) -> u8 {
        r.0
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a response has been rated yet.
///
/// Serialized as the optional `rating` field: absent (or `null`) for
/// `Unrated`, a bare integer for `Rated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Option<u8>", into = "Option<u8>")]
pub enum Score {
    #[default]
    Unrated,
    Rated(Rating),
}

impl Score {
    pub fn is_unrated(&self) -> bool {
        matches!(self, Score::Unrated)
    }

    pub fn rating(&self) -> Option<Rating> {
        match self {
            Score::Unrated => None,
            Score::Rated(r) => Some(*r),
        }
    }
}

impl TryFrom<Option<u8>> for Score {
    type Error = ChatError;

    fn try_from(raw: Option<u8>) -> Result<Self, Self::Error> {
        match raw {
            None => Ok(Score::Unrated),
            Some(stars) => Rating::new(stars).map(Score::Rated),
        }
    }
}

impl From<Score> for Option<u8> {
    fn from(score: Score) -> Option<u8> {
        score.rating().map(Rating::value)
    }
}

// ---------------------------------------------------------------------------
// Response / Message / Project
// ---------------------------------------------------------------------------

/// One model's answer to a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub id: String,
    pub content: String,
    pub model: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Score::is_unrated")]
    pub rating: Score,
}

impl Response {
    /// Build the `index`-th response of message `message_id`.
    pub fn new(message_id: &str, index: usize, model: &str, content: String) -> Self {
        Response {
            id: response_id(message_id, index),
            content,
            model: model.to_string(),
            timestamp: Utc::now(),
            rating: Score::Unrated,
        }
    }
}

/// Response ids are positional within their message, so they stay unique
/// however many models answered.
pub fn response_id(message_id: &str, index: usize) -> String {
    format!("{message_id}-{index}")
}

/// A user question plus the full set of model responses to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub user: String,
    pub responses: Vec<Response>,
    pub timestamp: DateTime<Utc>,
}

/// A named container of messages, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Project {
            id: id.into(),
            name: name.into(),
            messages: Vec::new(),
            created_at: now,
            last_updated: now,
        }
    }

    /// The implicit "General Chat" project.
    pub fn default_project() -> Self {
        Project::new(DEFAULT_PROJECT_ID, DEFAULT_PROJECT_NAME)
    }

    /// Refresh `last_updated` after a structural change.
    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }

    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
        self.touch();
    }

    pub fn find_response_mut(&mut self, message_id: &str, response_id: &str) -> Option<&mut Response> {
        self.messages
            .iter_mut()
            .find(|m| m.id == message_id)?
            .responses
            .iter_mut()
            .find(|r| r.id == response_id)
    }

    /// All responses in this project, in message then model order.
    pub fn responses(&self) -> impl Iterator<Item = &Response> {
        self.messages.iter().flat_map(|m| m.responses.iter())
    }
}

/// Reject a collection that reuses a project id, a message id within its
/// project, or a response id within its message.
pub fn check_unique_ids(projects: &[Project]) -> Result<(), ChatError> {
    let mut project_ids = HashSet::new();
    for p in projects {
        if !project_ids.insert(p.id.as_str()) {
            return Err(duplicate("project", &p.id));
        }
        let mut message_ids = HashSet::new();
        for m in &p.messages {
            if !message_ids.insert(m.id.as_str()) {
                return Err(duplicate("message", &m.id));
            }
            let mut response_ids = HashSet::new();
            if let Some(r) = m.responses.iter().find(|r| !response_ids.insert(r.id.as_str())) {
                return Err(duplicate("response", &r.id));
            }
        }
    }
    Ok(())
}

fn duplicate(kind: &'static str, id: &str) -> ChatError {
    ChatError::DuplicateId {
        kind,
        id: id.to_string(),
    }
}

/// Sidebar row for one project.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    pub message_count: usize,
    /// Mean rating over rated responses; 0 when nothing is rated.
    pub avg_rating: f64,
    pub last_updated: DateTime<Utc>,
}
