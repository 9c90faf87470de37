//! Crate-level error type.
//!
//! Empty input (blank message text, blank project name, unknown ids) is not an
//! error anywhere in this crate: those operations return `Ok(None)` /
//! `Ok(false)`.  `ChatError` covers the failures a caller can actually act on:
//! a store that cannot be read or written, a config file that does not parse,
//! a rating outside 1..=5, and send-lifecycle conflicts.

use thiserror::Error;

/// Every failure surfaced by the library.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Filesystem failure in the file store, export, or config loading.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite failure in the sqlite-backed store.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Serialization failure not tied to a particular store key.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored value exists but cannot be decoded.
    #[error("stored value under '{key}' is corrupt: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The TOML config file could not be parsed or is inconsistent.
    #[error("config error: {0}")]
    Config(String),

    /// A rating outside the 1..=5 star range.
    #[error("rating {0} is outside the 1..=5 range")]
    InvalidRating(u8),

    /// A send is already in flight for this project.
    #[error("a message is already being sent in project '{0}'")]
    SendInProgress(String),

    /// The project a pending send targets was deleted before it committed.
    #[error("project '{0}' no longer exists")]
    ProjectNotFound(String),

    /// Committed responses do not line up with the models the send was admitted for.
    #[error("response {index} does not match the pending send: {reason}")]
    ResponseMismatch { index: usize, reason: String },

    /// An imported collection reuses an id within the same parent.
    #[error("duplicate {kind} id '{id}'")]
    DuplicateId { kind: &'static str, id: String },

    /// A response source failed for one model.
    #[error("{model} failed: {reason}")]
    Synthesis { model: String, reason: String },
}

impl From<toml::de::Error> for ChatError {
    fn from(e: toml::de::Error) -> Self {
        ChatError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_rating_display() {
        assert_eq!(
            ChatError::InvalidRating(7).to_string(),
            "rating 7 is outside the 1..=5 range"
        );
    }

    #[test]
    fn test_synthesis_display_names_model() {
        let e = ChatError::Synthesis {
            model: "GPT-4".to_string(),
            reason: "boom".to_string(),
        };
        assert_eq!(e.to_string(), "GPT-4 failed: boom");
    }

    #[test]
    fn test_duplicate_id_display() {
        let e = ChatError::DuplicateId {
            kind: "project",
            id: "x".to_string(),
        };
        assert_eq!(e.to_string(), "duplicate project id 'x'");
    }

    #[test]
    fn test_corrupt_keeps_source() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e = ChatError::Corrupt {
            key: "chat-projects".to_string(),
            source,
        };
        assert!(e.to_string().starts_with("stored value under 'chat-projects' is corrupt"));
        assert!(std::error::Error::source(&e).is_some());
    }

    #[test]
    fn test_io_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let e: ChatError = io.into();
        assert!(matches!(e, ChatError::Io(_)));
    }

    #[test]
    fn test_toml_error_becomes_config() {
        let err = toml::from_str::<toml::Value>("models = [").unwrap_err();
        let e: ChatError = err.into();
        assert!(matches!(e, ChatError::Config(_)));
    }
}
