//! Side-by-side comparison of simulated LLM responses.
//!
//! Questions are grouped into projects. Each question is answered by every
//! configured model at once, each answer can be rated 1 to 5, and analytics
//! are recomputed over the whole collection on demand.
//!
//! ```no_run
//! use multi_llm_chat::{ChatState, Dispatcher, MemoryStore, ProjectRepository};
//! use multi_llm_chat::providers::{default_models, Latency};
//!
//! # async fn demo() -> multi_llm_chat::Result<()> {
//! let repo = ProjectRepository::new(MemoryStore::new());
//! let dispatcher = Dispatcher::default().with_latency(Latency::none());
//! let mut state = ChatState::open(repo, dispatcher, default_models())?;
//! state.create_project("Research")?;
//! let models = state.models().to_vec();
//! let message = state.send_message("What is ownership?", &models).await?;
//! assert_eq!(message.map(|m| m.responses.len()), Some(3));
//! # Ok(())
//! # }
//! ```

pub mod analytics;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod export;
pub mod models;
pub mod providers;
pub mod render;
pub mod search;
pub mod state;
pub mod store;

pub use analytics::{compute_analytics, Analytics, ModelStats, TopRatedResponse};
pub use dispatch::Dispatcher;
pub use error::{ChatError, Result};
pub use models::{Message, Project, ProjectSummary, Rating, Response, Score};
pub use state::{ChatState, PendingSend};
pub use store::{FileStore, KeyValueStore, MemoryStore, ProjectRepository, SqliteStore, StoreBackend};
