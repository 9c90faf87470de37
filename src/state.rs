//! # State core
//!
//! ## Responsibility
//! Owns the project collection, the current selection, and the set of
//! projects with a send in flight.  Every mutation writes the affected keys
//! back through the [`ProjectRepository`] before returning.
//!
//! ## Guarantees
//! - Blank input (message text, project name) and unknown ids are no-ops,
//!   never errors
//! - A message is stored only once every model slot is filled; failed models
//!   are filled with placeholders by the [`Dispatcher`]
//! - At most one send per project is in flight; the guard is released when
//!   the [`PendingSend`] is committed or dropped
//! - The current selection is a lookup key and may dangle; a dangling id
//!   reads as "no current project"
//! - A mutation becomes visible only after the store accepted it; a failed
//!   write leaves the in-memory state as it was

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::analytics::{compute_analytics, summarize_project, Analytics};
use crate::dispatch::Dispatcher;
use crate::error::{ChatError, Result};
use crate::models::{
    check_unique_ids, response_id, Message, Project, ProjectSummary, Rating, Response, Score, DEFAULT_PROJECT_ID,
};
use crate::store::ProjectRepository;

type InFlightSet = Arc<Mutex<HashSet<String>>>;

/// Marks a project as sending until dropped.
#[derive(Debug)]
struct InFlight {
    set: InFlightSet,
    project_id: String,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut guard = self.set.lock().unwrap_or_else(|e| e.into_inner());
        guard.remove(&self.project_id);
    }
}

/// A send admitted by [`ChatState::begin_send`] and awaiting its responses.
///
/// Dropping it without committing abandons the send and frees the project.
#[derive(Debug)]
pub struct PendingSend {
    message_id: String,
    text: String,
    models: Vec<String>,
    guard: InFlight,
}

impl PendingSend {
    pub fn project_id(&self) -> &str {
        &self.guard.project_id
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }
}

pub struct ChatState {
    repo: ProjectRepository,
    dispatcher: Dispatcher,
    models: Vec<String>,
    projects: Vec<Project>,
    current: Option<String>,
    in_flight: InFlightSet,
}

impl ChatState {
    /// Load both keys from `repo`.
    ///
    /// `models` is the known-model list analytics reports on.
    pub fn open(repo: ProjectRepository, dispatcher: Dispatcher, models: Vec<String>) -> Result<Self> {
        let projects = repo.load_projects()?;
        let current = repo.load_current()?;
        debug!(projects = projects.len(), current = ?current, "state loaded");
        Ok(ChatState {
            repo,
            dispatcher,
            models,
            projects,
            current,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    // -- Reads ---------------------------------------------------------------

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The raw selection, which may name a project that no longer exists.
    pub fn current_project_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current_project(&self) -> Option<&Project> {
        let id = self.current.as_deref()?;
        self.projects.iter().find(|p| p.id == id)
    }

    /// Messages of the current project; empty when nothing valid is selected.
    pub fn messages(&self) -> &[Message] {
        self.current_project().map(|p| p.messages.as_slice()).unwrap_or(&[])
    }

    pub fn project_summaries(&self) -> Vec<ProjectSummary> {
        self.projects.iter().map(summarize_project).collect()
    }

    pub fn analytics(&self) -> Analytics {
        compute_analytics(&self.projects, &self.models)
    }

    pub fn is_sending(&self, project_id: &str) -> bool {
        let guard = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        guard.contains(project_id)
    }

    // -- Projects ------------------------------------------------------------

    /// Create and select a project. A blank name is ignored.
    pub fn create_project(&mut self, name: &str) -> Result<Option<Project>> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }
        let project = Project::new(uuid::Uuid::new_v4().to_string(), name);
        let mut projects = self.projects.clone();
        projects.push(project.clone());
        self.apply(projects, Some(project.id.clone()))?;
        info!(id = %project.id, name = %project.name, "project created");
        Ok(Some(project))
    }

    /// Select `id` without checking that it exists.
    pub fn select_project(&mut self, id: &str) -> Result<()> {
        self.repo.save_current(Some(id))?;
        self.current = Some(id.to_string());
        if self.current_project().is_none() {
            debug!(id, "selected id does not resolve to a project");
        }
        Ok(())
    }

    pub fn clear_selection(&mut self) -> Result<()> {
        self.repo.save_current(None)?;
        self.current = None;
        Ok(())
    }

    /// Remove a project. Returns `false` when no project has that id.
    ///
    /// Deleting the selected project moves the selection to the first
    /// remaining project, or clears it.
    pub fn delete_project(&mut self, id: &str) -> Result<bool> {
        let Some(pos) = self.projects.iter().position(|p| p.id == id) else {
            return Ok(false);
        };
        let mut projects = self.projects.clone();
        let removed = projects.remove(pos);
        let current = if self.current.as_deref() == Some(id) {
            projects.first().map(|p| p.id.clone())
        } else {
            self.current.clone()
        };
        self.apply(projects, current)?;
        info!(id = %removed.id, name = %removed.name, current = ?self.current, "project deleted");
        Ok(true)
    }

    /// Replace the whole collection, e.g. from an export document.
    ///
    /// A selection that no longer resolves is cleared. A collection with
    /// duplicate ids is rejected with [`ChatError::DuplicateId`] and nothing
    /// changes.
    pub fn import_projects(&mut self, projects: Vec<Project>) -> Result<()> {
        check_unique_ids(&projects)?;
        let current = self
            .current
            .clone()
            .filter(|id| projects.iter().any(|p| &p.id == id));
        self.apply(projects, current)?;
        info!(projects = self.projects.len(), "projects imported");
        Ok(())
    }

    // -- Sending -------------------------------------------------------------

    /// Admit a send of `text` to the current project.
    ///
    /// Returns `Ok(None)` for blank text. With no valid selection the default
    /// project is reused (or created) and selected first.
    pub fn begin_send(&mut self, text: &str, models: &[String]) -> Result<Option<PendingSend>> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let project_id = self.ensure_target_project()?;

        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(project_id.clone()) {
            return Err(ChatError::SendInProgress(project_id));
        }
        drop(set);

        Ok(Some(PendingSend {
            message_id: uuid::Uuid::new_v4().to_string(),
            text: text.to_string(),
            models: models.to_vec(),
            guard: InFlight {
                set: Arc::clone(&self.in_flight),
                project_id,
            },
        }))
    }

    /// Store the message for `pending` with its collected `responses`.
    ///
    /// The message goes to the project captured at `begin_send`, even if the
    /// selection moved since.  If that project was deleted nothing is stored.
    ///
    /// `responses` must hold exactly one entry per pending model, in model
    /// order, with the positional ids [`Dispatcher::collect`] assigns.
    pub fn commit_send(&mut self, pending: PendingSend, responses: Vec<Response>) -> Result<Message> {
        let project_id = pending.project_id().to_string();
        let pos = self
            .projects
            .iter()
            .position(|p| p.id == project_id)
            .ok_or_else(|| ChatError::ProjectNotFound(project_id.clone()))?;
        check_responses(&pending, &responses)?;

        let message = Message {
            id: pending.message_id.clone(),
            user: pending.text.clone(),
            responses,
            timestamp: Utc::now(),
        };
        let mut projects = self.projects.clone();
        projects[pos].push_message(message.clone());
        self.repo.save_projects(&projects)?;
        self.projects = projects;
        info!(
            project = %project_id,
            message = %message.id,
            responses = message.responses.len(),
            "message sent"
        );
        Ok(message)
    }

    /// Give up on `pending` without storing anything.
    pub fn abandon_send(&mut self, pending: PendingSend) {
        debug!(project = %pending.project_id(), "send abandoned");
    }

    /// Send `text` to every model in `models` and store the resulting message.
    ///
    /// Blank text returns `Ok(None)`.
    pub async fn send_message(&mut self, text: &str, models: &[String]) -> Result<Option<Message>> {
        let Some(pending) = self.begin_send(text, models)? else {
            return Ok(None);
        };
        let responses = self
            .dispatcher
            .collect(pending.text(), pending.models(), pending.message_id())
            .await;
        self.commit_send(pending, responses).map(Some)
    }

    // -- Ratings -------------------------------------------------------------

    /// Rate a response in the current project. Returns `false` when it is not found there.
    pub fn rate_response(&mut self, message_id: &str, response_id: &str, rating: Rating) -> Result<bool> {
        let Some(current) = self.current.clone() else {
            return Ok(false);
        };
        let Some(pos) = self.projects.iter().position(|p| p.id == current) else {
            return Ok(false);
        };
        let mut project = self.projects[pos].clone();
        let Some(response) = project.find_response_mut(message_id, response_id) else {
            return Ok(false);
        };
        response.rating = Score::Rated(rating);
        project.touch();

        let mut projects = self.projects.clone();
        projects[pos] = project;
        self.repo.save_projects(&projects)?;
        self.projects = projects;
        debug!(message = message_id, response = response_id, rating = rating.value(), "response rated");
        Ok(true)
    }

    // -- Internals -----------------------------------------------------------

    fn ensure_target_project(&mut self) -> Result<String> {
        if let Some(p) = self.current_project() {
            return Ok(p.id.clone());
        }
        if let Some(dangling) = self.current.as_deref() {
            warn!(id = dangling, "selected project is gone; falling back to the default project");
        }
        let mut projects = self.projects.clone();
        if !projects.iter().any(|p| p.id == DEFAULT_PROJECT_ID) {
            projects.push(Project::default_project());
            info!("default project created");
        }
        self.apply(projects, Some(DEFAULT_PROJECT_ID.to_string()))?;
        Ok(DEFAULT_PROJECT_ID.to_string())
    }

    /// Write both keys, then install them as the live state.
    fn apply(&mut self, projects: Vec<Project>, current: Option<String>) -> Result<()> {
        self.repo.save_projects(&projects)?;
        self.repo.save_current(current.as_deref())?;
        self.projects = projects;
        self.current = current;
        Ok(())
    }
}

fn check_responses(pending: &PendingSend, responses: &[Response]) -> Result<()> {
    if responses.len() != pending.models.len() {
        return Err(ChatError::ResponseMismatch {
            index: responses.len().min(pending.models.len()),
            reason: format!("expected {} responses, got {}", pending.models.len(), responses.len()),
        });
    }
    for (index, (r, model)) in responses.iter().zip(&pending.models).enumerate() {
        if &r.model != model {
            return Err(ChatError::ResponseMismatch {
                index,
                reason: format!("model '{}' where '{model}' was asked", r.model),
            });
        }
        let expected = response_id(&pending.message_id, index);
        if r.id != expected {
            return Err(ChatError::ResponseMismatch {
                index,
                reason: format!("id '{}' where '{expected}' was expected", r.id),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::Latency;
    use crate::store::MemoryStore;

    fn models() -> Vec<String> {
        vec!["GPT-4".to_string(), "Claude-3".to_string()]
    }

    fn answers(pending: &PendingSend) -> Vec<Response> {
        pending
            .models()
            .iter()
            .enumerate()
            .map(|(i, m)| Response::new(pending.message_id(), i, m, format!("{m} answers")))
            .collect()
    }

    fn state() -> ChatState {
        let repo = ProjectRepository::new(MemoryStore::new());
        let dispatcher = Dispatcher::default().with_latency(Latency::none());
        ChatState::open(repo, dispatcher, models()).unwrap()
    }

    #[test]
    fn test_begin_send_blank_text_is_none() {
        let mut s = state();
        assert!(s.begin_send("   \n", &models()).unwrap().is_none());
        assert!(s.projects().is_empty());
    }

    #[test]
    fn test_begin_send_marks_project_in_flight() {
        let mut s = state();
        let pending = s.begin_send("hi", &models()).unwrap().unwrap();
        assert_eq!(pending.project_id(), DEFAULT_PROJECT_ID);
        assert!(s.is_sending(DEFAULT_PROJECT_ID));
        assert!(matches!(
            s.begin_send("again", &models()),
            Err(ChatError::SendInProgress(id)) if id == DEFAULT_PROJECT_ID
        ));
        s.abandon_send(pending);
        assert!(!s.is_sending(DEFAULT_PROJECT_ID));
    }

    #[test]
    fn test_dropping_pending_releases_project() {
        let mut s = state();
        let pending = s.begin_send("hi", &models()).unwrap().unwrap();
        drop(pending);
        assert!(!s.is_sending(DEFAULT_PROJECT_ID));
        assert!(s.begin_send("hi again", &models()).unwrap().is_some());
    }

    #[test]
    fn test_sends_to_different_projects_may_overlap() {
        let mut s = state();
        let first = s.begin_send("one", &models()).unwrap().unwrap();
        s.create_project("Other").unwrap().unwrap();
        let second = s.begin_send("two", &models()).unwrap().unwrap();
        assert_ne!(first.project_id(), second.project_id());
    }

    #[test]
    fn test_commit_goes_to_captured_project() {
        let mut s = state();
        let pending = s.begin_send("hi", &models()).unwrap().unwrap();
        let other = s.create_project("Elsewhere").unwrap().unwrap();
        let responses = answers(&pending);
        s.commit_send(pending, responses).unwrap();
        assert!(s.messages().is_empty(), "selection moved to {}", other.id);
        s.select_project(DEFAULT_PROJECT_ID).unwrap();
        assert_eq!(s.messages().len(), 1);
    }

    #[test]
    fn test_commit_after_delete_stores_nothing() {
        let mut s = state();
        let pending = s.begin_send("hi", &models()).unwrap().unwrap();
        assert!(s.delete_project(DEFAULT_PROJECT_ID).unwrap());
        let result = s.commit_send(pending, Vec::new());
        assert!(matches!(result, Err(ChatError::ProjectNotFound(id)) if id == DEFAULT_PROJECT_ID));
        assert!(s.projects().is_empty());
        assert!(!s.is_sending(DEFAULT_PROJECT_ID));
    }

    #[test]
    fn test_commit_rejects_missing_responses() {
        let mut s = state();
        let pending = s.begin_send("hi", &models()).unwrap().unwrap();
        let result = s.commit_send(pending, Vec::new());
        assert!(matches!(result, Err(ChatError::ResponseMismatch { index: 0, .. })));
        assert!(s.messages().is_empty());
        assert!(!s.is_sending(DEFAULT_PROJECT_ID));
    }

    #[test]
    fn test_commit_rejects_out_of_order_models() {
        let mut s = state();
        let pending = s.begin_send("hi", &models()).unwrap().unwrap();
        let mut responses = answers(&pending);
        responses.swap(0, 1);
        let result = s.commit_send(pending, responses);
        assert!(matches!(result, Err(ChatError::ResponseMismatch { index: 0, .. })));
        assert!(s.messages().is_empty());
    }

    #[test]
    fn test_commit_rejects_foreign_response_ids() {
        let mut s = state();
        let pending = s.begin_send("hi", &models()).unwrap().unwrap();
        let mut responses = answers(&pending);
        responses[1].id = "elsewhere-1".to_string();
        let result = s.commit_send(pending, responses);
        assert!(matches!(result, Err(ChatError::ResponseMismatch { index: 1, .. })));
        assert!(s.messages().is_empty());
    }

    #[test]
    fn test_dangling_selection_falls_back_to_default() {
        let mut s = state();
        s.select_project("ghost").unwrap();
        assert!(s.messages().is_empty());
        let pending = s.begin_send("hi", &models()).unwrap().unwrap();
        assert_eq!(pending.project_id(), DEFAULT_PROJECT_ID);
        assert_eq!(s.current_project_id(), Some(DEFAULT_PROJECT_ID));
    }

    #[test]
    fn test_default_project_is_reused() {
        let mut s = state();
        drop(s.begin_send("one", &models()).unwrap());
        s.clear_selection().unwrap();
        drop(s.begin_send("two", &models()).unwrap());
        let defaults = s.projects().iter().filter(|p| p.id == DEFAULT_PROJECT_ID).count();
        assert_eq!(defaults, 1);
    }

    #[test]
    fn test_rate_without_selection_is_noop() {
        let mut s = state();
        assert!(!s.rate_response("m", "r", Rating::new(3).unwrap()).unwrap());
    }
}
