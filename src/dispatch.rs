//! Fan-out / fan-in response collection.
//!
//! ## Design
//! - One tokio task per requested model, all owned by a `JoinSet`
//! - Each task sleeps for a sampled [`Latency`] and then asks the
//!   [`ResponseSource`]; the pair runs under a per-task timeout
//! - Results land in a slot keyed by declaration index, so completion order
//!   never leaks into the stored order
//! - A task that errors, times out, or panics yields a placeholder response
//!   in its slot instead of failing the whole message
//!
//! Dropping the `collect` future drops the `JoinSet`, which aborts every task
//! still in flight.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::models::Response;
use crate::providers::{Latency, ResponseSource, SimulatedSource};

/// Default upper bound on a single model's response time.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(30);

/// Text stored in place of a response the model could not deliver.
pub fn placeholder_content(model: &str, reason: &str) -> String {
    format!("{model} is unavailable: {reason}")
}

/// Collects one response per model from a shared [`ResponseSource`].
#[derive(Clone)]
pub struct Dispatcher {
    source: Arc<dyn ResponseSource>,
    latency: Latency,
    task_timeout: Duration,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("latency", &self.latency)
            .field("task_timeout", &self.task_timeout)
            .finish_non_exhaustive()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Dispatcher::new(Arc::new(SimulatedSource))
    }
}

impl Dispatcher {
    pub fn new(source: Arc<dyn ResponseSource>) -> Self {
        Dispatcher {
            source,
            latency: Latency::default(),
            task_timeout: DEFAULT_TASK_TIMEOUT,
        }
    }

    pub fn with_latency(mut self, latency: Latency) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    pub fn latency(&self) -> Latency {
        self.latency
    }

    pub fn task_timeout(&self) -> Duration {
        self.task_timeout
    }

    /// Ask every model in `models` to answer `prompt` and wait for all of them.
    ///
    /// The returned vector has exactly `models.len()` entries, entry `i`
    /// answering as `models[i]` with id `<message_id>-<i>`.
    pub async fn collect(&self, prompt: &str, models: &[String], message_id: &str) -> Vec<Response> {
        let mut tasks = JoinSet::new();

        for (index, model) in models.iter().enumerate() {
            let source = Arc::clone(&self.source);
            let delay = self.latency.sample();
            let timeout = self.task_timeout;
            let prompt = prompt.to_string();
            let model = model.clone();
            tasks.spawn(async move {
                let outcome = tokio::time::timeout(timeout, async {
                    tokio::time::sleep(delay).await;
                    source.respond(&prompt, &model).await
                })
                .await;
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<Response>> = (0..models.len()).map(|_| None).collect();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(Ok(content)))) => {
                    debug!(model = %models[index], index, "response received");
                    slots[index] = Some(Response::new(message_id, index, &models[index], content));
                }
                Ok((index, Ok(Err(e)))) => {
                    warn!(model = %models[index], error = %e, "response source failed; storing placeholder");
                    let content = placeholder_content(&models[index], &e.to_string());
                    slots[index] = Some(Response::new(message_id, index, &models[index], content));
                }
                Ok((index, Err(_elapsed))) => {
                    warn!(
                        model = %models[index],
                        timeout_ms = self.task_timeout.as_millis() as u64,
                        "response timed out; storing placeholder"
                    );
                    let reason = format!("timed out after {}ms", self.task_timeout.as_millis());
                    let content = placeholder_content(&models[index], &reason);
                    slots[index] = Some(Response::new(message_id, index, &models[index], content));
                }
                Err(e) => {
                    // Panicked tasks carry no index; their slot is filled below.
                    warn!(error = %e, "response task did not complete");
                }
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    let content = placeholder_content(&models[index], "task aborted");
                    Response::new(message_id, index, &models[index], content)
                })
            })
            .collect()
    }
}
