use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;

use crate::error::ChatError;

// -- Model catalog ----------------------------------------------------------

/// The simulated providers with canned response templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownModel {
    Gpt4,
    Claude3,
    GeminiPro,
}

impl KnownModel {
    pub const ALL: [KnownModel; 3] = [KnownModel::Gpt4, KnownModel::Claude3, KnownModel::GeminiPro];

    /// Display name as it appears in stored responses.
    pub fn name(self) -> &'static str {
        match self {
            KnownModel::Gpt4 => "GPT-4",
            KnownModel::Claude3 => "Claude-3",
            KnownModel::GeminiPro => "Gemini-Pro",
        }
    }

    /// Exact-match lookup by display name.
    pub fn from_name(name: &str) -> Option<Self> {
        KnownModel::ALL.into_iter().find(|m| m.name() == name)
    }
}

impl std::fmt::Display for KnownModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The model list used when neither config nor CLI names one.
pub fn default_models() -> Vec<String> {
    KnownModel::ALL.iter().map(|m| m.name().to_string()).collect()
}

// -- Synthesizer ------------------------------------------------------------

/// Produce the canned response `model` gives to `message`.
///
/// Pure and total: unknown models get a generic line naming the model.
pub fn synthesize(message: &str, model: &str) -> String {
    match KnownModel::from_name(model) {
        Some(KnownModel::Gpt4) => format!(
            "GPT-4 response to \"{message}\": This is a comprehensive analysis of your question. \
             I'll break it down systematically and provide detailed insights based on my training data."
        ),
        Some(KnownModel::Claude3) => format!(
            "Claude-3 response to \"{message}\": I appreciate your question. Let me provide a \
             thoughtful and nuanced perspective on this topic, considering multiple viewpoints."
        ),
        Some(KnownModel::GeminiPro) => format!(
            "Gemini-Pro response to \"{message}\": Here's my take on your query. I'll combine \
             factual information with creative problem-solving to give you a well-rounded answer."
        ),
        None => format!("Response from {model}"),
    }
}

// -- Response sources -------------------------------------------------------

/// Something that can answer a prompt as a given model.
///
/// The dispatcher owns latency and timeouts; implementations only produce text.
#[async_trait]
pub trait ResponseSource: Send + Sync {
    async fn respond(&self, prompt: &str, model: &str) -> Result<String, ChatError>;
}

/// Answers every model locally through [`synthesize`]. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedSource;

#[async_trait]
impl ResponseSource for SimulatedSource {
    async fn respond(&self, prompt: &str, model: &str) -> Result<String, ChatError> {
        Ok(synthesize(prompt, model))
    }
}

// -- Latency ----------------------------------------------------------------

/// Injected per-response delay, sampled uniformly from `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Latency {
    pub min: Duration,
    pub max: Duration,
}

impl Default for Latency {
    fn default() -> Self {
        Latency {
            min: Duration::from_millis(1000),
            max: Duration::from_millis(3000),
        }
    }
}

impl Latency {
    pub fn none() -> Self {
        Latency {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Latency {
            min: Duration::from_millis(min_ms),
            max: Duration::from_millis(max_ms),
        }
    }

    /// Draw one delay. A degenerate range (`max <= min`) always yields `min`.
    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..self.max)
    }
}
