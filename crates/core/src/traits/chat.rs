//! Chat model interface

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Per-call generation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Sampling temperature; the pipeline runs low (0.0 - 0.1) everywhere
    pub temperature: f32,
    /// Output token cap
    pub max_output_tokens: usize,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_output_tokens: 200,
        }
    }
}

impl GenerationOptions {
    pub fn new(temperature: f32, max_output_tokens: usize) -> Self {
        Self {
            temperature,
            max_output_tokens,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: usize) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }
}

/// Text generation backend
///
/// Implementations wrap an external chat model behind a single prompt-in,
/// text-out call. Failures surface as `Error::Chat`; callers are expected
/// to degrade to deterministic fallbacks rather than propagate.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate a completion for `prompt`
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String>;

    /// Model identifier for logging
    fn model_name(&self) -> &str;
}
