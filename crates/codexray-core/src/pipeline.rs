use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::chunk::chunk_text;
use crate::error::{AnalysisError, ProviderError};
use crate::prompt::{build_prompt, PromptMode};
use crate::types::{AnalysisRequest, ModelSelection};

pub const DEFAULT_LARGE_INPUT_THRESHOLD: usize = 15_000;
pub const DEFAULT_CHUNK_SIZE: usize = 12_000;

/// Separator placed between chunk summaries when they are merged.
pub const SUMMARY_SEPARATOR: &str = "\n\n---SUMMARY---\n\n";

/// Anything that turns a prompt into model text.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        selection: &ModelSelection,
    ) -> Result<String, ProviderError>;
}

/// Returns the prompt unchanged. Used for dry runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoGenerator;

#[async_trait]
impl Generator for EchoGenerator {
    async fn generate(
        &self,
        prompt: &str,
        _selection: &ModelSelection,
    ) -> Result<String, ProviderError> {
        Ok(prompt.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Inputs longer than this (in chars) are summarized chunk by chunk first.
    pub large_input_threshold: usize,
    /// Per-chunk budget in chars.
    pub chunk_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            large_input_threshold: DEFAULT_LARGE_INPUT_THRESHOLD,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

pub struct AnalysisPipeline<'a> {
    generator: &'a dyn Generator,
    config: PipelineConfig,
}

impl<'a> AnalysisPipeline<'a> {
    pub fn new(generator: &'a dyn Generator, config: PipelineConfig) -> Self {
        Self { generator, config }
    }

    /// Runs one analysis and returns the model's final text.
    ///
    /// Oversized inputs are split, each chunk is summarized in order, and the
    /// merged summaries replace the input for the final prompt. Any provider
    /// failure aborts the whole run.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<String, AnalysisError> {
        if request.input_text.trim().is_empty() {
            return Err(AnalysisError::EmptyInput);
        }

        let selection = &request.model_selection;
        let input_len = request.input_text.chars().count();

        let effective_input = if input_len > self.config.large_input_threshold {
            let chunks = chunk_text(&request.input_text, self.config.chunk_size);
            info!(
                chars = input_len,
                chunks = chunks.len(),
                provider = %selection.provider,
                "input exceeds threshold, summarizing chunks"
            );
            let mut summaries = Vec::with_capacity(chunks.len());
            for (idx, chunk) in chunks.iter().enumerate() {
                let prompt = build_prompt(
                    chunk,
                    &request.options,
                    &request.user_instruction,
                    PromptMode::Summarize,
                );
                debug!(chunk = idx + 1, total = chunks.len(), "summarizing chunk");
                summaries.push(self.generator.generate(&prompt, selection).await?);
            }
            Some(summaries.join(SUMMARY_SEPARATOR))
        } else {
            None
        };

        let prompt = build_prompt(
            effective_input.as_deref().unwrap_or(&request.input_text),
            &request.options,
            &request.user_instruction,
            PromptMode::Analysis,
        );
        debug!(prompt_chars = prompt.len(), "running final analysis");
        let result = self.generator.generate(&prompt, selection).await?;
        Ok(result)
    }
}
