//! Builds model requests from page text and configuration

use crate::config::ModelConfig;
use crate::extract::model::{LanguageModel, ModelRequest};
use crate::extract::prompt::{user_prompt, DescriptionStyle, SYSTEM_PROMPT};
use crate::ExtractionError;
use std::sync::Arc;

/// Turns normalized page text into raw model output
#[derive(Clone)]
pub struct ExtractionClient {
    model: Arc<dyn LanguageModel>,
    max_output_tokens: u32,
    temperature: f32,
}

impl ExtractionClient {
    pub fn new(model: Arc<dyn LanguageModel>, config: &ModelConfig) -> Self {
        Self {
            model,
            max_output_tokens: config.max_output_tokens,
            temperature: config.temperature,
        }
    }

    /// Builds the request sent to the model for one page
    pub fn build_request(&self, text: &str, source_url: &str, style: DescriptionStyle) -> ModelRequest {
        ModelRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: user_prompt(text, source_url, style),
            max_output_tokens: self.max_output_tokens,
            temperature: self.temperature,
        }
    }

    /// Asks the model for the event on a page
    ///
    /// The returned text is expected, not guaranteed, to encode a JSON
    /// object; pass it through `parse_response`. Failures are not retried.
    pub async fn extract(
        &self,
        text: &str,
        source_url: &str,
        style: DescriptionStyle,
    ) -> Result<String, ExtractionError> {
        let request = self.build_request(text, source_url, style);

        tracing::info!(url = %source_url, style = %style, "Extracting event with model");

        match self.model.complete(&request).await {
            Ok(output) => {
                tracing::debug!(output = %output, "Model response");
                Ok(output)
            }
            Err(e) => {
                tracing::error!(url = %source_url, error = %e, "Model call failed");
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for ExtractionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionClient")
            .field("max_output_tokens", &self.max_output_tokens)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}
