//! Extraction pipeline
//!
//! Runs one URL through fetch → normalize → extract → decode → validate.
//! Every stage failure is returned to the caller with its diagnostics; none
//! is retried.

use crate::config::Config;
use crate::draft::{EventDraft, ParsedEvent};
use crate::extract::{parse_response, AnthropicModel, DescriptionStyle, ExtractionClient, LanguageModel};
use crate::fetch::PageFetcher;
use crate::normalize::normalize;
use crate::validate::validate_object;
use crate::PipelineError;
use serde_json::Value;
use std::sync::Arc;

/// The fetch-to-validation pipeline for a single page
#[derive(Debug, Clone)]
pub struct EventPipeline {
    fetcher: PageFetcher,
    extractor: ExtractionClient,
}

impl EventPipeline {
    pub fn new(fetcher: PageFetcher, extractor: ExtractionClient) -> Self {
        Self { fetcher, extractor }
    }

    /// Builds the pipeline with an injected model
    pub fn with_model(config: &Config, model: Arc<dyn LanguageModel>) -> Result<Self, PipelineError> {
        let fetcher = PageFetcher::new(&config.fetch)?;
        let extractor = ExtractionClient::new(model, &config.model);
        Ok(Self::new(fetcher, extractor))
    }

    /// Builds the pipeline against the Anthropic API
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let model = AnthropicModel::new(&config.model)?;
        Self::with_model(config, Arc::new(model))
    }

    /// Extracts and validates the event on `url`
    ///
    /// # Returns
    ///
    /// * `Ok(ParsedEvent)` - usable draft, possibly with warnings
    /// * `Err(PipelineError::Fetch)` - page could not be retrieved
    /// * `Err(PipelineError::Extraction)` - model call failed
    /// * `Err(PipelineError::Malformed)` - model output is not a JSON object
    /// * `Err(PipelineError::Validation)` - structural or datetime errors
    pub async fn parse_event(&self, url: &str, style: DescriptionStyle) -> Result<ParsedEvent, PipelineError> {
        let html = self.fetcher.fetch(url).await?;

        let text = normalize(&html);
        tracing::debug!(url = %url, chars = text.len(), "Normalized page text");

        let raw = self.extractor.extract(&text, url, style).await?;

        let object = parse_response(&raw).map_err(|e| {
            tracing::error!(url = %url, error = %e, "Model output is not a JSON object");
            e
        })?;

        let warnings = validate_object(&object)
            .into_outcome(Value::Object(object.clone()))
            .map_err(|failure| {
                tracing::warn!(url = %url, issues = ?failure.issues, "Validation issues found");
                failure
            })?;

        let draft = EventDraft::from_object(&object);
        tracing::info!(url = %url, title = %draft.title, warnings = warnings.len(), "Event parsed");

        Ok(ParsedEvent { draft, warnings })
    }
}
