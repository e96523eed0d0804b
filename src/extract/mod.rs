//! Model-assisted event extraction
//!
//! This module contains:
//! - Prompt construction and the description style enumeration
//! - The `LanguageModel` seam and its Anthropic implementation
//! - Sanitization of model output into a JSON payload candidate

mod client;
mod model;
mod prompt;
mod sanitize;

pub use client::ExtractionClient;
pub use model::{AnthropicModel, LanguageModel, ModelRequest};
pub use prompt::{description_preamble, user_prompt, DescriptionStyle, SYSTEM_PROMPT};
pub use sanitize::{json_kind, parse_response, sanitize_response, BOILERPLATE_PREFIXES};
