//! Prompt construction for event extraction

use serde::{Deserialize, Serialize};
use std::fmt;

/// How long and in what tone the extracted description should be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptionStyle {
    /// Full description with agenda, speakers and notes
    #[default]
    Default,
    /// Two or three sentences suitable for a chat message
    Telegram,
}

impl DescriptionStyle {
    /// Parses a style name, falling back to `Default` for anything unknown
    pub fn parse_lenient(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("telegram") => Self::Telegram,
            _ => Self::Default,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Telegram => "telegram",
        }
    }

    /// The description instruction embedded in the user prompt
    pub fn instruction(&self) -> &'static str {
        match self {
            Self::Default => {
                "A comprehensive description covering every relevant detail of the event, \
                 such as agenda, speakers, requirements or special notes."
            }
            Self::Telegram => {
                "A brief summary of the event in 2-3 sentences at most, covering only what it is, \
                 when it happens and why someone would attend."
            }
        }
    }
}

impl fmt::Display for DescriptionStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// System instruction: JSON only, ISO-8601 datetimes
pub const SYSTEM_PROMPT: &str = "You extract events from webpages. \
Always answer with a single valid JSON object containing exactly the fields \
title, description, start_time, end_time and location. \
Write dates in ISO 8601 format (YYYY-MM-DDTHH:MM:SS+HH:MM). \
Do not add any text before or after the JSON and do not wrap it in code fences.";

/// Required start of every description
pub fn description_preamble(source_url: &str) -> String {
    format!("Source: {}\n\n", source_url)
}

/// Builds the user instruction for one page
pub fn user_prompt(page_text: &str, source_url: &str, style: DescriptionStyle) -> String {
    format!(
        "Extract the event described in the following webpage content.\n\
         Return a JSON object with these fields:\n\
         - title: the event title\n\
         - description: {instruction} The description must start with {preamble:?} followed by the description itself.\n\
         - start_time: start time in ISO 8601 format\n\
         - end_time: end time in ISO 8601 format\n\
         - location: where the event takes place\n\
         \n\
         Return only the JSON object, with no extra text or formatting.\n\
         \n\
         Webpage content:\n\
         {page_text}\n",
        instruction = style.instruction(),
        preamble = description_preamble(source_url),
        page_text = page_text,
    )
}
