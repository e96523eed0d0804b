//! Event draft validation
//!
//! Splits problems into hard errors (the draft cannot be scheduled) and soft
//! warnings (the draft is usable but a human should look at it).
//!
//! | Condition | Result |
//! |-----------|--------|
//! | input is not JSON / not an object | one error, nothing else checked |
//! | required field absent | error `Missing required field: {field}` |
//! | required field empty or falsy | warning `Empty value for field: {field}` |
//! | `start_time`/`end_time` not ISO-8601 | error `Invalid {field} format: ...` |

use crate::draft::REQUIRED_FIELDS;
use crate::extract::json_kind;
use crate::ValidationFailure;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::{Map, Value};

/// Fields that must parse as ISO-8601 when present and non-empty
pub const DATETIME_FIELDS: [&str; 2] = ["start_time", "end_time"];

/// Input accepted by `validate`
#[derive(Debug, Clone, Copy)]
pub enum Candidate<'a> {
    /// JSON-encoded text, usually sanitized model output
    Text(&'a str),
    /// An already decoded value
    Value(&'a Value),
}

/// Outcome of validation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    fn single_error(message: String) -> Self {
        Self {
            errors: vec![message],
            warnings: Vec::new(),
        }
    }

    /// No errors; warnings allowed
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Neither errors nor warnings
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    /// Converts a result with errors into a `ValidationFailure`
    ///
    /// Returns `Ok(warnings)` when there are no errors.
    pub fn into_outcome(self, parsed: Value) -> Result<Vec<String>, ValidationFailure> {
        if self.errors.is_empty() {
            Ok(self.warnings)
        } else {
            Err(ValidationFailure {
                issues: self.errors,
                parsed,
            })
        }
    }
}

/// Validates a candidate event
///
/// # Example
///
/// ```
/// use linkcal::validate::{validate, Candidate};
///
/// let result = validate(Candidate::Text(r#"{"title": "x"}"#));
/// assert!(result.errors.contains(&"Missing required field: location".to_string()));
/// ```
pub fn validate(candidate: Candidate<'_>) -> ValidationResult {
    let decoded: Value;
    let value = match candidate {
        Candidate::Text(text) => match serde_json::from_str::<Value>(text) {
            Ok(v) => {
                decoded = v;
                &decoded
            }
            Err(e) => {
                tracing::warn!(error = %e, "Candidate is not valid JSON");
                return ValidationResult::single_error(format!(
                    "Failed to parse AI response as JSON: {}",
                    e
                ));
            }
        },
        Candidate::Value(v) => v,
    };

    match value.as_object() {
        Some(object) => validate_object(object),
        None => ValidationResult::single_error(format!(
            "Expected a JSON object, got {}",
            json_kind(value)
        )),
    }
}

/// Validates a decoded JSON object
pub fn validate_object(object: &Map<String, Value>) -> ValidationResult {
    let mut result = ValidationResult::default();

    for field in REQUIRED_FIELDS {
        match object.get(field) {
            None => result.errors.push(format!("Missing required field: {}", field)),
            Some(value) if is_falsy(value) => {
                result.warnings.push(format!("Empty value for field: {}", field))
            }
            Some(_) => {}
        }
    }

    for field in DATETIME_FIELDS {
        let Some(value) = object.get(field).filter(|v| !is_falsy(v)) else {
            continue;
        };

        let outcome = match value.as_str() {
            Some(text) => parse_iso_datetime(text).map(|_| ()),
            None => Err(format!("expected a string, got {}", json_kind(value))),
        };

        if let Err(detail) = outcome {
            result.errors.push(format!("Invalid {} format: {}", field, detail));
        }
    }

    if !result.is_clean() {
        tracing::debug!(errors = ?result.errors, warnings = ?result.warnings, "Validation issues");
    }

    result
}

/// Values treated as "present but empty"
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f == 0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// A parsed ISO-8601 value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsoDateTime {
    /// Date and time with a UTC offset
    Offset(DateTime<FixedOffset>),
    /// Date and time without an offset
    Naive(NaiveDateTime),
    /// Calendar date only
    Date(NaiveDate),
}

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M%:z", "%Y-%m-%d %H:%M%:z"];

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parses an ISO-8601 date or datetime
///
/// A `Z` suffix is rewritten to `+00:00` first, so `...T10:00:00Z` and
/// `...T10:00:00+00:00` parse to the same instant.
pub fn parse_iso_datetime(value: &str) -> Result<IsoDateTime, String> {
    let normalized = value.trim().replace('Z', "+00:00");

    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Ok(IsoDateTime::Offset(dt));
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&normalized, format) {
            return Ok(IsoDateTime::Offset(dt));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&normalized, format) {
            return Ok(IsoDateTime::Naive(dt));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(&normalized, "%Y-%m-%d") {
        return Ok(IsoDateTime::Date(date));
    }

    Err(format!("'{}' is not an ISO-8601 datetime", value))
}
