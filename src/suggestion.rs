//! Schema validation and projection of scraped track matches.
//!
//! Every item of a scraped result batch must satisfy the full wire schema
//! before any of them is shown; a single bad item fails the whole batch.

use serde::{de::Error as _, Deserialize, Deserializer};
use serde_json::Value;

/// Failure of one query run, surfaced to the user as an error status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SuggestionError {
    #[error("search page payload is not valid JSON: {0}")]
    MalformedPayload(String),
    #[error("search results failed validation at {location}: {reason}")]
    SchemaViolation { location: String, reason: String },
    #[error("search request failed: {0}")]
    TransportFailure(String),
}

/// One track match as embedded in the search page.
///
/// Only a handful of fields feed [`Suggestion`]; the rest keep their wire
/// names and are validated so that format drift is caught early.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawSuggestion {
    pub id: String,
    #[serde(rename = "n")]
    pub title: String,
    #[serde(rename = "as", deserialize_with = "non_empty_artists")]
    pub artists: Vec<String>,
    #[serde(rename = "im")]
    pub images: Vec<String>,
    #[serde(rename = "b")]
    pub bpm: f64,
    #[serde(rename = "c")]
    pub camelot: String,
    #[serde(rename = "k")]
    pub key: String,
    pub ac: f64,
    pub an: String,
    #[serde(deserialize_with = "required_nullable")]
    pub cr: Option<String>,
    pub d: f64,
    pub da: f64,
    pub e: f64,
    pub er: Vec<String>,
    pub h: f64,
    pub i: f64,
    pub ie: bool,
    pub is: bool,
    pub kv: f64,
    #[serde(deserialize_with = "required_nullable")]
    pub l: Option<String>,
    pub li: f64,
    pub lo: f64,
    pub p: f64,
    pub r: Vec<String>,
    #[serde(deserialize_with = "required_nullable")]
    pub rd: Option<String>,
    pub s: f64,
}

/// Candidate match shown to the user and used to build the new file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub id: String,
    pub img: String,
    pub artist: String,
    pub title: String,
    pub bpm: String,
    pub camelot: String,
    pub key: String,
}

// The key must be present even when its value is null.
fn required_nullable<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)
}

fn non_empty_artists<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let artists = Vec::<String>::deserialize(deserializer)?;
    if artists.is_empty() {
        return Err(D::Error::custom(
            "artist list `as` must contain at least one element",
        ));
    }
    Ok(artists)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Validates a scraped item list as a whole.
pub fn validate_items(items: &Value) -> Result<Vec<RawSuggestion>, SuggestionError> {
    let Value::Array(items) = items else {
        return Err(SuggestionError::SchemaViolation {
            location: "items".to_string(),
            reason: format!("expected an array, found {}", json_kind(items)),
        });
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            RawSuggestion::deserialize(item).map_err(|error| SuggestionError::SchemaViolation {
                location: format!("items[{index}]"),
                reason: error.to_string(),
            })
        })
        .collect()
}

fn format_bpm(bpm: f64) -> String {
    format!("{bpm}")
}

impl From<&RawSuggestion> for Suggestion {
    fn from(raw: &RawSuggestion) -> Self {
        Self {
            id: raw.id.clone(),
            img: raw.images.first().cloned().unwrap_or_default(),
            artist: raw.artists.first().cloned().unwrap_or_default(),
            title: raw.title.clone(),
            bpm: format_bpm(raw.bpm),
            camelot: raw.camelot.clone(),
            key: raw.key.clone(),
        }
    }
}

/// Projects validated items, preserving their order.
pub fn map_suggestions(items: &[RawSuggestion]) -> Vec<Suggestion> {
    items.iter().map(Suggestion::from).collect()
}

/// Validates a scraped item list and projects it to suggestions.
pub fn suggestions_from_items(items: &Value) -> Result<Vec<Suggestion>, SuggestionError> {
    let validated = validate_items(items)?;
    Ok(map_suggestions(&validated))
}
