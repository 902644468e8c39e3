use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// One entry of the `GetPipelines` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRecord {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub input_field_instructions: Option<InputFieldInstructions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InputFieldInstructions {
    #[serde(default)]
    pub fields: Vec<FieldRecord>,
}

/// Field descriptor as sent by the server; `kind` is the raw `type` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub min: Option<i64>,
    #[serde(default)]
    pub max: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogError {
    pub kind: CatalogFailureKind,
    pub message: String,
}

impl CatalogError {
    pub fn new(kind: CatalogFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for CatalogError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogFailureKind {
    MissingToken,
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    Decode,
}

impl fmt::Display for CatalogFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogFailureKind::MissingToken => write!(f, "missing access token"),
            CatalogFailureKind::InvalidUrl => write!(f, "invalid url"),
            CatalogFailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            CatalogFailureKind::Timeout => write!(f, "timeout"),
            CatalogFailureKind::Network => write!(f, "network error"),
            CatalogFailureKind::Decode => write!(f, "invalid response body"),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

impl StringOrNumber {
    fn into_string(self) -> String {
        match self {
            StringOrNumber::String(text) => text,
            StringOrNumber::Number(number) => number.to_string(),
        }
    }
}

pub(crate) fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(StringOrNumber::into_string))
}

/// Azure returns some durations as strings, others as numbers.
pub(crate) fn u64_from_string_or_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = StringOrNumber::deserialize(deserializer)?.into_string();
    raw.trim().parse().map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_decodes_camel_case_fields() {
        let json = r#"{
            "id": 7,
            "name": "Deploy",
            "link": "https://x/deploy",
            "inputFieldInstructions": {
                "fields": [
                    {"name": "count", "type": "int", "min": 1, "max": 5},
                    {"name": "branch", "type": "text"}
                ]
            }
        }"#;
        let record: PipelineRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id.as_deref(), Some("7"));
        assert_eq!(record.description, None);
        let fields = record.input_field_instructions.unwrap().fields;
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].kind, "int");
        assert_eq!(fields[0].max, Some(5));
        assert_eq!(fields[1].min, None);
    }

    #[test]
    fn instructions_without_fields_decode_as_empty() {
        let record: PipelineRecord =
            serde_json::from_str(r#"{"name": "Build", "inputFieldInstructions": {}}"#).unwrap();
        assert_eq!(
            record.input_field_instructions,
            Some(InputFieldInstructions::default())
        );
    }
}
