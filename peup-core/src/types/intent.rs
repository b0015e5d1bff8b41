//! Structured intents.
//!
//! An intent names what the caller wants to do (`action`), against which
//! service (`scope`), with which parameters, and how the answer should be
//! encoded.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::constants::PROTOAI_INTENT_VERSION;
use crate::error::{PeupError, Result};

/// What the caller wants to do with the scope.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Look something up (the default)
    #[default]
    #[serde(rename = "SEARCH", alias = "BUSCAR", alias = "search")]
    Search,
    /// Create a resource
    #[serde(rename = "CREATE", alias = "CRIAR", alias = "create")]
    Create,
    /// Update a resource
    #[serde(rename = "UPDATE", alias = "ATUALIZAR", alias = "update")]
    Update,
    /// Delete a resource
    #[serde(rename = "DELETE", alias = "DELETAR", alias = "delete")]
    Delete,
}

/// Encoding of the manifest returned to the caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseFormat {
    /// JSON document
    #[default]
    #[serde(rename = "json")]
    Json,
    /// Compact binary encoding
    #[serde(rename = "binary", alias = "protobuf")]
    Binary,
}

/// Parameters attached to an intent.
///
/// The recognized keys are typed. Anything else lands in `extra` untouched;
/// the gateway never interprets it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentParameters {
    /// Kind of project the caller is after (e.g. "web", "mobile")
    #[serde(default, alias = "tipo", skip_serializing_if = "Option::is_none")]
    pub project_type: Option<String>,
    /// Programming language filter
    #[serde(default, alias = "linguagem", skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Interface kind filter (e.g. "cli", "gui")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
    /// Numeric level filter
    #[serde(
        default,
        deserialize_with = "lenient_i64",
        skip_serializing_if = "Option::is_none"
    )]
    pub level: Option<i64>,
    /// Only return featured entries
    #[serde(
        default,
        deserialize_with = "lenient_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub only_featured: Option<bool>,
    /// Unrecognized keys, preserved verbatim
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl IntentParameters {
    /// Returns true if no parameter is set.
    pub fn is_empty(&self) -> bool {
        self.project_type.is_none()
            && self.language.is_none()
            && self.interface.is_none()
            && self.level.is_none()
            && self.only_featured.is_none()
            && self.extra.is_empty()
    }
}

// Form-style clients send every value as a string.
fn lenient_i64<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("level out of range: {}", n))),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("level is not a number: {}", s))),
        Some(other) => Err(D::Error::custom(format!("invalid level: {}", other))),
    }
}

fn lenient_bool<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(b)),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Some(true)),
            "false" | "0" | "no" => Ok(Some(false)),
            _ => Err(D::Error::custom(format!("only_featured is not a boolean: {}", s))),
        },
        Some(other) => Err(D::Error::custom(format!("invalid only_featured: {}", other))),
    }
}

fn default_intent_version() -> String {
    PROTOAI_INTENT_VERSION.to_string()
}

/// A structured intent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    /// Intent protocol version
    #[serde(default = "default_intent_version")]
    pub protoai_intent: String,
    /// Requested action
    #[serde(default)]
    pub action: Action,
    /// Target scope (service or resource name)
    #[serde(default)]
    pub scope: String,
    /// Action parameters
    #[serde(default)]
    pub parameters: IntentParameters,
    /// Encoding of the response
    #[serde(default)]
    pub response_format: ResponseFormat,
    /// Optional free text to be turned into a structured intent upstream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl Intent {
    /// Creates an intent for the given action and scope.
    pub fn new(action: Action, scope: impl Into<String>) -> Self {
        Self {
            protoai_intent: default_intent_version(),
            action,
            scope: scope.into(),
            parameters: IntentParameters::default(),
            response_format: ResponseFormat::default(),
            query: None,
        }
    }

    /// Sets the response format.
    pub fn with_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }

    /// Returns the scope with surrounding whitespace removed.
    pub fn scope(&self) -> &str {
        self.scope.trim()
    }

    /// Returns true if the intent only carries free text and must be
    /// interpreted before it can be routed.
    pub fn needs_interpretation(&self) -> bool {
        self.scope().is_empty()
            && self
                .query
                .as_deref()
                .map(|q| !q.trim().is_empty())
                .unwrap_or(false)
    }

    /// Validates the intent before it reaches the cache.
    pub fn validate(&self) -> Result<()> {
        validate_scope(&self.scope)
    }
}

/// Checks that `scope` can be used as a cache key and registry name.
pub fn validate_scope(scope: &str) -> Result<()> {
    let scope = scope.trim();
    if scope.is_empty() {
        return Err(PeupError::InvalidInput("scope is required".into()));
    }

    if scope.chars().any(|c| c.is_control() || c == '/') {
        return Err(PeupError::InvalidInput(format!(
            "scope contains invalid characters: {:?}",
            scope
        )));
    }

    Ok(())
}
