//! Response key filtering and scoring.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum KeyPreset {
    AllKeys,
    NoKeys,
}

/// Which key presses count as a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ResponseKeys {
    Preset(KeyPreset),
    Keys(Vec<String>),
}

impl Default for ResponseKeys {
    fn default() -> Self {
        ResponseKeys::Preset(KeyPreset::AllKeys)
    }
}

impl ResponseKeys {
    /// Key comparison is case-insensitive ("A" and "a" are the same key).
    pub fn accepts(&self, key: &str) -> bool {
        match self {
            ResponseKeys::Preset(KeyPreset::AllKeys) => true,
            ResponseKeys::Preset(KeyPreset::NoKeys) => false,
            ResponseKeys::Keys(keys) => keys.iter().any(|k| k.eq_ignore_ascii_case(key)),
        }
    }

    /// True when no key can ever end the trial.
    pub fn is_empty(&self) -> bool {
        match self {
            ResponseKeys::Preset(KeyPreset::AllKeys) => false,
            ResponseKeys::Preset(KeyPreset::NoKeys) => true,
            ResponseKeys::Keys(keys) => keys.is_empty(),
        }
    }
}

/// One key or a list of keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum KeyList {
    One(String),
    Many(Vec<String>),
}

impl Default for KeyList {
    fn default() -> Self {
        KeyList::Many(Vec::new())
    }
}

impl KeyList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            KeyList::One(key) => vec![key],
            KeyList::Many(keys) => keys,
        }
    }
}

/// What ended the response window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrialResponse {
    Key { key: String, rt_ms: f64 },
    Timeout,
}

impl TrialResponse {
    pub fn key(&self) -> Option<&str> {
        match self {
            TrialResponse::Key { key, .. } => Some(key),
            TrialResponse::Timeout => None,
        }
    }

    pub fn rt_ms(&self) -> Option<f64> {
        match self {
            TrialResponse::Key { rt_ms, .. } => Some(*rt_ms),
            TrialResponse::Timeout => None,
        }
    }
}

/// A response is correct when the pressed key is one of the correct keys.
/// A timeout is never correct.
pub fn is_correct(response: &TrialResponse, correct_choice: &[String]) -> bool {
    response
        .key()
        .map(|key| correct_choice.iter().any(|c| c.eq_ignore_ascii_case(key)))
        .unwrap_or(false)
}
