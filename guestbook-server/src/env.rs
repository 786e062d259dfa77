//! Process environment snapshot for the `/env` endpoint

use std::collections::BTreeMap;

use serde::Serialize;

/// Variable name to value, serialized as a JSON object with sorted keys
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EnvironmentSnapshot(BTreeMap<String, String>);

impl EnvironmentSnapshot {
    /// Read the environment as it is right now.
    ///
    /// Names or values that are not valid Unicode are converted lossily.
    pub fn capture() -> Self {
        Self(
            std::env::vars_os()
                .map(|(name, value)| {
                    (
                        name.to_string_lossy().into_owned(),
                        value.to_string_lossy().into_owned(),
                    )
                })
                .collect(),
        )
    }

    /// Build from raw `NAME=VALUE` entries, splitting on the first `=` only.
    /// An entry without `=` maps to an empty value.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            entries
                .into_iter()
                .map(|entry| {
                    let entry = entry.as_ref();
                    match entry.split_once('=') {
                        Some((name, value)) => (name.to_string(), value.to_string()),
                        None => (entry.to_string(), String::new()),
                    }
                })
                .collect(),
        )
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
