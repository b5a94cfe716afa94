/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Read-only configuration sections consumed by chain stages.
//!
//! Configuration-file parsing belongs to the embedding daemon; this module
//! only models the section contract the chain depends on: named sections
//! of string key/value pairs, with absent sections resolving to an empty
//! section of the requested name.

use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// One named configuration section. Cheap to clone and immutable.
#[derive(Clone, Debug, Default)]
pub struct ConfigSection {
    name: String,
    values: Arc<BTreeMap<String, String>>,
}

impl ConfigSection {
    /// Creates an empty section of the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Arc::new(BTreeMap::new()),
        }
    }

    /// Creates a section from key/value pairs.
    pub fn from_pairs(name: impl Into<String>, pairs: &[(&str, &str)]) -> Self {
        let values = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Self {
            name: name.into(),
            values: Arc::new(values),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the value for `key`, or `default` when the key is absent.
    pub fn value(&self, key: &str, default: &str) -> String {
        self.values
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }
}

/// Failures while building a [`ConfigStore`] from serialized input.
#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    NotAnObject,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(err) => write!(f, "unable to parse configuration: {err}"),
            ConfigError::NotAnObject => {
                write!(f, "configuration root must be an object of sections")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Parse(err) => Some(err),
            ConfigError::NotAnObject => None,
        }
    }
}

/// Immutable store of configuration sections, looked up by name.
#[derive(Clone, Debug, Default)]
pub struct ConfigStore {
    sections: Arc<BTreeMap<String, ConfigSection>>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sections(sections: impl IntoIterator<Item = ConfigSection>) -> Self {
        let sections = sections
            .into_iter()
            .map(|section| (section.name().to_string(), section))
            .collect();
        Self {
            sections: Arc::new(sections),
        }
    }

    /// Builds a store from a JSON object string of the shape
    /// `{"section": {"key": "value", ...}, ...}`. Non-string scalar values
    /// are rendered to their canonical string form.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let root: Value = serde_json::from_str(raw).map_err(ConfigError::Parse)?;
        let Value::Object(sections) = root else {
            return Err(ConfigError::NotAnObject);
        };

        let mut parsed = Vec::with_capacity(sections.len());
        for (name, body) in sections {
            let Value::Object(entries) = body else {
                return Err(ConfigError::NotAnObject);
            };
            let values: BTreeMap<String, String> = entries
                .into_iter()
                .map(|(key, value)| {
                    let rendered = match value {
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    (key, rendered)
                })
                .collect();
            parsed.push(ConfigSection {
                name,
                values: Arc::new(values),
            });
        }
        Ok(Self::from_sections(parsed))
    }

    /// Looks up a section by name; an absent section resolves to an empty
    /// section of that name, so callers see uniform value/default lookup.
    pub fn section(&self, name: &str) -> ConfigSection {
        self.sections
            .get(name)
            .cloned()
            .unwrap_or_else(|| ConfigSection::new(name))
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ConfigSection, ConfigStore};

    #[test]
    fn value_falls_back_to_default_for_missing_keys() {
        let section = ConfigSection::from_pairs("tunnel", &[("filter", "queue")]);

        assert_eq!(section.value("filter", "tunnel"), "queue");
        assert_eq!(section.value("filters", ""), "");
    }

    #[test]
    fn absent_section_resolves_to_empty_section_of_that_name() {
        let store = ConfigStore::new();
        let section = store.section("tpuart");

        assert_eq!(section.name(), "tpuart");
        assert_eq!(section.value("device", "/dev/ttyAMA0"), "/dev/ttyAMA0");
    }

    #[test]
    fn from_json_str_accepts_sections_and_renders_scalars() {
        let store = ConfigStore::from_json_str(
            r#"{"link": {"filters": "a,b", "queue-len": 16}, "a": {}}"#,
        )
        .expect("config should parse");

        assert_eq!(store.section("link").value("filters", ""), "a,b");
        assert_eq!(store.section("link").value("queue-len", "0"), "16");
        assert_eq!(store.section("a").name(), "a");
    }

    #[test]
    fn from_json_str_rejects_non_object_roots() {
        let err = ConfigStore::from_json_str(r#"["link"]"#).expect_err("array root must fail");
        assert!(matches!(err, ConfigError::NotAnObject));
    }
}
