use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::core::types::item_label;
use crate::utils::validation::{normalize_value, MAX_FIELDS_PER_REQUIREMENT, MAX_REQUIREMENTS};

#[derive(Error, Debug)]
pub enum RequirementError {
    #[error("Failed to parse requirements: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Requirements must be a JSON array, got {0}")]
    NotAnArray(&'static str),

    #[error("No requirements supplied")]
    Empty,

    #[error("Requirement {index} must be an object, got {kind}")]
    NotAnObject { index: usize, kind: &'static str },

    #[error("Requirement {index} field '{field}' must be a scalar value, got {kind}")]
    InvalidValue {
        index: usize,
        field: String,
        kind: &'static str,
    },

    #[error("Too many requirements: {0} exceeds maximum allowed ({MAX_REQUIREMENTS})")]
    TooMany(usize),

    #[error("Requirement {index} has {count} fields, exceeding maximum allowed ({MAX_FIELDS_PER_REQUIREMENT})")]
    TooManyFields { index: usize, count: usize },
}

/// One line item of a tender's technical scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requirement {
    /// 1-based position in the requirement set
    pub index: usize,

    /// Attribute name -> required value, values trimmed and lowercased
    pub fields: BTreeMap<String, String>,
}

impl Requirement {
    /// Build a requirement, normalizing every value.
    pub fn new<K, V>(index: usize, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: AsRef<str>,
    {
        Self {
            index,
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), normalize_value(v.as_ref())))
                .collect(),
        }
    }

    #[must_use]
    pub fn label(&self) -> String {
        item_label(self.index)
    }
}

/// A validated, non-empty, ordered sequence of requirements.
///
/// This is the trust boundary between whatever produced the requirements
/// (rules, a language model, a person) and the matcher. Anything that is not
/// an array of flat objects with scalar values is rejected outright.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RequirementSet(Vec<Requirement>);

impl RequirementSet {
    /// Parse and validate requirements from JSON text
    ///
    /// # Errors
    ///
    /// Returns `RequirementError::Parse` for invalid JSON, or any of the
    /// shape errors documented on [`RequirementSet::from_value`].
    pub fn from_json(json: &str) -> Result<Self, RequirementError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Validate an untrusted JSON value.
    ///
    /// Scalar values (strings, numbers, booleans) are accepted and
    /// stringified; `null`, arrays and nested objects are rejected.
    ///
    /// # Errors
    ///
    /// Returns `RequirementError::NotAnArray` if the value is not an array,
    /// `RequirementError::Empty` if it is empty, `RequirementError::NotAnObject`
    /// or `RequirementError::InvalidValue` for a malformed record, and
    /// `RequirementError::TooMany`/`TooManyFields` when limits are exceeded.
    pub fn from_value(value: &Value) -> Result<Self, RequirementError> {
        let Value::Array(records) = value else {
            return Err(RequirementError::NotAnArray(json_kind(value)));
        };

        if records.is_empty() {
            return Err(RequirementError::Empty);
        }
        if records.len() > MAX_REQUIREMENTS {
            return Err(RequirementError::TooMany(records.len()));
        }

        let mut requirements = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let index = i + 1;
            let Value::Object(map) = record else {
                return Err(RequirementError::NotAnObject {
                    index,
                    kind: json_kind(record),
                });
            };

            if map.len() > MAX_FIELDS_PER_REQUIREMENT {
                return Err(RequirementError::TooManyFields {
                    index,
                    count: map.len(),
                });
            }

            let mut fields = Vec::with_capacity(map.len());
            for (key, value) in map {
                let text = scalar_text(value).ok_or_else(|| RequirementError::InvalidValue {
                    index,
                    field: key.clone(),
                    kind: json_kind(value),
                })?;
                fields.push((key.clone(), text));
            }
            requirements.push(Requirement::new(index, fields));
        }

        Ok(Self(requirements))
    }

    /// Build from already-structured records, assigning 1-based indexes.
    ///
    /// # Errors
    ///
    /// Returns `RequirementError::Empty` if there are no records, or the
    /// limit errors if the set is too large.
    pub fn from_records<I, R, K, V>(records: I) -> Result<Self, RequirementError>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut requirements = Vec::new();
        for (i, record) in records.into_iter().enumerate() {
            if requirements.len() >= MAX_REQUIREMENTS {
                return Err(RequirementError::TooMany(i + 1));
            }
            let requirement = Requirement::new(i + 1, record);
            if requirement.fields.len() > MAX_FIELDS_PER_REQUIREMENT {
                return Err(RequirementError::TooManyFields {
                    index: i + 1,
                    count: requirement.fields.len(),
                });
            }
            requirements.push(requirement);
        }

        if requirements.is_empty() {
            return Err(RequirementError::Empty);
        }
        Ok(Self(requirements))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Requirement> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a RequirementSet {
    type Item = &'a Requirement;
    type IntoIter = std::slice::Iter<'a, Requirement>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Name of a JSON value's type, for error messages
#[must_use]
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
