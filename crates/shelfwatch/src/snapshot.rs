//! Observed product state.
//!
//! A [`Snapshot`] is built once per successful fetch. The field contract is
//! fixed: `price` (number), `in_stock` (boolean) and `name` (string) are the
//! only fields the diff engine looks at. Each is optional, but when present it
//! must carry the right type, which is checked here at the source boundary.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

pub const PRICE: &str = "price";
pub const IN_STOCK: &str = "in_stock";
pub const NAME: &str = "name";

/// Canonical fields in diff order
pub const CANONICAL_FIELDS: [&str; 3] = [PRICE, IN_STOCK, NAME];

/// A single extracted field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            FieldValue::Bool(_) => "boolean",
            FieldValue::Number(_) => "number",
            FieldValue::Text(_) => "string",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

/// Field name to value mapping, ordered by field name
pub type FieldMap = BTreeMap<String, FieldValue>;

/// Immutable observation of one target at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    target_id: String,
    timestamp: DateTime<Utc>,
    fields: FieldMap,
}

impl Snapshot {
    /// Validate raw fields against the product contract and stamp them with
    /// the current time
    pub fn from_fields(target_id: impl Into<String>, fields: FieldMap) -> Result<Self, FetchError> {
        Self::from_fields_at(target_id, fields, Utc::now())
    }

    /// Same as [`Snapshot::from_fields`] with an explicit observation time
    pub fn from_fields_at(
        target_id: impl Into<String>,
        fields: FieldMap,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, FetchError> {
        validate_contract(&fields)?;

        Ok(Self { target_id: target_id.into(), timestamp, fields })
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn price(&self) -> Option<f64> {
        self.get(PRICE).and_then(FieldValue::as_f64)
    }

    pub fn in_stock(&self) -> Option<bool> {
        self.get(IN_STOCK).and_then(FieldValue::as_bool)
    }

    pub fn name(&self) -> Option<&str> {
        self.get(NAME).and_then(FieldValue::as_str)
    }
}

fn validate_contract(fields: &FieldMap) -> Result<(), FetchError> {
    let expectations: [(&str, fn(&FieldValue) -> bool, &str); 3] = [
        (PRICE, |v| v.as_f64().is_some_and(f64::is_finite), "finite number"),
        (IN_STOCK, |v| v.as_bool().is_some(), "boolean"),
        (NAME, |v| v.as_str().is_some(), "string"),
    ];

    let mut present = 0;
    for (field, accepts, expected) in expectations {
        if let Some(value) = fields.get(field) {
            if !accepts(value) {
                return Err(FetchError::Schema(format!(
                    "field '{field}' must be a {expected}, got {}",
                    value.kind()
                )));
            }
            present += 1;
        }
    }

    if present == 0 {
        return Err(FetchError::Schema("none of price, in_stock or name were found".to_string()));
    }

    Ok(())
}
