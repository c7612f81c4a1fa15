use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Data returned by a provider for its category.
///
/// Providers map their upstream wire format into either one record
/// (current weather) or an ordered list of records (news articles).
/// Serialized untagged so the response carries the bare object or array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    /// Ordered sequence of records
    List(Vec<Value>),

    /// A single record
    Single(Value),
}

impl Payload {
    /// Number of records carried.
    pub fn len(&self) -> usize {
        match self {
            Self::List(records) => records.len(),
            Self::Single(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::List(records) if records.is_empty())
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(records) => Some(records),
            Self::Single(_) => None,
        }
    }

    pub fn as_single(&self) -> Option<&Value> {
        match self {
            Self::Single(record) => Some(record),
            Self::List(_) => None,
        }
    }
}

impl From<Vec<Value>> for Payload {
    fn from(records: Vec<Value>) -> Self {
        Self::List(records)
    }
}

impl From<Value> for Payload {
    fn from(record: Value) -> Self {
        match record {
            Value::Array(records) => Self::List(records),
            other => Self::Single(other),
        }
    }
}
