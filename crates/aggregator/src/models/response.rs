use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::payload::Payload;

/// Merged result of one aggregation.
///
/// Wire shape: `{"data": {category: payload}, "errors": [..], "timestamp": "<ISO-8601>"}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AggregatedResponse {
    /// Payload per category, only for providers that returned data
    pub data: HashMap<String, Payload>,

    /// One message per failed provider, in completion order
    pub errors: Vec<String>,

    /// When the response was assembled
    pub timestamp: DateTime<Utc>,
}

impl AggregatedResponse {
    pub fn new(data: HashMap<String, Payload>, errors: Vec<String>) -> Self {
        Self {
            data,
            errors,
            timestamp: Utc::now(),
        }
    }

    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let mut data = HashMap::new();
        data.insert(
            "weather".to_string(),
            Payload::Single(json!({"city": "London"})),
        );
        let response =
            AggregatedResponse::new(data, vec!["Failed to fetch from NewsAPI".to_string()]);

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["data"]["weather"], json!({"city": "London"}));
        assert_eq!(value["errors"], json!(["Failed to fetch from NewsAPI"]));

        let timestamp = value["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(timestamp).is_ok());
        assert!(response.is_partial());
    }
}
