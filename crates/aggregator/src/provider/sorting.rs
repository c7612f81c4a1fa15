//! Field-based reordering shared by sortable providers.

use std::cmp::Ordering;

use serde_json::Value;

use crate::models::{Payload, SortOrder};

/// Reorder a list payload by the value of `field` in each record.
///
/// Numbers compare numerically, strings lexicographically (so ISO-8601
/// dates order chronologically). Records missing the field sort last in
/// both directions. The sort is stable. Field lookup ignores case.
/// Single-record payloads are returned unchanged.
pub fn sort_records(payload: Payload, field: &str, order: SortOrder) -> Payload {
    match payload {
        Payload::List(mut records) => {
            records.sort_by(|a, b| {
                match (field_value(a, field), field_value(b, field)) {
                    (Some(x), Some(y)) => {
                        let ordering = compare_values(x, y);
                        match order {
                            SortOrder::Ascending => ordering,
                            SortOrder::Descending => ordering.reverse(),
                        }
                    }
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            });
            Payload::List(records)
        }
        single => single,
    }
}

fn field_value<'a>(record: &'a Value, field: &str) -> Option<&'a Value> {
    let object = record.as_object()?;
    let value = object.get(field).or_else(|| {
        object
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(field))
            .map(|(_, value)| value)
    })?;
    (!value.is_null()).then_some(value)
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        // Mixed types: order by rendered text so the result is at least deterministic.
        _ => a.to_string().cmp(&b.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn articles() -> Payload {
        Payload::List(vec![
            json!({"title": "b", "publishedAt": "2024-03-02T10:00:00Z", "score": 3}),
            json!({"title": "a", "publishedAt": "2024-03-05T08:30:00Z", "score": 10}),
            json!({"title": "d"}),
            json!({"title": "c", "publishedAt": "2024-01-15T23:59:59Z", "score": 7}),
        ])
    }

    fn titles(payload: &Payload) -> Vec<&str> {
        payload
            .as_list()
            .unwrap()
            .iter()
            .map(|r| r["title"].as_str().unwrap())
            .collect()
    }

    #[test]
    fn test_sort_by_date_descending() {
        let sorted = sort_records(articles(), "publishedAt", SortOrder::Descending);
        assert_eq!(titles(&sorted), vec!["a", "b", "c", "d"]);

        let dates: Vec<&str> = sorted
            .as_list()
            .unwrap()
            .iter()
            .filter_map(|r| r["publishedAt"].as_str())
            .collect();
        for pair in dates.windows(2) {
            assert!(pair[0] >= pair[1], "{} before {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_sort_by_number_ascending() {
        let sorted = sort_records(articles(), "score", SortOrder::Ascending);
        assert_eq!(titles(&sorted), vec!["b", "c", "a", "d"]);
    }

    #[test]
    fn test_field_lookup_ignores_case() {
        let sorted = sort_records(articles(), "PUBLISHEDAT", SortOrder::Ascending);
        assert_eq!(titles(&sorted), vec!["c", "b", "a", "d"]);
    }

    #[test]
    fn test_unknown_field_keeps_order() {
        let sorted = sort_records(articles(), "author", SortOrder::Descending);
        assert_eq!(titles(&sorted), vec!["b", "a", "d", "c"]);
    }

    #[test]
    fn test_single_payload_untouched() {
        let single = Payload::Single(json!({"city": "London"}));
        assert_eq!(
            sort_records(single.clone(), "city", SortOrder::Ascending),
            single
        );
    }
}
