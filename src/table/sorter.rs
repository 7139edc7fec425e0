//! Record sorting for paged queries
//!
//! Sorts a copied record sequence by one property, deterministically.

use std::cmp::Ordering;

use serde_json::Value;

/// Sorts records by a single property
pub struct RecordSorter;

impl RecordSorter {
    /// Stable-sort records by `property`, ascending or descending.
    ///
    /// Ties keep their insertion order (`sort_by` is stable). Callers verify
    /// the property exists on every record before sorting.
    pub fn sort_by_property(records: &mut [Value], property: &str, descending: bool) {
        records.sort_by(|a, b| {
            let ordering = Self::compare_values(a.get(property), b.get(property));
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }

    /// Compares two JSON values, totally ordered.
    ///
    /// Ordering rules:
    /// - missing < null < bool < number < string < array < object
    /// - For same types, natural ordering; arrays and objects tie
    pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a_val), Some(b_val)) => {
                let type_order = |v: &Value| -> u8 {
                    match v {
                        Value::Null => 0,
                        Value::Bool(_) => 1,
                        Value::Number(_) => 2,
                        Value::String(_) => 3,
                        Value::Array(_) => 4,
                        Value::Object(_) => 5,
                    }
                };

                let a_type = type_order(a_val);
                let b_type = type_order(b_val);

                if a_type != b_type {
                    return a_type.cmp(&b_type);
                }

                match (a_val, b_val) {
                    (Value::Bool(a_b), Value::Bool(b_b)) => a_b.cmp(b_b),
                    (Value::Number(a_n), Value::Number(b_n)) => {
                        let a_f = a_n.as_f64().unwrap_or(0.0);
                        let b_f = b_n.as_f64().unwrap_or(0.0);
                        a_f.partial_cmp(&b_f).unwrap_or(Ordering::Equal)
                    }
                    (Value::String(a_s), Value::String(b_s)) => a_s.cmp(b_s),
                    _ => Ordering::Equal,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sort_ascending() {
        let mut records = vec![
            json!({"name": "c"}),
            json!({"name": "a"}),
            json!({"name": "b"}),
        ];
        RecordSorter::sort_by_property(&mut records, "name", false);
        assert_eq!(records[0]["name"], "a");
        assert_eq!(records[1]["name"], "b");
        assert_eq!(records[2]["name"], "c");
    }

    #[test]
    fn test_sort_descending() {
        let mut records = vec![json!({"age": 20}), json!({"age": 30}), json!({"age": 25})];
        RecordSorter::sort_by_property(&mut records, "age", true);
        assert_eq!(records[0]["age"], 30);
        assert_eq!(records[1]["age"], 25);
        assert_eq!(records[2]["age"], 20);
    }

    #[test]
    fn test_sort_stable_on_ties() {
        let mut records = vec![
            json!({"age": 25, "id": 1}),
            json!({"age": 25, "id": 2}),
            json!({"age": 25, "id": 3}),
        ];
        RecordSorter::sort_by_property(&mut records, "age", false);
        assert_eq!(records[0]["id"], 1);
        assert_eq!(records[1]["id"], 2);
        assert_eq!(records[2]["id"], 3);
    }

    #[test]
    fn test_mixed_types_order_by_type_class() {
        let mut records = vec![
            json!({"v": "text"}),
            json!({"v": 7}),
            json!({"v": true}),
        ];
        RecordSorter::sort_by_property(&mut records, "v", false);
        assert_eq!(records[0]["v"], true);
        assert_eq!(records[1]["v"], 7);
        assert_eq!(records[2]["v"], "text");
    }
}
