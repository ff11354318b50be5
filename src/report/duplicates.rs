// src/report/duplicates.rs

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

/// Purchase-order references that occur more than once.
///
/// Values are compared exactly as given: `" PO-1 "` and `"PO-1"` are
/// different references, as are `4500` and `"4500"`. `null` and blank
/// strings are not references. Each duplicate is listed once, by its text,
/// in order of first occurrence; how often it repeats is not reported.
pub fn find_duplicates(po_numbers: &[Value]) -> Vec<String> {
    // Keyed by the JSON encoding, so strings and numbers never collide.
    let mut counts: IndexMap<String, (&Value, usize)> = IndexMap::new();
    for po in po_numbers.iter().filter(|v| !is_missing(v)) {
        counts.entry(po.to_string()).or_insert((po, 0)).1 += 1;
    }

    counts
        .into_values()
        .filter(|(_, n)| *n > 1)
        .map(|(po, _)| po_text(po))
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

fn is_missing(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn po_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    fn dupes(v: Value) -> HashSet<String> {
        match v {
            Value::Array(a) => find_duplicates(&a).into_iter().collect(),
            _ => panic!("not an array"),
        }
    }

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_duplicate() {
        assert_eq!(dupes(json!(["PO-1", "PO-2", "PO-1"])), set(&["PO-1"]));
    }

    #[test]
    fn test_no_repeats() {
        assert!(dupes(json!(["PO-1", "PO-2", "PO-3"])).is_empty());
        assert!(dupes(json!([])).is_empty());
    }

    #[test]
    fn test_each_duplicate_listed_once() {
        let out = find_duplicates(&[json!("A"), json!("B"), json!("A"), json!("B"), json!("A")]);
        assert_eq!(out.len(), 2);
        assert_eq!(out.into_iter().collect::<HashSet<_>>(), set(&["A", "B"]));
    }

    #[test]
    fn test_numbers_and_blanks() {
        assert!(dupes(json!([4500, "4500", null, null, " ", " "])).is_empty());
        assert_eq!(dupes(json!([4500, 4500, "4501", "4501"])), set(&["4500", "4501"]));
    }

    #[test]
    fn test_values_compared_untrimmed() {
        assert!(dupes(json!(["PO-1", " PO-1 ", "po-1"])).is_empty());
        assert_eq!(find_duplicates(&[json!(" PO-1 "), json!(" PO-1 ")]), vec![" PO-1 ".to_string()]);
    }

    #[test]
    fn test_same_text_from_number_and_string_listed_once() {
        let out = find_duplicates(&[json!(7), json!("7"), json!(7), json!("7")]);
        assert_eq!(out, vec!["7".to_string()]);
    }
}
