// src/report/reconcile.rs

use super::fields::{self, Field};
use super::{amounts_match, round2};
use serde::Serialize;
use serde_json::{Map, Value};

/// Declared summary totals next to the values recomputed from line items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryCheck {
    pub calculated_subtotal: f64,
    pub summary_subtotal: f64,
    pub summary_vat: f64,
    pub summary_total: f64,
    pub expected_total: f64,
    #[serde(rename = "match")]
    pub matched: bool,
}

/// Compare `running_subtotal + vat` against the declared total.
///
/// Never fails: a missing summary, or a field that cannot be read as a
/// number, counts as zero.
pub fn reconcile(summary: Option<&Map<String, Value>>, running_subtotal: f64) -> SummaryCheck {
    let declared = |field: Field| {
        summary
            .and_then(|s| fields::resolve_field(s, field))
            .and_then(|v| fields::coerce_number(field, Some(v)).ok())
            .unwrap_or(0.0)
    };

    let summary_subtotal = declared(Field::Subtotal);
    let summary_vat = declared(Field::Vat);
    let summary_total = declared(Field::Total);

    let expected_total = round2(running_subtotal + summary_vat);

    SummaryCheck {
        calculated_subtotal: round2(running_subtotal),
        summary_subtotal,
        summary_vat,
        summary_total,
        expected_total,
        matched: amounts_match(expected_total, summary_total),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_consistent_summary() {
        let s = obj(json!({ "subtotal": 100, "vat": 20, "total": 120 }));
        let check = reconcile(Some(&s), 100.0);
        assert_eq!(
            check,
            SummaryCheck {
                calculated_subtotal: 100.0,
                summary_subtotal: 100.0,
                summary_vat: 20.0,
                summary_total: 120.0,
                expected_total: 120.0,
                matched: true,
            }
        );
    }

    #[test]
    fn test_total_mismatch() {
        let s = obj(json!({ "Sub Total": "100.00", "Tax": "20.00", "Grand Total": "125.00" }));
        let check = reconcile(Some(&s), 100.0);
        assert_eq!(check.summary_subtotal, 100.0);
        assert_eq!(check.expected_total, 120.0);
        assert_eq!(check.summary_total, 125.0);
        assert!(!check.matched);
    }

    #[test]
    fn test_subtotal_disagreement_does_not_affect_match() {
        // Only the grand total is reconciled; the subtotal is reported for auditing.
        let s = obj(json!({ "subtotal": 90, "vat": 20, "total": 120 }));
        let check = reconcile(Some(&s), 100.0);
        assert_eq!(check.summary_subtotal, 90.0);
        assert!(check.matched);
    }

    #[test]
    fn test_missing_summary_is_all_zero() {
        let check = reconcile(None, 0.0);
        assert_eq!(check.expected_total, 0.0);
        assert_eq!(check.summary_total, 0.0);
        assert!(check.matched);
    }

    #[test]
    fn test_unreadable_fields_count_as_zero() {
        let s = obj(json!({ "vat": "n/a", "total": { "amount": 5 } }));
        let check = reconcile(Some(&s), 12.346);
        assert_eq!(check.summary_vat, 0.0);
        assert_eq!(check.summary_total, 0.0);
        assert_eq!(check.calculated_subtotal, 12.35);
        assert!(!check.matched);
    }
}
