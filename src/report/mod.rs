// src/report/mod.rs

//! Rule-based consistency checks over LLM-extracted invoice JSON.
//!
//! The input has no fixed schema: every lookup goes through the alias table
//! in [`fields`], bad line items become error entries instead of failures,
//! and the optional narrative comes from an injected [`Summarizer`].

pub mod duplicates;
pub mod fields;
pub mod items;
pub mod reconcile;

pub use items::ItemCheck;
pub use reconcile::SummaryCheck;

use crate::error::ReportError;
use async_trait::async_trait;
use fields::Field;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

/// Two amounts agree when they differ by less than a cent.
pub const TOLERANCE: f64 = 0.01;

pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub(crate) fn amounts_match(a: f64, b: f64) -> bool {
    (a - b).abs() < TOLERANCE
}

/// Produces the free-text narrative attached to a report.
///
/// Implementations must not fail: problems are reported inside the
/// returned text.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, invoice: &Value) -> String;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsistencyReport {
    pub item_checks: Vec<ItemCheck>,
    pub summary_check: SummaryCheck,
    pub po_duplicates: Vec<String>,
    pub llm_summary: Option<String>,
}

/// Run every deterministic check. `llm_summary` is left empty.
pub fn check_consistency(invoice: &Value) -> Result<ConsistencyReport, ReportError> {
    let Value::Object(invoice) = invoice else {
        return Err(ReportError::NotAnObject {
            found: fields::type_name(invoice),
        });
    };

    let items: &[Value] = match fields::resolve_field(invoice, Field::Items) {
        Some(Value::Array(items)) => items.as_slice(),
        None => &[],
        Some(v) if fields::is_blank(v) => &[],
        Some(other) => {
            return Err(ReportError::ItemsNotIterable {
                found: fields::type_name(other),
            });
        }
    };
    let validation = items::validate_items(items);

    let summary = match fields::resolve_field(invoice, Field::Summary) {
        Some(Value::Object(s)) => Some(s),
        _ => None,
    };
    let summary_check = reconcile::reconcile(summary, validation.running_subtotal);

    let po_duplicates = duplicates::find_duplicates(po_numbers(invoice));

    info!(
        items = validation.checks.len(),
        invalid_items = validation.checks.iter().filter(|c| c.is_invalid()).count(),
        calculated_subtotal = summary_check.calculated_subtotal,
        expected_total = summary_check.expected_total,
        summary_total = summary_check.summary_total,
        total_match = summary_check.matched,
        po_duplicates = po_duplicates.len(),
        "Consistency checks complete"
    );

    Ok(ConsistencyReport {
        item_checks: validation.checks,
        summary_check,
        po_duplicates,
        llm_summary: None,
    })
}

/// Full report: rule checks, then the narrative over the unmodified input.
///
/// The narrative is skipped when no summarizer is given, and is never
/// attempted for input the checks reject.
pub async fn generate_report(
    invoice: &Value,
    summarizer: Option<&dyn Summarizer>,
) -> Result<ConsistencyReport, ReportError> {
    let mut report = check_consistency(invoice)?;
    if let Some(summarizer) = summarizer {
        report.llm_summary = Some(summarizer.summarize(invoice).await);
    }
    Ok(report)
}

fn po_numbers(invoice: &Map<String, Value>) -> &[Value] {
    match fields::resolve_field(invoice, Field::PoNumbers) {
        Some(Value::Array(list)) => list,
        Some(other) => std::slice::from_ref(other),
        None => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Canned;

    #[async_trait]
    impl Summarizer for Canned {
        async fn summarize(&self, invoice: &Value) -> String {
            format!("{} keys", invoice.as_object().map_or(0, |m| m.len()))
        }
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.239), 1.24);
        assert_eq!(round2(10.004), 10.0);
        assert_eq!(round2(-1.006), -1.01);
    }

    #[test]
    fn test_not_an_object_is_fatal() {
        assert_eq!(
            check_consistency(&json!([1, 2])),
            Err(ReportError::NotAnObject { found: "array" })
        );
    }

    #[test]
    fn test_items_must_be_a_list() {
        assert_eq!(
            check_consistency(&json!({ "items": "three widgets" })),
            Err(ReportError::ItemsNotIterable { found: "string" })
        );
        assert!(check_consistency(&json!({ "items": null })).is_ok());
        assert_eq!(
            check_consistency(&json!({ "items": { "code": "X1" } })),
            Err(ReportError::ItemsNotIterable { found: "object" })
        );
    }

    #[test]
    fn test_blank_items_still_reconcile_summary() {
        for items in [json!({}), json!(""), json!(0), json!(false)] {
            let report = check_consistency(&json!({
                "items": items,
                "summary": { "subtotal": 10, "vat": 2, "total": 12 },
                "po_numbers": ["PO-1", "PO-1"]
            }))
            .unwrap();
            assert!(report.item_checks.is_empty(), "{items}");
            assert_eq!(report.summary_check.calculated_subtotal, 0.0);
            assert!(report.summary_check.matched);
            assert_eq!(report.po_duplicates, vec!["PO-1".to_string()]);
        }
    }

    #[test]
    fn test_non_list_po_field_is_a_single_entry() {
        let report = check_consistency(&json!({ "po_numbers": "PO-9" })).unwrap();
        assert!(report.po_duplicates.is_empty());
    }

    #[test]
    fn test_aliased_document() {
        let report = check_consistency(&json!({
            "Line Items": [
                { "Code": "X1", "Qty": "4", "Unit Cost": "2.50", "Line Total": "10.00" }
            ],
            "Totals": { "Amount Before Tax": 10, "VAT": 2, "Amount Due": 12 },
            "Purchase Orders": ["A", "A"]
        }))
        .unwrap();

        assert_eq!(
            report.item_checks,
            vec![ItemCheck::Checked {
                index: 0,
                product_code: "X1".into(),
                expected_total: 10.0,
                actual_total: 10.0,
                matched: true,
            }]
        );
        assert!(report.summary_check.matched);
        assert_eq!(report.summary_check.summary_subtotal, 10.0);
        assert_eq!(report.po_duplicates, vec!["A".to_string()]);
    }

    #[tokio::test]
    async fn test_generate_report_attaches_narrative() {
        let invoice = json!({ "items": [], "summary": {} });
        let report = generate_report(&invoice, Some(&Canned)).await.unwrap();
        assert_eq!(report.llm_summary.as_deref(), Some("2 keys"));

        let report = generate_report(&invoice, None).await.unwrap();
        assert_eq!(report.llm_summary, None);
    }
}
