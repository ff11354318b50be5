// src/report/items.rs

use super::fields::{self, CoercionError, Field};
use super::{amounts_match, round2};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

/// Outcome of checking one line item. Serialises flat, without a tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ItemCheck {
    Checked {
        index: usize,
        product_code: String,
        expected_total: f64,
        actual_total: f64,
        #[serde(rename = "match")]
        matched: bool,
    },
    Invalid {
        index: usize,
        product_code: String,
        error: String,
    },
}

impl ItemCheck {
    pub fn index(&self) -> usize {
        match self {
            ItemCheck::Checked { index, .. } | ItemCheck::Invalid { index, .. } => *index,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, ItemCheck::Invalid { .. })
    }
}

/// All item checks plus the sum of `actual_total` over the valid ones.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemValidation {
    pub checks: Vec<ItemCheck>,
    pub running_subtotal: f64,
}

pub fn validate_items(items: &[Value]) -> ItemValidation {
    let mut checks = Vec::with_capacity(items.len());
    let mut running_subtotal = 0.0;

    for (index, item) in items.iter().enumerate() {
        let Value::Object(item) = item else {
            warn!(idx = index, found = fields::type_name(item), "Line item is not an object");
            checks.push(ItemCheck::Invalid {
                index,
                product_code: placeholder_code(index),
                error: format!(
                    "Invalid item values: expected an object, got {}",
                    fields::type_name(item)
                ),
            });
            continue;
        };

        let product_code = product_code(item, index);
        match line_amounts(item) {
            Ok((quantity, unit_price, actual_total)) => {
                let expected_total = round2(quantity * unit_price);
                running_subtotal += actual_total;
                checks.push(ItemCheck::Checked {
                    index,
                    product_code,
                    expected_total,
                    actual_total,
                    matched: amounts_match(actual_total, expected_total),
                });
            }
            Err(e) => {
                warn!(idx = index, code = %product_code, error = %e, "Line item skipped");
                checks.push(ItemCheck::Invalid {
                    index,
                    product_code,
                    error: format!("Invalid item values: {e}"),
                });
            }
        }
    }

    ItemValidation {
        checks,
        running_subtotal,
    }
}

/// (quantity, unit_price, total_price)
fn line_amounts(item: &Map<String, Value>) -> Result<(f64, f64, f64), CoercionError> {
    let get = |field: Field| fields::coerce_number(field, fields::resolve_field(item, field));
    Ok((
        get(Field::Quantity)?,
        get(Field::UnitPrice)?,
        get(Field::TotalPrice)?,
    ))
}

fn product_code(item: &Map<String, Value>, index: usize) -> String {
    fields::resolve_field(item, Field::ProductCode)
        .and_then(fields::value_as_text)
        .unwrap_or_else(|| placeholder_code(index))
}

fn placeholder_code(index: usize) -> String {
    format!("item_{index}")
}
