// src/report/fields.rs

use serde_json::{Map, Value};
use thiserror::Error;

/// Canonical fields the report engine reads out of LLM-shaped invoice JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Items,
    Summary,
    PoNumbers,
    ProductCode,
    Quantity,
    UnitPrice,
    TotalPrice,
    Subtotal,
    Vat,
    Total,
}

impl Field {
    /// Recognised key spellings, highest priority first.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::Items => &["items", "line_items", "products"],
            Field::Summary => &["summary", "totals", "amounts"],
            Field::PoNumbers => &["po_numbers", "po_ids", "purchase_orders", "po_list"],
            Field::ProductCode => &["product_code", "code", "sku", "item_code", "product_id"],
            Field::Quantity => &["quantity", "qty", "amount"],
            Field::UnitPrice => &["unit_price", "unit cost", "unit", "price_per_unit"],
            Field::TotalPrice => &["total_price", "line_total", "total amount", "price"],
            Field::Subtotal => &["subtotal", "sub_total", "sub total", "amount_before_tax"],
            Field::Vat => &["vat", "tax", "value_added_tax"],
            Field::Total => &["total", "grand_total", "amount_due"],
        }
    }

    pub fn name(self) -> &'static str {
        self.aliases()[0]
    }
}

/// Lower-case, trim, and turn inner whitespace into underscores.
pub fn normalize_key(key: &str) -> String {
    key.trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .flat_map(char::to_lowercase)
        .collect()
}

/// Look up the first key of `map` matching one of `candidates`.
///
/// Candidates are tried in order; for each candidate the map is scanned
/// in its own key order, so two spellings of the same field resolve
/// deterministically to whichever comes first. Matching is exact after
/// normalisation, never a substring match.
pub fn resolve<'a>(map: &'a Map<String, Value>, candidates: &[&str]) -> Option<&'a Value> {
    candidates.iter().find_map(|candidate| {
        let wanted = normalize_key(candidate);
        map.iter()
            .find(|(key, _)| normalize_key(key) == wanted)
            .map(|(_, value)| value)
    })
}

/// [`resolve`] against a canonical field, treating JSON `null` as absent.
pub fn resolve_field(map: &Map<String, Value>, field: Field) -> Option<&Value> {
    resolve(map, field.aliases()).filter(|v| !v.is_null())
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field} is not numeric: {found}")]
pub struct CoercionError {
    pub field: &'static str,
    pub found: String,
}

/// Coerce an optional JSON value into a number.
///
/// Absent, `null` and empty-string values are zero. Strings are trimmed and
/// may carry `,` thousands separators; a comma anywhere else (a decimal
/// comma such as `"12,50"`) makes the value unreadable.
pub fn coerce_number(field: Field, value: Option<&Value>) -> Result<f64, CoercionError> {
    let fail = |v: &Value| CoercionError {
        field: field.name(),
        found: v.to_string(),
    };

    let Some(value) = value else {
        return Ok(0.0);
    };

    let number = match value {
        Value::Null => Some(0.0),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                Some(0.0)
            } else {
                strip_thousands(s).and_then(|s| s.parse::<f64>().ok())
            }
        }
        Value::Array(_) | Value::Object(_) => None,
    };

    number.filter(|n| n.is_finite()).ok_or_else(|| fail(value))
}

/// Drop `,` separators, provided they sit between groups of three digits
/// in the integer part.
fn strip_thousands(s: &str) -> Option<String> {
    if !s.contains(',') {
        return Some(s.to_string());
    }
    let (int, frac) = s.split_once('.').unwrap_or((s, ""));
    if frac.contains(',') {
        return None;
    }

    let mut groups = int.split(',');
    let head = groups.next()?.trim_start_matches(['-', '+']);
    if head.is_empty() || head.len() > 3 {
        return None;
    }
    if !groups.all(|g| g.len() == 3 && g.bytes().all(|b| b.is_ascii_digit())) {
        return None;
    }
    Some(s.replace(',', ""))
}

/// Render a scalar JSON value as text. `null` and empty strings are `None`.
pub fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}

/// Whether a value carries nothing: `null`, `false`, zero, or an empty
/// (or whitespace-only) string, array or object.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(m) => m.is_empty(),
    }
}

/// JSON type name, for error messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
