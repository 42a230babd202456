use crate::imports::*;
use regex::Regex;

static FLOAT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:Infinity|(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)")
        .expect("FLOAT_PREFIX: invalid regex")
});

static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}(?:[T ]\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?)?$")
        .expect("ISO_DATE: invalid regex")
});

/*
    Helper functions:
    * parse_float - Parses the longest numeric prefix of a string, NaN when there is none
    * is_truthy - Truthiness of a RawValue (empty string, zero, null and false are falsy)
    * stringify - Renders a RawValue as display text, records and arrays as JSON
    * format_number - Renders an f64 without a trailing ".0" for integral values
    * looks_like_date - Whether a string is an ISO-8601 date or date-time
    * is_value_state - Whether a record carries all four ParameterValueState keys
    * nested_scalar - The `value`, `Mark` or `id` property of a record, in that priority
    * raw_number - RawValue for an f64, null when it is not finite
*/
pub fn parse_float(input: &str) -> f64 {
    let trimmed = input.trim_start();
    match FLOAT_PREFIX.find(trimmed) {
        Some(m) => {
            let text = m.as_str();
            match text.trim_start_matches(['+', '-']) {
                "Infinity" if text.starts_with('-') => f64::NEG_INFINITY,
                "Infinity" => f64::INFINITY,
                _ => text.parse::<f64>().unwrap_or(f64::NAN),
            }
        }
        None => f64::NAN,
    }
}

pub fn is_truthy(value: &RawValue) -> bool {
    match value {
        RawValue::Null => false,
        RawValue::Bool(b) => *b,
        RawValue::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        RawValue::String(s) => !s.is_empty(),
        RawValue::Array(_) | RawValue::Object(_) => true,
    }
}

pub fn stringify(value: &RawValue) -> String {
    match value {
        RawValue::Null => String::new(),
        RawValue::Bool(b) => b.to_string(),
        RawValue::Number(n) => n.as_f64().map(format_number).unwrap_or_else(|| n.to_string()),
        RawValue::String(s) => s.clone(),
        RawValue::Array(_) | RawValue::Object(_) => value.to_string(),
    }
}

pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        // f64 Display already drops the fractional part for integral values
        n.to_string()
    }
}

pub fn looks_like_date(s: &str) -> bool {
    ISO_DATE.is_match(s.trim())
}

pub const VALUE_STATE_KEYS: [&str; 4] = ["fetchedValue", "currentValue", "previousValue", "userValue"];

pub fn is_value_state(map: &RawMap) -> bool {
    VALUE_STATE_KEYS.iter().all(|key| map.contains_key(*key))
}

pub fn nested_scalar(map: &RawMap) -> Option<&RawValue> {
    ["value", "Mark", "id"].iter().find_map(|key| map.get(*key))
}

// NaN and infinities have no JSON representation and become null
pub fn raw_number(n: f64) -> RawValue {
    match serde_json::Number::from_f64(n) {
        Some(num) => RawValue::Number(num),
        None => RawValue::Null,
    }
}
