use crate::imports::*;

/*
    Functions:
    (PUBLIC)
    * coerce_value - Total conversion of a RawValue into a ParameterValue of the target type
    * validate_value - Checks a RawValue fits the target type; Ok(None) for null ("use the default")
    * validate_for_parameter - Validation driven by the parameter kind, the only place equations are allowed through
    * coerce_for_parameter - validate_for_parameter with the zero value standing in for null
    * empty_value - Type-appropriate zero value
    * infer_bim_type - Infers the ValueType of a discovered raw value
    * parse_number_text - Numeric parse of display text handling '%' and '$'
    (PRIVATE)
    * coerce_* - Per-type coercion rules
*/
pub fn empty_value(target: ValueType) -> ParameterValue {
    match target {
        ValueType::String | ValueType::Date => ParameterValue::String(String::new()),
        ValueType::Number => ParameterValue::Number(0.0),
        ValueType::Boolean => ParameterValue::Boolean(false),
        ValueType::Object | ValueType::Array => ParameterValue::Null,
    }
}

pub fn coerce_value(raw: &RawValue, target: ValueType) -> ParameterValue {
    match raw {
        RawValue::Null => empty_value(target),
        RawValue::Object(map) if is_value_state(map) => {
            coerce_value(map.get("currentValue").unwrap_or(&RawValue::Null), target)
        }
        _ => match target {
            ValueType::String => ParameterValue::String(coerce_string(raw)),
            ValueType::Number => ParameterValue::Number(coerce_number(raw)),
            ValueType::Boolean => ParameterValue::Boolean(coerce_boolean(raw)),
            ValueType::Date => ParameterValue::String(coerce_date(raw)),
            ValueType::Object => match raw {
                RawValue::Object(map) => ParameterValue::Object(map.clone()),
                _ => ParameterValue::Null,
            },
            ValueType::Array => match raw {
                RawValue::Array(items) => ParameterValue::Array(items.clone()),
                _ => ParameterValue::Null,
            },
        },
    }
}

pub fn parse_number_text(text: &str) -> f64 {
    let trimmed = text.trim();
    if let Some(percent) = trimmed.strip_suffix('%') {
        parse_float(percent) / 100.0
    } else if let Some(amount) = trimmed.strip_prefix('$') {
        parse_float(amount)
    } else {
        parse_float(trimmed)
    }
}

fn coerce_string(raw: &RawValue) -> String {
    match raw {
        RawValue::Object(map) => match nested_scalar(map) {
            Some(inner) => coerce_string(inner),
            None => raw.to_string(),
        },
        other => stringify(other),
    }
}

fn coerce_number(raw: &RawValue) -> f64 {
    let n = match raw {
        RawValue::Null | RawValue::Array(_) => 0.0,
        RawValue::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        RawValue::Number(n) => n.as_f64().unwrap_or(0.0),
        RawValue::String(s) => parse_number_text(s),
        RawValue::Object(map) => match nested_scalar(map) {
            Some(inner) => coerce_value(inner, ValueType::Number).as_f64().unwrap_or(0.0),
            None => 0.0,
        },
    };
    if n.is_nan() { 0.0 } else { n }
}

fn coerce_boolean(raw: &RawValue) -> bool {
    match raw {
        RawValue::String(s) => matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "yes" | "1" | "on"
        ),
        RawValue::Object(map) => match nested_scalar(map) {
            Some(inner) => coerce_value(inner, ValueType::Boolean).as_bool().unwrap_or(false),
            None => true,
        },
        other => is_truthy(other),
    }
}

fn coerce_date(raw: &RawValue) -> String {
    match raw {
        RawValue::String(s) => s.trim().to_string(),
        RawValue::Array(_) => String::new(),
        other => coerce_string(other),
    }
}

pub fn validate_value(
    field: &str,
    raw: &RawValue,
    target: ValueType,
) -> std::result::Result<Option<ParameterValue>, ValidationError> {
    let mismatch = || ValidationError::TypeMismatch {
        field: field.to_string(),
        expected: target,
        value: raw.clone(),
    };

    match raw {
        RawValue::Null => return Ok(None),
        RawValue::Object(map) if is_value_state(map) => {
            return validate_value(field, map.get("currentValue").unwrap_or(&RawValue::Null), target);
        }
        _ => {}
    }

    match target {
        ValueType::String => Ok(Some(coerce_value(raw, target))),
        ValueType::Object => match raw {
            RawValue::Object(_) => Ok(Some(coerce_value(raw, target))),
            _ => Err(mismatch()),
        },
        ValueType::Array => match raw {
            RawValue::Array(_) => Ok(Some(coerce_value(raw, target))),
            _ => Err(mismatch()),
        },
        ValueType::Number | ValueType::Boolean | ValueType::Date => match raw {
            RawValue::Array(_) => Err(mismatch()),
            RawValue::Object(map) => match nested_scalar(map) {
                Some(inner) => validate_value(field, inner, target)
                    .map(|v| v.or_else(|| Some(empty_value(target)))),
                None => Err(mismatch()),
            },
            RawValue::String(s) if target == ValueType::Number => {
                if s.trim().is_empty() {
                    Ok(Some(empty_value(target)))
                } else if parse_number_text(s).is_nan() {
                    Err(ValidationError::UnparseableNumber {
                        field: field.to_string(),
                        value: raw.clone(),
                    })
                } else {
                    Ok(Some(coerce_value(raw, target)))
                }
            }
            _ => Ok(Some(coerce_value(raw, target))),
        },
    }
}

// BIM parameters never hold equations and must fit their declared type; user values always pass
pub fn validate_for_parameter(
    parameter: &Parameter,
    raw: &RawValue,
) -> std::result::Result<Option<ParameterValue>, ValidationError> {
    match parameter {
        Parameter::Bim(bim) => {
            if EquationValue::from_raw(raw).is_some() {
                return Err(ValidationError::EquationOnBimParameter {
                    field: bim.common.field.clone(),
                    value: raw.clone(),
                });
            }
            validate_value(&bim.common.field, raw, bim.value_type)
        }
        Parameter::User(_) => Ok(Some(coerce_user_value(raw))),
    }
}

pub fn coerce_for_parameter(
    parameter: &Parameter,
    raw: &RawValue,
) -> std::result::Result<ParameterValue, ValidationError> {
    Ok(validate_for_parameter(parameter, raw)?.unwrap_or_else(|| empty_value(parameter.value_type())))
}

// User values keep their own shape; only wrappers are unwrapped
fn coerce_user_value(raw: &RawValue) -> ParameterValue {
    match raw {
        RawValue::Object(map) if is_value_state(map) => {
            coerce_user_value(map.get("currentValue").unwrap_or(&RawValue::Null))
        }
        RawValue::Object(map) => match EquationValue::from_raw(raw) {
            Some(equation) => ParameterValue::Equation(equation),
            None => match nested_scalar(map) {
                Some(inner) => coerce_user_value(inner),
                None => ParameterValue::Object(map.clone()),
            },
        },
        other => ParameterValue::from_raw(other),
    }
}

pub fn infer_bim_type(raw: &RawValue) -> ValueType {
    match raw {
        RawValue::Null => ValueType::String,
        RawValue::Bool(_) => ValueType::Boolean,
        RawValue::Number(_) => ValueType::Number,
        RawValue::String(s) if looks_like_date(s) => ValueType::Date,
        RawValue::String(_) => ValueType::String,
        RawValue::Array(_) => ValueType::Array,
        RawValue::Object(map) if is_value_state(map) => {
            infer_bim_type(map.get("currentValue").unwrap_or(&RawValue::Null))
        }
        RawValue::Object(map) => match nested_scalar(map) {
            Some(inner) => infer_bim_type(inner),
            None => ValueType::Object,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn number(raw: RawValue) -> f64 {
        coerce_value(&raw, ValueType::Number).as_f64().unwrap()
    }

    fn boolean(raw: RawValue) -> bool {
        coerce_value(&raw, ValueType::Boolean).as_bool().unwrap()
    }

    #[test]
    fn numbers_from_text() {
        for text in ["0", "12", "-7.25", "3.5e2", "  42  ", ".75"] {
            assert_eq!(number(json!(text)), text.trim().parse::<f64>().unwrap(), "{text}");
        }
        assert_eq!(number(json!("50%")), 0.5);
        assert_eq!(number(json!("$20")), 20.0);
        assert_eq!(number(json!(" $12.50 ")), 12.5);
        assert_eq!(number(json!("abc")), 0.0);
        assert_eq!(number(json!("")), 0.0);
    }

    #[test]
    fn numbers_from_other_shapes() {
        assert_eq!(number(json!(true)), 1.0);
        assert_eq!(number(json!(false)), 0.0);
        assert_eq!(number(json!(null)), 0.0);
        assert_eq!(number(json!([1, 2])), 0.0);
        assert_eq!(number(json!({"value": "25%"})), 0.25);
        assert_eq!(number(json!({"name": "x"})), 0.0);
    }

    #[test]
    fn boolean_words_in_any_case() {
        for word in ["true", "YES", "1", "On", " yes "] {
            assert!(boolean(json!(word)), "{word}");
        }
        for word in ["false", "No", "0", "OFF", "maybe", ""] {
            assert!(!boolean(json!(word)), "{word}");
        }
        assert!(boolean(json!(2)));
        assert!(!boolean(json!(0)));
        assert!(!boolean(json!(null)));
        assert!(boolean(json!({"other": 1})));
    }

    #[test]
    fn strings_always_succeed() {
        assert_eq!(coerce_value(&json!(3.0), ValueType::String), ParameterValue::from("3"));
        assert_eq!(coerce_value(&json!(false), ValueType::String), ParameterValue::from("false"));
        assert_eq!(
            coerce_value(&json!({"a": [1]}), ValueType::String),
            ParameterValue::from(r#"{"a":[1]}"#)
        );
        assert_eq!(coerce_value(&json!({"Mark": "W7", "id": 3}), ValueType::String), ParameterValue::from("W7"));
        assert_eq!(coerce_value(&json!(null), ValueType::String), ParameterValue::from(""));
    }

    #[test]
    fn value_state_is_unwrapped() {
        let state = json!({
            "fetchedValue": "1",
            "currentValue": "75%",
            "previousValue": null,
            "userValue": null
        });
        assert_eq!(number(state.clone()), 0.75);
        assert_eq!(infer_bim_type(&state), ValueType::String);
        let partial = json!({"currentValue": "75%", "value": "5"});
        assert_eq!(number(partial), 5.0);
    }

    #[test]
    fn validation_treats_null_as_default() {
        assert_eq!(validate_value("f", &json!(null), ValueType::Number).unwrap(), None);
        assert_eq!(
            validate_value("f", &json!("$5"), ValueType::Number).unwrap(),
            Some(ParameterValue::Number(5.0))
        );
    }

    #[test]
    fn validation_failures_carry_field_and_value() {
        let err = validate_value("Width", &json!("wide"), ValueType::Number).unwrap_err();
        assert_eq!(err.field(), "Width");
        assert_eq!(err.value(), &json!("wide"));

        let err = validate_value("Tags", &json!("a"), ValueType::Array).unwrap_err();
        assert!(matches!(err, ValidationError::TypeMismatch { expected: ValueType::Array, .. }));

        assert!(validate_value("Flag", &json!([true]), ValueType::Boolean).is_err());
        assert!(validate_value("Flag", &json!({"x": 1}), ValueType::Boolean).is_err());
    }

    #[test]
    fn equations_only_pass_on_user_parameters() {
        let equation = json!({"expression": "A * 2", "references": ["A"], "resultType": "number"});

        let bim = Parameter::bim("Area", "Area", ValueType::Number, json!(1));
        let err = coerce_for_parameter(&bim, &equation).unwrap_err();
        assert!(matches!(err, ValidationError::EquationOnBimParameter { .. }));

        let user: Parameter = UserParameter::fixed("u", "Area x2", ParameterValue::Null).into();
        let value = coerce_for_parameter(&user, &equation).unwrap();
        assert_eq!(value.as_equation().unwrap().expression, "A * 2");
    }

    #[test]
    fn user_values_keep_their_shape() {
        let user: Parameter = UserParameter::fixed("u", "Note", ParameterValue::Null).into();
        assert_eq!(coerce_for_parameter(&user, &json!(4)).unwrap(), ParameterValue::Number(4.0));
        assert_eq!(coerce_for_parameter(&user, &json!({"value": "x"})).unwrap(), ParameterValue::from("x"));
    }

    #[test]
    fn inference() {
        assert_eq!(infer_bim_type(&json!("W1")), ValueType::String);
        assert_eq!(infer_bim_type(&json!(2.4)), ValueType::Number);
        assert_eq!(infer_bim_type(&json!(false)), ValueType::Boolean);
        assert_eq!(infer_bim_type(&json!("2023-11-02")), ValueType::Date);
        assert_eq!(infer_bim_type(&json!([1])), ValueType::Array);
        assert_eq!(infer_bim_type(&json!({"value": 3})), ValueType::Number);
        assert_eq!(infer_bim_type(&json!({"a": 3})), ValueType::Object);
        assert_eq!(infer_bim_type(&json!(null)), ValueType::String);
    }
}
