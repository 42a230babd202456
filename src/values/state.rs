use crate::imports::*;

/*
    Types:
    * ParameterValue - A coerced, typed parameter value. Only user parameters may hold the Equation variant.
    * ParameterValueState - The four-slot value record stored per parameter in a table row
*/
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    #[default]
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Equation(EquationValue),
    Array(Vec<RawValue>),
    Object(RawMap),
}

impl ParameterValue {
    // Lossless conversion, no coercion is applied
    pub fn from_raw(raw: &RawValue) -> Self {
        match raw {
            RawValue::Null => ParameterValue::Null,
            RawValue::Bool(b) => ParameterValue::Boolean(*b),
            RawValue::Number(n) => n
                .as_f64()
                .map(ParameterValue::Number)
                .unwrap_or(ParameterValue::Null),
            RawValue::String(s) => ParameterValue::String(s.clone()),
            RawValue::Array(items) => ParameterValue::Array(items.clone()),
            RawValue::Object(map) => match serde_json::from_value::<EquationValue>(raw.clone()) {
                Ok(equation) => ParameterValue::Equation(equation),
                Err(_) => ParameterValue::Object(map.clone()),
            },
        }
    }

    pub fn to_raw(&self) -> RawValue {
        match self {
            ParameterValue::Null => RawValue::Null,
            ParameterValue::Boolean(b) => RawValue::Bool(*b),
            ParameterValue::Number(n) => raw_number(*n),
            ParameterValue::String(s) => RawValue::String(s.clone()),
            ParameterValue::Equation(equation) => {
                serde_json::to_value(equation).unwrap_or(RawValue::Null)
            }
            ParameterValue::Array(items) => RawValue::Array(items.clone()),
            ParameterValue::Object(map) => RawValue::Object(map.clone()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ParameterValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParameterValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_equation(&self) -> Option<&EquationValue> {
        match self {
            ParameterValue::Equation(equation) => Some(equation),
            _ => None,
        }
    }

    pub fn display(&self) -> String {
        match self {
            ParameterValue::Equation(equation) => equation.expression.clone(),
            other => stringify(&other.to_raw()),
        }
    }
}

impl From<&str> for ParameterValue {
    fn from(s: &str) -> Self {
        ParameterValue::String(s.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(s: String) -> Self {
        ParameterValue::String(s)
    }
}

impl From<f64> for ParameterValue {
    fn from(n: f64) -> Self {
        ParameterValue::Number(n)
    }
}

impl From<bool> for ParameterValue {
    fn from(b: bool) -> Self {
        ParameterValue::Boolean(b)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterValueState {
    pub fetched_value: ParameterValue,
    pub current_value: ParameterValue,
    pub previous_value: ParameterValue,
    pub user_value: ParameterValue,
}

impl ParameterValueState {
    pub fn fresh(fetched: ParameterValue, current: ParameterValue) -> Self {
        ParameterValueState {
            fetched_value: fetched,
            current_value: current,
            previous_value: ParameterValue::Null,
            user_value: ParameterValue::Null,
        }
    }

    pub fn update_current(&mut self, value: ParameterValue) {
        self.previous_value = std::mem::replace(&mut self.current_value, value);
    }

    pub fn set_user_value(&mut self, value: ParameterValue) {
        self.user_value = value;
    }

    pub fn clear_user_value(&mut self) {
        self.user_value = ParameterValue::Null;
    }

    // The user override wins over the computed value when present
    pub fn effective(&self) -> &ParameterValue {
        if self.user_value.is_null() {
            &self.current_value
        } else {
            &self.user_value
        }
    }

    pub fn has_changed(&self) -> bool {
        !self.previous_value.is_null() && self.previous_value != self.current_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_raw_recognises_equations() {
        let raw = json!({"expression": "Length * 2", "references": ["Length"], "resultType": "number"});
        let value = ParameterValue::from_raw(&raw);
        let equation = value.as_equation().unwrap();
        assert_eq!(equation.references, vec!["Length"]);

        let plain = ParameterValue::from_raw(&json!({"a": 1}));
        assert!(matches!(plain, ParameterValue::Object(_)));
    }

    #[test]
    fn untagged_serialisation_is_plain_json() {
        let state = ParameterValueState::fresh("W1".into(), 2.5.into());
        let raw = serde_json::to_value(&state).unwrap();
        assert_eq!(
            raw,
            json!({"fetchedValue": "W1", "currentValue": 2.5, "previousValue": null, "userValue": null})
        );
        let back: ParameterValueState = serde_json::from_value(raw).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn update_moves_current_to_previous() {
        let mut state = ParameterValueState::fresh(1.0.into(), 1.0.into());
        assert!(!state.has_changed());
        state.update_current(2.0.into());
        assert_eq!(state.previous_value, ParameterValue::Number(1.0));
        assert_eq!(state.current_value, ParameterValue::Number(2.0));
        assert!(state.has_changed());
    }

    #[test]
    fn user_value_overrides_current() {
        let mut state = ParameterValueState::fresh("a".into(), "a".into());
        state.set_user_value("b".into());
        assert_eq!(state.effective(), &ParameterValue::from("b"));
        state.clear_user_value();
        assert_eq!(state.effective(), &ParameterValue::from("a"));
    }
}
