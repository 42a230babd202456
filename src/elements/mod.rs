use crate::imports::*;

/*
    Consts:
    * ERROR_KEY - Parameter key marking a row whose element failed processing
*/
pub const ERROR_KEY: &str = "_error";

/*
    Types:
    * ElementData - Raw element as handed over by the viewer layer. `details` holds nested child elements.
    * TableRow - The same element after every parameter value was normalised into a ParameterValueState
*/
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementData {
    pub id: String,
    #[serde(rename = "type", default)]
    pub element_type: String,
    #[serde(default)]
    pub mark: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub parameters: RawMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ElementData>>,
}

impl ElementData {
    pub fn new(id: impl Into<String>, element_type: impl Into<String>) -> Self {
        let element_type = element_type.into();
        ElementData {
            id: id.into(),
            category: element_type.clone(),
            element_type,
            ..Default::default()
        }
    }

    pub fn with_mark(mut self, mark: impl Into<String>) -> Self {
        self.mark = mark.into();
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_details(mut self, details: Vec<ElementData>) -> Self {
        self.details = Some(details);
        self
    }

    // Direct key first, then a "group.name" path into a nested group record
    pub fn read_field(&self, field: &str) -> Option<&RawValue> {
        if let Some(raw) = self.parameters.get(field) {
            return Some(entry_value(raw));
        }
        let (group, name) = field.split_once('.')?;
        self.parameters
            .get(group)
            .and_then(|g| g.as_object())
            .and_then(|g| g.get(name))
            .map(entry_value)
    }
}

// `{value, group}` entries carry their value one level down
pub fn entry_value(raw: &RawValue) -> &RawValue {
    match raw {
        RawValue::Object(map) if !is_value_state(map) => map.get("value").unwrap_or(raw),
        _ => raw,
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    pub id: String,
    #[serde(rename = "type", default)]
    pub element_type: String,
    #[serde(default)]
    pub mark: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterValueState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<TableRow>>,
}

impl TableRow {
    pub fn for_element(element: &ElementData) -> Self {
        TableRow {
            id: element.id.clone(),
            element_type: element.element_type.clone(),
            mark: element.mark.clone(),
            category: element.category.clone(),
            parameters: BTreeMap::new(),
            details: None,
        }
    }

    pub fn error(element: &ElementData, message: impl Into<String>) -> Self {
        let message = ParameterValue::String(message.into());
        let mut row = Self::for_element(element);
        row.parameters.insert(
            ERROR_KEY.to_string(),
            ParameterValueState::fresh(message.clone(), message),
        );
        row
    }

    pub fn error_message(&self) -> Option<&str> {
        self.parameters
            .get(ERROR_KEY)
            .and_then(|state| state.current_value.as_str())
    }

    pub fn has_error(&self) -> bool {
        self.parameters.contains_key(ERROR_KEY)
    }

    pub fn get(&self, field: &str) -> Option<&ParameterValueState> {
        self.parameters.get(field)
    }

    // Parent row followed by its detail rows, depth first
    pub fn flatten(&self) -> Vec<&TableRow> {
        let mut out = vec![self];
        if let Some(details) = &self.details {
            for detail in details {
                out.extend(detail.flatten());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn read_field_handles_entries_and_groups() {
        let element = ElementData::new("w1", "Wall")
            .with_parameter("Mark", json!({"value": "W1", "group": "Identity"}))
            .with_parameter("Width", json!(0.3))
            .with_parameter("Dimensions", json!({"Height": {"value": 3.0}, "Length": 12}));

        assert_eq!(element.read_field("Mark"), Some(&json!("W1")));
        assert_eq!(element.read_field("Width"), Some(&json!(0.3)));
        assert_eq!(element.read_field("Dimensions.Height"), Some(&json!(3.0)));
        assert_eq!(element.read_field("Dimensions.Length"), Some(&json!(12)));
        assert_eq!(element.read_field("Missing"), None);
        assert_eq!(element.read_field("Dimensions.Missing"), None);
    }

    #[test]
    fn error_rows_keep_identity() {
        let element = ElementData::new("d1", "Door").with_mark("D-01");
        let row = TableRow::error(&element, "boom");
        assert!(row.has_error());
        assert_eq!(row.error_message(), Some("boom"));
        assert_eq!(row.mark, "D-01");
        assert_eq!(row.element_type, "Door");
    }

    #[test]
    fn element_wire_shape() {
        let raw = json!({
            "id": "a",
            "type": "Wall",
            "mark": "W1",
            "category": "Walls",
            "parameters": {"Mark": "W1"},
            "details": [{"id": "b", "type": "Window"}]
        });
        let element: ElementData = serde_json::from_value(raw).unwrap();
        assert_eq!(element.element_type, "Wall");
        let details = element.details.as_ref().unwrap();
        assert_eq!(details[0].element_type, "Window");
        assert!(details[0].parameters.is_empty());
    }
}
