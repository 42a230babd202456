pub mod coercion;
pub mod helpers;
pub mod raw;
pub mod state;

/*
    ValueType - The concrete shape a parameter value is coerced into.
    BIM parameters declare one of these directly, user parameters derive theirs from the value they hold.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    String,
    Number,
    Boolean,
    Date,
    Object,
    Array,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Number => "number",
            ValueType::Boolean => "boolean",
            ValueType::Date => "date",
            ValueType::Object => "object",
            ValueType::Array => "array",
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
