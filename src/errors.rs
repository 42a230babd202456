use crate::imports::*;

/*
    Types:
    * ValidationError - A raw value that does not fit the declared type of the parameter reading it
    * NamingConflict - A write that would break id or name uniqueness, raised before anything is persisted
    * BackendError - Failures reported by the settings backend, split by whether a re-authentication can fix them
    * ProcessingError - Aggregate record of one element that failed row processing
*/
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("'{field}' expected {expected}, got {value}")]
    TypeMismatch {
        field: String,
        expected: ValueType,
        value: RawValue,
    },
    #[error("'{field}' is not a number: {value}")]
    UnparseableNumber { field: String, value: RawValue },
    #[error("'{field}' is a BIM parameter and cannot hold an equation: {value}")]
    EquationOnBimParameter { field: String, value: RawValue },
}

impl ValidationError {
    pub fn field(&self) -> &str {
        match self {
            ValidationError::TypeMismatch { field, .. }
            | ValidationError::UnparseableNumber { field, .. }
            | ValidationError::EquationOnBimParameter { field, .. } => field,
        }
    }

    pub fn value(&self) -> &RawValue {
        match self {
            ValidationError::TypeMismatch { value, .. }
            | ValidationError::UnparseableNumber { value, .. }
            | ValidationError::EquationOnBimParameter { value, .. } => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NamingConflict {
    #[error("parameter '{name}' already exists in group '{group}'")]
    DuplicateParameterName { group: String, name: String },
    #[error("parameter id '{id}' is already in use")]
    DuplicateParameterId { id: String },
    #[error("a table named '{name}' already exists")]
    DuplicateTableName { name: String },
    #[error("equation of '{parameter}' references unknown parameter '{reference}'")]
    UnknownEquationReference { parameter: String, reference: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("{operation} failed: {}", .messages.join("; "))]
    GraphQl {
        operation: String,
        messages: Vec<String>,
    },
    #[error("transport error: {0}")]
    Transport(String),
}

impl BackendError {
    pub fn is_authentication(&self) -> bool {
        matches!(self, BackendError::Authentication(_))
    }

    pub fn server_messages(&self) -> &[String] {
        match self {
            BackendError::GraphQl { messages, .. } => messages,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingError {
    pub element_id: String,
    pub field: Option<String>,
    pub message: String,
}

impl ProcessingError {
    pub fn new(element_id: impl Into<String>, field: Option<String>, message: impl Into<String>) -> Self {
        ProcessingError {
            element_id: element_id.into(),
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ProcessingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field {
            Some(field) => write!(f, "element '{}', field '{}': {}", self.element_id, field, self.message),
            None => write!(f, "element '{}': {}", self.element_id, self.message),
        }
    }
}
