use crate::imports::*;

pub mod equation;
pub mod set;

/*
    Consts:
    * CUSTOM_GROUP - Group given to parameters created from table columns without a group of their own
    * DEFAULT_GROUP - Group given to discovered parameters whose source entry carries none
*/
pub const CUSTOM_GROUP: &str = "Custom";
pub const DEFAULT_GROUP: &str = "Parameters";

/*
    Types:
    * ParameterGroup - Group as discovered from source data plus the possibly user-overridden group used for display
    * ParameterCommon - Fields shared by every parameter kind
    * BimParameter - Parameter read from model data, not user editable
    * UserParameter - Parameter defined by a user, either a fixed value or an equation
    * UserParameterType - Fixed or Equation
    * Parameter - Tagged union over the kinds, discriminated by `kind` on the wire
*/
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterGroup {
    #[serde(default)]
    pub fetched_group: String,
    #[serde(default)]
    pub current_group: String,
}

impl ParameterGroup {
    pub fn new(group: impl Into<String>) -> Self {
        let group = group.into();
        ParameterGroup {
            fetched_group: group.clone(),
            current_group: group,
        }
    }

    pub fn with_current(mut self, group: impl Into<String>) -> Self {
        self.current_group = group.into();
        self
    }

    // The group used for display and grouping
    pub fn display(&self) -> &str {
        if self.current_group.is_empty() {
            &self.fetched_group
        } else {
            &self.current_group
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fetched_group.is_empty() && self.current_group.is_empty()
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterCommon {
    pub id: String,
    pub name: String,
    pub field: String,
    #[serde(default)]
    pub header: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default = "default_true")]
    pub removable: bool,
    #[serde(default)]
    pub order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub group: ParameterGroup,
    #[serde(default)]
    pub metadata: RawMap,
}

impl ParameterCommon {
    pub fn new(id: impl Into<String>, name: impl Into<String>, field: impl Into<String>) -> Self {
        let name = name.into();
        ParameterCommon {
            id: id.into(),
            header: name.clone(),
            name,
            field: field.into(),
            visible: true,
            removable: true,
            order: 0,
            category: None,
            description: None,
            group: ParameterGroup::new(DEFAULT_GROUP),
            metadata: RawMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BimParameter {
    #[serde(flatten)]
    pub common: ParameterCommon,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(default)]
    pub source_value: RawValue,
    #[serde(default)]
    pub value: ParameterValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserParameterType {
    #[default]
    Fixed,
    Equation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserParameter {
    #[serde(flatten)]
    pub common: ParameterCommon,
    #[serde(rename = "type")]
    pub user_type: UserParameterType,
    #[serde(default)]
    pub value: ParameterValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equation: Option<String>,
}

impl UserParameter {
    pub fn fixed(id: impl Into<String>, name: impl Into<String>, value: ParameterValue) -> Self {
        let name = name.into();
        UserParameter {
            common: ParameterCommon::new(id, name.clone(), name),
            user_type: UserParameterType::Fixed,
            value,
            equation: None,
        }
    }

    pub fn equation(
        id: impl Into<String>,
        name: impl Into<String>,
        expression: impl Into<String>,
        result_type: ValueType,
    ) -> Result<Self> {
        let name = name.into();
        let equation = EquationValue::parse(expression, result_type)
            .with_context(|| format!("Invalid equation for parameter '{}'", name))?;
        Ok(UserParameter {
            common: ParameterCommon::new(id, name.clone(), name),
            user_type: UserParameterType::Equation,
            equation: Some(equation.expression.clone()),
            value: ParameterValue::Equation(equation),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Parameter {
    Bim(BimParameter),
    User(UserParameter),
}

impl Parameter {
    pub fn bim(
        name: impl Into<String>,
        field: impl Into<String>,
        value_type: ValueType,
        source_value: RawValue,
    ) -> Self {
        let name = name.into();
        let value = coerce_value(&source_value, value_type);
        Parameter::Bim(BimParameter {
            common: ParameterCommon::new(format!("bim_{}", name), name, field),
            value_type,
            source_value,
            value,
        })
    }

    pub fn common(&self) -> &ParameterCommon {
        match self {
            Parameter::Bim(p) => &p.common,
            Parameter::User(p) => &p.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut ParameterCommon {
        match self {
            Parameter::Bim(p) => &mut p.common,
            Parameter::User(p) => &mut p.common,
        }
    }

    pub fn id(&self) -> &str {
        &self.common().id
    }

    pub fn name(&self) -> &str {
        &self.common().name
    }

    pub fn field(&self) -> &str {
        &self.common().field
    }

    // Header falls back to the field when no label was set
    pub fn header(&self) -> &str {
        let common = self.common();
        if common.header.is_empty() {
            &common.field
        } else {
            &common.header
        }
    }

    pub fn category(&self) -> Option<&str> {
        self.common().category.as_deref()
    }

    pub fn order(&self) -> i64 {
        self.common().order
    }

    pub fn group(&self) -> &ParameterGroup {
        &self.common().group
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Parameter::Bim(_) => "bim",
            Parameter::User(_) => "user",
        }
    }

    // The `type` discriminator as shown to users
    pub fn type_label(&self) -> &'static str {
        match self {
            Parameter::Bim(p) => p.value_type.as_str(),
            Parameter::User(p) => match p.user_type {
                UserParameterType::Fixed => "fixed",
                UserParameterType::Equation => "equation",
            },
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Parameter::User(_))
    }

    pub fn is_fixed(&self) -> bool {
        matches!(
            self,
            Parameter::User(UserParameter {
                user_type: UserParameterType::Fixed,
                ..
            })
        )
    }

    pub fn value(&self) -> &ParameterValue {
        match self {
            Parameter::Bim(p) => &p.value,
            Parameter::User(p) => &p.value,
        }
    }

    // Concrete type of the values this parameter produces
    pub fn value_type(&self) -> ValueType {
        match self {
            Parameter::Bim(p) => p.value_type,
            Parameter::User(p) => match &p.value {
                ParameterValue::Equation(equation) => equation.result_type,
                ParameterValue::Number(_) => ValueType::Number,
                ParameterValue::Boolean(_) => ValueType::Boolean,
                ParameterValue::Array(_) => ValueType::Array,
                ParameterValue::Object(_) => ValueType::Object,
                ParameterValue::String(_) | ParameterValue::Null => ValueType::String,
            },
        }
    }

    pub fn with_group(mut self, group: ParameterGroup) -> Self {
        self.common_mut().group = group;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.common_mut().category = Some(category.into());
        self
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.common_mut().header = header.into();
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.common_mut().order = order;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.common_mut().id = id.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.common_mut().metadata.insert(key.into(), value.into());
        self
    }
}

impl From<UserParameter> for Parameter {
    fn from(p: UserParameter) -> Self {
        Parameter::User(p)
    }
}

impl From<BimParameter> for Parameter {
    fn from(p: BimParameter) -> Self {
        Parameter::Bim(p)
    }
}
