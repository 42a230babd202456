use crate::imports::*;

/*
    Types:
    * RawParamColumn - Parameter column as produced by discovery or the UI, before shape validation

    Functions:
    * merge_columns - Base columns followed by the eligible parameter columns
    * duplicate_fields - Fields backing more than one column
*/
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawParamColumn {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub header: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub parameter: Option<Parameter>,
}

impl RawParamColumn {
    pub fn from_parameter(parameter: &Parameter) -> Self {
        RawParamColumn {
            id: Some(parameter.id().to_string()),
            field: Some(parameter.field().to_string()),
            header: Some(parameter.header().to_string()),
            category: parameter.category().map(str::to_string),
            width: None,
            parameter: Some(parameter.clone()),
        }
    }

    fn into_column(self, order: i64) -> Result<ColumnDef> {
        let field = self
            .field
            .filter(|f| !f.trim().is_empty())
            .context("parameter column has no field")?;
        let header = self
            .header
            .filter(|h| !h.trim().is_empty())
            .context("parameter column has no header")?;

        // A wrapped parameter keeps its own group, bare columns land in the custom group
        let mut parameter = match self.parameter {
            Some(parameter) if !parameter.group().is_empty() => parameter,
            Some(parameter) => parameter.with_group(ParameterGroup::new(CUSTOM_GROUP)),
            None => Parameter::bim(header.clone(), field.clone(), ValueType::String, RawValue::Null)
                .with_header(header.clone())
                .with_group(ParameterGroup::new(CUSTOM_GROUP)),
        };
        {
            let common = parameter.common_mut();
            common.visible = true;
            common.removable = true;
            common.order = order;
        }

        Ok(ColumnDef {
            id: self.id.unwrap_or_else(|| parameter.id().to_string()),
            field,
            header,
            visible: true,
            removable: true,
            order,
            width: self.width,
            category: self.category.or_else(|| parameter.category().map(str::to_string)),
            parameter,
        })
    }
}

impl From<&Parameter> for RawParamColumn {
    fn from(parameter: &Parameter) -> Self {
        RawParamColumn::from_parameter(parameter)
    }
}

/// Returns `default_columns` unchanged until the base state finished loading.
/// Parameter columns keep their discovery order and always sort after the base columns.
/// Fields are not deduplicated, see [`duplicate_fields`].
pub fn merge_columns(
    base_columns: &[ColumnDef],
    parameter_columns: Vec<RawParamColumn>,
    category_filter: Option<&dyn Fn(&RawParamColumn) -> bool>,
    is_initialized: bool,
    default_columns: &[ColumnDef],
) -> Vec<ColumnDef> {
    if !is_initialized {
        tracing::debug!(defaults = default_columns.len(), "Columns not initialized, using defaults");
        return default_columns.to_vec();
    }

    let eligible = parameter_columns
        .into_iter()
        .filter(|column| category_filter.is_none_or(|keep| keep(column)));

    let mut merged = base_columns.to_vec();
    let mut index = 0;
    for raw in eligible {
        let order = (base_columns.len() + index) as i64;
        let described = raw.field.clone().or_else(|| raw.id.clone()).unwrap_or_default();
        match raw.into_column(order) {
            Ok(column) => {
                merged.push(column);
                index += 1;
            }
            Err(e) => {
                tracing::warn!(column = %described, error = %e, "Dropping malformed parameter column");
            }
        }
    }

    let duplicates = duplicate_fields(&merged);
    if !duplicates.is_empty() {
        tracing::warn!(fields = ?duplicates, "Merged columns share fields");
    }
    tracing::debug!(
        base = base_columns.len(),
        added = index,
        total = merged.len(),
        "Merged parameter columns"
    );
    merged
}

// In first-appearance order
pub fn duplicate_fields(columns: &[ColumnDef]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut duplicates: Vec<String> = Vec::new();
    for column in columns {
        if !seen.insert(column.field.as_str()) && !duplicates.iter().any(|d| d == &column.field) {
            duplicates.push(column.field.clone());
        }
    }
    duplicates
}
