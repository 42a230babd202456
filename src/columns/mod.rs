use crate::imports::*;

pub mod merge;

/*
    Types:
    * ColumnDef - One parameter as rendered in one table
    * ColumnSet - Ordered columns of one table role (parent or child).
      After every structural change the orders are exactly 0..n-1.
*/
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDef {
    pub id: String,
    pub field: String,
    pub header: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default = "default_true")]
    pub removable: bool,
    #[serde(default)]
    pub order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub parameter: Parameter,
}

impl ColumnDef {
    pub fn from_parameter(parameter: Parameter, order: i64) -> Self {
        let common = parameter.common();
        ColumnDef {
            id: common.id.clone(),
            field: common.field.clone(),
            header: parameter.header().to_string(),
            visible: common.visible,
            removable: common.removable,
            order,
            width: None,
            category: common.category.clone(),
            parameter,
        }
    }

    // Identity columns such as id or mark, always present and never removable
    pub fn fixed(field: impl Into<String>, header: impl Into<String>, order: i64) -> Self {
        let field = field.into();
        let header = header.into();
        let parameter = Parameter::bim(header.clone(), field.clone(), ValueType::String, RawValue::Null)
            .with_id(field.clone())
            .with_header(header.clone());
        ColumnDef {
            id: field.clone(),
            field,
            header,
            visible: true,
            removable: false,
            order,
            width: None,
            category: None,
            parameter,
        }
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnSet {
    columns: Vec<ColumnDef>,
}

impl ColumnSet {
    pub fn new() -> Self {
        Self::default()
    }

    // Stored order decides the position, ties keep their incoming position
    pub fn from_columns(mut columns: Vec<ColumnDef>) -> Self {
        columns.sort_by_key(|c| c.order);
        let mut set = ColumnSet { columns };
        set.renumber();
        set
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter()
    }

    pub fn as_slice(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn into_vec(self) -> Vec<ColumnDef> {
        self.columns
    }

    pub fn get(&self, id: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.id == id)
    }

    pub fn visible(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| c.visible)
    }

    /// Inserts at `index`, clamped to the end of the set.
    pub fn insert(&mut self, column: ColumnDef, index: usize) -> Result<()> {
        if self.get(&column.id).is_some() {
            return Err(NamingConflict::DuplicateParameterId { id: column.id }.into());
        }
        let index = index.min(self.columns.len());
        tracing::debug!(id = %column.id, index = index, "Inserting column");
        self.columns.insert(index, column);
        self.renumber();
        Ok(())
    }

    pub fn push(&mut self, column: ColumnDef) -> Result<()> {
        let end = self.columns.len();
        self.insert(column, end)
    }

    pub fn remove(&mut self, id: &str) -> Result<ColumnDef> {
        let index = self
            .position(id)
            .with_context(|| format!("Column '{}' not found", id))?;
        if !self.columns[index].removable {
            return Err(anyhow::anyhow!("Column '{}' cannot be removed", id));
        }
        let column = self.columns.remove(index);
        self.renumber();
        Ok(column)
    }

    pub fn move_column(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.columns.len();
        if from >= len || to >= len {
            return Err(anyhow::anyhow!(
                "Cannot move column from {} to {} in a set of {}",
                from,
                to,
                len
            ));
        }
        let column = self.columns.remove(from);
        self.columns.insert(to, column);
        self.renumber();
        Ok(())
    }

    pub fn set_visibility(&mut self, id: &str, visible: bool) -> Result<()> {
        let column = self.get_mut(id)?;
        column.visible = visible;
        column.parameter.common_mut().visible = visible;
        Ok(())
    }

    pub fn resize(&mut self, id: &str, width: f64) -> Result<()> {
        if !width.is_finite() || width <= 0.0 {
            return Err(anyhow::anyhow!("Invalid width {} for column '{}'", width, id));
        }
        self.get_mut(id)?.width = Some(width);
        Ok(())
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut ColumnDef> {
        self.columns
            .iter_mut()
            .find(|c| c.id == id)
            .with_context(|| format!("Column '{}' not found", id))
    }

    pub fn renumber(&mut self) {
        for (index, column) in self.columns.iter_mut().enumerate() {
            column.order = index as i64;
            column.parameter.common_mut().order = index as i64;
        }
    }
}

impl From<Vec<ColumnDef>> for ColumnSet {
    fn from(columns: Vec<ColumnDef>) -> Self {
        ColumnSet::from_columns(columns)
    }
}
