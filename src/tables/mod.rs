use crate::imports::*;

/*
    Types:
    * CategoryFilters - Element categories selected for the parent and the child rows of a table
    * TableSettings - Persisted configuration of one table. Parent and child columns are ordered independently.
    * TableCatalog - All tables of one user, keyed by table id, with names unique (trimmed, case-insensitive)
*/
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryFilters {
    #[serde(default)]
    pub selected_parent_categories: Vec<String>,
    #[serde(default)]
    pub selected_child_categories: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSettings {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub parent_columns: ColumnSet,
    #[serde(default)]
    pub child_columns: ColumnSet,
    #[serde(default)]
    pub category_filters: CategoryFilters,
    #[serde(default)]
    pub selected_parameter_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<RawValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<RawValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RawMap>,
    #[serde(default)]
    pub last_update_timestamp: i64,
}

impl TableSettings {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        TableSettings {
            id: id.into(),
            display_name: name.clone(),
            name,
            ..Default::default()
        }
    }

    pub fn with_parent_columns(mut self, columns: Vec<ColumnDef>) -> Self {
        self.parent_columns = ColumnSet::from_columns(columns);
        self
    }

    pub fn with_child_columns(mut self, columns: Vec<ColumnDef>) -> Self {
        self.child_columns = ColumnSet::from_columns(columns);
        self
    }

    pub fn with_category_filters(mut self, parent: Vec<String>, child: Vec<String>) -> Self {
        self.category_filters = CategoryFilters {
            selected_parent_categories: parent,
            selected_child_categories: child,
        };
        self
    }
}

pub(crate) fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableCatalog {
    tables: BTreeMap<String, TableSettings>,
}

impl TableCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_record(record: HashMap<String, TableSettings>) -> Self {
        let tables = record
            .into_iter()
            .map(|(id, mut table)| {
                table.id = id.clone();
                (id, table)
            })
            .collect();
        TableCatalog { tables }
    }

    pub fn to_record(&self) -> HashMap<String, TableSettings> {
        self.tables
            .iter()
            .map(|(id, table)| (id.clone(), table.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TableSettings> {
        self.tables.values()
    }

    pub fn get(&self, id: &str) -> Option<&TableSettings> {
        self.tables.get(id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&TableSettings> {
        let key = name_key(name);
        self.tables.values().find(|t| name_key(&t.name) == key)
    }

    /// Fails when a table other than `except_id` already carries `name`.
    pub fn check_name(&self, name: &str, except_id: Option<&str>) -> std::result::Result<(), NamingConflict> {
        match self.find_by_name(name) {
            Some(existing) if Some(existing.id.as_str()) != except_id => {
                Err(NamingConflict::DuplicateTableName {
                    name: name.trim().to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    // Catalogs read from storage are not guaranteed to hold unique names
    pub fn validate_names(&self) -> std::result::Result<(), NamingConflict> {
        let mut seen = HashSet::new();
        for table in self.tables.values() {
            if !seen.insert(name_key(&table.name)) {
                return Err(NamingConflict::DuplicateTableName {
                    name: table.name.trim().to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn create_table(&mut self, name: &str) -> Result<&TableSettings> {
        let name = name.trim();
        if name.is_empty() {
            return Err(anyhow::anyhow!("Table name must not be empty"));
        }
        self.check_name(name, None)?;

        let stamp = now_millis();
        let mut id = format!("table-{stamp}");
        let mut suffix = 1;
        while self.tables.contains_key(&id) {
            id = format!("table-{stamp}-{suffix}");
            suffix += 1;
        }

        let mut table = TableSettings::new(id.clone(), name);
        table.last_update_timestamp = stamp;
        tracing::debug!(id = %id, name = name, "Created table");
        Ok(self.tables.entry(id).or_insert(table))
    }

    /// Inserts or replaces a table and stamps its update time.
    pub fn save(&mut self, mut settings: TableSettings) -> Result<&TableSettings> {
        if settings.id.trim().is_empty() {
            return Err(anyhow::anyhow!("Table '{}' has no id", settings.name));
        }
        if settings.name.trim().is_empty() {
            return Err(anyhow::anyhow!("Table '{}' has no name", settings.id));
        }
        self.check_name(&settings.name, Some(&settings.id))?;

        settings.parent_columns.renumber();
        settings.child_columns.renumber();
        if settings.display_name.is_empty() {
            settings.display_name = settings.name.clone();
        }
        settings.last_update_timestamp = now_millis();

        let id = settings.id.clone();
        tracing::debug!(
            id = %id,
            parent_columns = settings.parent_columns.len(),
            child_columns = settings.child_columns.len(),
            "Saved table"
        );
        self.tables.insert(id.clone(), settings);
        self.tables
            .get(&id)
            .with_context(|| format!("Table '{}' vanished after save", id))
    }

    pub fn delete(&mut self, id: &str) -> Option<TableSettings> {
        let removed = self.tables.remove(id);
        if removed.is_some() {
            tracing::debug!(id = id, "Deleted table");
        }
        removed
    }
}
