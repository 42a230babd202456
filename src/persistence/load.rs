use crate::imports::*;

/*
    Persisted user row layout:
    * `tables` - JSON column mapping table id -> TableSettings
    * `usersettings` / `settings` - Legacy JSON columns holding the same map under a `tables` key
    A column may hold the JSON value itself or a string with the JSON text.

    Functions:
    * load_tables_from_record - Reads the table catalog out of a user row, `tables` first, then the legacy columns
    * table_from_raw / column_from_raw - Field-by-field defaulting of persisted tables and columns
*/
pub const TABLES_COLUMN: &str = "tables";
pub const LEGACY_COLUMNS: [&str; 2] = ["usersettings", "settings"];

fn json_object(raw: &RawValue) -> Option<RawMap> {
    match raw {
        RawValue::Object(map) => Some(map.clone()),
        RawValue::String(text) => match serde_json::from_str::<RawValue>(text) {
            Ok(RawValue::Object(map)) => Some(map),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Persisted settings column is not valid JSON");
                None
            }
        },
        _ => None,
    }
}

fn tables_map(record: &RawMap) -> Option<(&'static str, RawMap)> {
    if let Some(tables) = record.get(TABLES_COLUMN).and_then(json_object) {
        return Some((TABLES_COLUMN, tables));
    }
    LEGACY_COLUMNS.iter().find_map(|column| {
        record
            .get(*column)
            .and_then(json_object)
            .and_then(|settings| settings.get(TABLES_COLUMN).and_then(json_object))
            .map(|tables| (*column, tables))
    })
}

pub fn load_tables_from_record(record: &RawMap) -> TableCatalog {
    let Some((source, tables)) = tables_map(record) else {
        tracing::debug!("User record carries no tables");
        return TableCatalog::new();
    };

    let mut loaded = HashMap::new();
    for (id, raw) in tables.iter() {
        match raw.as_object() {
            Some(table) => {
                loaded.insert(id.clone(), table_from_raw(id, table));
            }
            None => tracing::warn!(table_id = %id, source = source, "Skipping malformed persisted table"),
        }
    }
    tracing::debug!(source = source, tables = loaded.len(), "Loaded tables from user record");
    TableCatalog::from_record(loaded)
}

pub fn table_from_raw(id: &str, raw: &RawMap) -> TableSettings {
    let name = raw
        .get_optional_string("name")
        .or_else(|| raw.get_optional_string("displayName"))
        .unwrap_or_else(|| id.to_string());
    let display_name = raw
        .get_optional_string("displayName")
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| name.clone());
    let filters = raw.get_object("categoryFilters");

    TableSettings {
        id: raw.get_optional_string("id").unwrap_or_else(|| id.to_string()),
        name,
        display_name,
        parent_columns: columns_from_raw(id, raw.get("parentColumns")),
        child_columns: columns_from_raw(id, raw.get("childColumns")),
        category_filters: CategoryFilters {
            selected_parent_categories: filters
                .map(|f| f.get_string_list("selectedParentCategories"))
                .unwrap_or_default(),
            selected_child_categories: filters
                .map(|f| f.get_string_list("selectedChildCategories"))
                .unwrap_or_default(),
        },
        selected_parameter_ids: raw.get_string_list("selectedParameterIds"),
        filters: raw.get("filters").filter(|v| !v.is_null()).cloned(),
        sort: raw.get("sort").filter(|v| !v.is_null()).cloned(),
        metadata: raw.get_object("metadata").cloned(),
        last_update_timestamp: raw.get_optional_i64("lastUpdateTimestamp").unwrap_or_default(),
    }
}

fn columns_from_raw(table_id: &str, raw: Option<&RawValue>) -> ColumnSet {
    let Some(items) = raw.and_then(|r| r.as_array()) else {
        return ColumnSet::new();
    };
    let columns = items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let column = item.as_object().and_then(|map| column_from_raw(map, index as i64));
            if column.is_none() {
                tracing::warn!(table_id = table_id, index = index, "Skipping persisted column without a field");
            }
            column
        })
        .collect();
    ColumnSet::from_columns(columns)
}

pub fn column_from_raw(raw: &RawMap, index: i64) -> Option<ColumnDef> {
    let field = raw.get_optional_string("field").filter(|f| !f.is_empty())?;
    let header = raw
        .get_optional_string("header")
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| field.clone());
    let order = raw.get_optional_i64("order").unwrap_or(index);
    let visible = raw.get_optional_bool("visible").unwrap_or(true);
    let removable = raw.get_optional_bool("removable").unwrap_or(true);

    let parameter = raw
        .get("parameter")
        .and_then(|p| match serde_json::from_value::<Parameter>(p.clone()) {
            Ok(parameter) => Some(parameter),
            Err(e) => {
                tracing::warn!(field = %field, error = %e, "Rebuilding unreadable column parameter");
                None
            }
        })
        .unwrap_or_else(|| {
            Parameter::bim(header.clone(), field.clone(), ValueType::String, RawValue::Null)
                .with_header(header.clone())
        });

    Some(ColumnDef {
        id: raw.get_optional_string("id").unwrap_or_else(|| field.clone()),
        field,
        header,
        visible,
        removable,
        order,
        width: raw.get("width").and_then(|w| w.as_f64()),
        category: raw.get_optional_string("category").filter(|c| !c.is_empty()),
        parameter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(raw: RawValue) -> RawMap {
        match raw {
            RawValue::Object(map) => map,
            _ => panic!("record must be an object"),
        }
    }

    #[test]
    fn tables_column_wins_over_legacy() {
        let row = record(json!({
            "tables": {"t1": {"name": "Primary"}},
            "usersettings": {"tables": {"t2": {"name": "Legacy"}}}
        }));
        let catalog = load_tables_from_record(&row);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("t1").unwrap().name, "Primary");
    }

    #[test]
    fn unparsable_tables_column_falls_back() {
        let row = record(json!({
            "tables": "{not json",
            "usersettings": "{\"tables\": {\"t2\": {\"name\": \"Legacy\"}}}"
        }));
        let catalog = load_tables_from_record(&row);
        assert_eq!(catalog.get("t2").unwrap().name, "Legacy");

        let row = record(json!({"settings": {"tables": {"t3": {"name": "Oldest"}}}}));
        assert_eq!(load_tables_from_record(&row).get("t3").unwrap().name, "Oldest");

        assert!(load_tables_from_record(&RawMap::new()).is_empty());
    }

    #[test]
    fn tables_and_columns_are_defaulted_on_read() {
        let row = record(json!({
            "tables": {
                "t1": {
                    "name": "Walls",
                    "parentColumns": [
                        {"field": "mark", "order": 5},
                        {"field": "id", "header": "ID", "visible": false, "removable": false, "order": 2},
                        {"header": "no field"},
                        {"field": "Width", "width": 80}
                    ]
                },
                "broken": 4
            }
        }));
        let catalog = load_tables_from_record(&row);
        let table = catalog.get("t1").unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(table.display_name, "Walls");
        assert!(table.child_columns.is_empty());
        assert!(table.selected_parameter_ids.is_empty());
        assert!(table.category_filters.selected_parent_categories.is_empty());

        // Width had no order, so it takes its array index (3)
        let fields: Vec<&str> = table.parent_columns.iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["id", "Width", "mark"]);
        let orders: Vec<i64> = table.parent_columns.iter().map(|c| c.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);

        let mark = table.parent_columns.get("mark").unwrap();
        assert!(mark.visible && mark.removable);
        assert_eq!(mark.header, "mark");
        let id = table.parent_columns.get("id").unwrap();
        assert!(!id.visible && !id.removable);
        assert_eq!(table.parent_columns.get("Width").unwrap().width, Some(80.0));
    }

    #[test]
    fn blank_column_category_is_dropped() {
        let blank = record(json!({"field": "Width", "category": ""}));
        assert_eq!(column_from_raw(&blank, 0).unwrap().category, None);

        let walls = record(json!({"field": "Width", "category": "Walls"}));
        assert_eq!(column_from_raw(&walls, 0).unwrap().category.as_deref(), Some("Walls"));
    }
}
