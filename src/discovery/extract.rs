use crate::imports::*;

/*
    Types:
    * RawNode - One element of the flattened tree with a non-empty parameter record
    * RawParameter - A parameter entry pulled out of a RawNode, before type inference

    Functions:
    * flatten_tree - Depth-first flattening of the element tree, root first
    * extract_parameters - First-seen-wins extraction of raw parameters across all nodes
    * convert_parameter - Builds a BIM Parameter from a RawParameter
*/
#[derive(Debug, Clone)]
pub struct RawNode<'a> {
    pub id: String,
    pub element_type: String,
    pub parameters: &'a RawMap,
}

#[derive(Debug, Clone)]
pub struct RawParameter<'a> {
    pub name: String,
    pub field: String,
    pub value: &'a RawValue,
    pub group: ParameterGroup,
    pub nested: bool,
    pub element_id: String,
    pub element_type: String,
}

pub fn flatten_tree(root: &RawValue) -> Result<Vec<RawNode<'_>>> {
    let mut nodes = Vec::new();
    match root {
        RawValue::Object(map) => visit_node(map, "root", &mut nodes),
        // A bare list of elements is treated as the children of an implicit root
        RawValue::Array(items) => visit_children(items, "root", &mut nodes),
        other => {
            return Err(anyhow::anyhow!(
                "Element tree root must be an object or an array, got {}",
                value_kind(other)
            ));
        }
    }
    Ok(nodes)
}

fn visit_node<'a>(map: &'a RawMap, path: &str, nodes: &mut Vec<RawNode<'a>>) {
    match map.get("parameters") {
        Some(RawValue::Object(parameters)) if !parameters.is_empty() => {
            nodes.push(RawNode {
                id: map.get("id").map(stringify).unwrap_or_default(),
                element_type: map
                    .get_optional_string("type")
                    .or_else(|| map.get_optional_string("category"))
                    .unwrap_or_default(),
                parameters,
            });
        }
        Some(RawValue::Object(_)) | Some(RawValue::Null) | None => {}
        Some(other) => {
            tracing::warn!(
                path = path,
                found = value_kind(other),
                "Skipping malformed parameters on element tree node"
            );
        }
    }

    for key in ["children", "details"] {
        match map.get(key) {
            Some(RawValue::Array(items)) => visit_children(items, &format!("{path}.{key}"), nodes),
            Some(RawValue::Null) | None => {}
            Some(other) => {
                tracing::warn!(
                    path = path,
                    key = key,
                    found = value_kind(other),
                    "Skipping malformed child list on element tree node"
                );
            }
        }
    }
}

fn visit_children<'a>(items: &'a [RawValue], path: &str, nodes: &mut Vec<RawNode<'a>>) {
    for (index, item) in items.iter().enumerate() {
        let child_path = format!("{path}[{index}]");
        match item {
            RawValue::Object(child) => visit_node(child, &child_path, nodes),
            other => {
                tracing::warn!(
                    path = %child_path,
                    found = value_kind(other),
                    "Skipping malformed element tree node"
                );
            }
        }
    }
}

fn value_kind(value: &RawValue) -> &'static str {
    match value {
        RawValue::Null => "null",
        RawValue::Bool(_) => "boolean",
        RawValue::Number(_) => "number",
        RawValue::String(_) => "string",
        RawValue::Array(_) => "array",
        RawValue::Object(_) => "object",
    }
}

pub fn extract_parameters<'a>(nodes: &[RawNode<'a>]) -> Vec<RawParameter<'a>> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();

    for node in nodes {
        for (key, entry) in node.parameters.iter() {
            for raw in entries_of(node, key, entry) {
                if seen.insert(raw.name.clone()) {
                    out.push(raw);
                } else {
                    tracing::trace!(name = %raw.name, element_id = %node.id, "Parameter already discovered");
                }
            }
        }
    }
    out
}

fn entries_of<'a>(node: &RawNode<'a>, key: &str, entry: &'a RawValue) -> Vec<RawParameter<'a>> {
    let single = |value: &'a RawValue, group: ParameterGroup| RawParameter {
        name: key.to_string(),
        field: key.to_string(),
        value,
        group,
        nested: false,
        element_id: node.id.clone(),
        element_type: node.element_type.clone(),
    };

    match entry {
        RawValue::Object(map) if is_value_state(map) => vec![single(entry, ParameterGroup::new(DEFAULT_GROUP))],
        RawValue::Object(map) if map.contains_key("value") => {
            let value = map.get("value").unwrap_or(&RawValue::Null);
            vec![single(value, group_of(map.get("group")))]
        }
        // A record without a value is a group of nested parameters
        RawValue::Object(map) if !map.is_empty() => map
            .iter()
            .map(|(name, inner)| RawParameter {
                name: name.clone(),
                field: format!("{key}.{name}"),
                value: entry_value(inner),
                group: ParameterGroup::new(key),
                nested: true,
                element_id: node.id.clone(),
                element_type: node.element_type.clone(),
            })
            .collect(),
        other => vec![single(other, ParameterGroup::new(DEFAULT_GROUP))],
    }
}

fn group_of(raw: Option<&RawValue>) -> ParameterGroup {
    match raw {
        Some(RawValue::String(group)) if !group.is_empty() => ParameterGroup::new(group.as_str()),
        Some(RawValue::Object(map)) => {
            let fetched = map.get_optional_string("fetchedGroup");
            let current = map.get_optional_string("currentGroup");
            match (fetched, current) {
                (Some(fetched), Some(current)) => ParameterGroup {
                    fetched_group: fetched,
                    current_group: current,
                },
                (Some(group), None) | (None, Some(group)) => ParameterGroup::new(group),
                (None, None) => ParameterGroup::new(DEFAULT_GROUP),
            }
        }
        _ => ParameterGroup::new(DEFAULT_GROUP),
    }
}

pub fn convert_parameter(raw: &RawParameter<'_>, order: i64) -> Result<Parameter> {
    if raw.name.trim().is_empty() {
        return Err(anyhow::anyhow!(
            "Parameter on element '{}' has an empty name",
            raw.element_id
        ));
    }
    let value_type = infer_bim_type(raw.value);
    let mut parameter = Parameter::bim(raw.name.clone(), raw.field.clone(), value_type, raw.value.clone())
        .with_group(raw.group.clone())
        .with_order(order)
        .with_metadata("elementType", raw.element_type.clone())
        .with_metadata("elementId", raw.element_id.clone())
        .with_metadata("fullKey", raw.field.clone())
        .with_metadata("isNested", raw.nested);
    if !raw.element_type.is_empty() {
        parameter = parameter.with_category(raw.element_type.clone());
    }
    Ok(parameter)
}
