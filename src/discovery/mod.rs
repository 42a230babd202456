use crate::imports::*;

pub mod extract;
pub mod hooks;

use extract::{convert_parameter, extract_parameters, flatten_tree};

/*
    Types:
    * DiscoveredParameters - Discovery output split by table role
    * ParameterDiscovery - Walks an element tree and turns its raw parameter maps into BIM parameters
*/
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveredParameters {
    pub parent: Vec<Parameter>,
    pub child: Vec<Parameter>,
}

impl DiscoveredParameters {
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty() && self.child.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ParameterDiscovery {
    services: DiscoveryServices,
}

impl Default for ParameterDiscovery {
    fn default() -> Self {
        ParameterDiscovery {
            services: DiscoveryServices::defaults(),
        }
    }
}

impl ParameterDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_services(services: DiscoveryServices) -> Self {
        ParameterDiscovery { services }
    }

    pub fn services_mut(&mut self) -> &mut DiscoveryServices {
        &mut self.services
    }

    #[tracing::instrument(
        skip(self, root, parent_categories, child_categories, user_parameters),
        fields(
            parent_categories = parent_categories.len(),
            child_categories = child_categories.len()
        )
    )]
    pub async fn discover(
        &self,
        root: &RawValue,
        parent_categories: &[String],
        child_categories: &[String],
        user_parameters: Option<&[Parameter]>,
    ) -> Result<DiscoveredParameters> {
        self.services.on_start().await?;

        let nodes = match flatten_tree(root) {
            Ok(nodes) => nodes,
            Err(e) => {
                self.services.on_error(&e).await?;
                return Err(e.context("Parameter discovery aborted"));
            }
        };

        let mut discovered = Vec::new();
        for raw in extract_parameters(&nodes) {
            let order = discovered.len() as i64;
            match convert_parameter(&raw, order) {
                Ok(parameter) => discovered.push(parameter),
                Err(e) => {
                    tracing::warn!(
                        element_id = %raw.element_id,
                        name = %raw.name,
                        error = %e,
                        "Skipping parameter that failed conversion"
                    );
                }
            }
        }
        tracing::debug!(
            nodes = nodes.len(),
            parameters = discovered.len(),
            "Extracted parameters from element tree"
        );

        let user_parameters = user_parameters.unwrap_or_default();
        let mut output = DiscoveredParameters::default();
        for parameter in discovered.iter() {
            let element_type = parameter
                .common()
                .metadata
                .get_optional_string("elementType")
                .unwrap_or_default();
            classify(&mut output, parameter, Some(element_type.as_str()), parent_categories, child_categories);
        }
        for parameter in user_parameters {
            classify(&mut output, parameter, parameter.category(), parent_categories, child_categories);
        }

        let mut all = discovered;
        all.extend(user_parameters.iter().cloned());
        self.services.on_complete(&all).await?;

        tracing::debug!(
            parent = output.parent.len(),
            child = output.child.len(),
            "Classified discovered parameters"
        );
        Ok(output)
    }
}

// `None` category only happens for user parameters, they belong to both roles
fn classify(
    output: &mut DiscoveredParameters,
    parameter: &Parameter,
    category: Option<&str>,
    parent_categories: &[String],
    child_categories: &[String],
) {
    let Some(category) = category else {
        output.parent.push(parameter.clone());
        output.child.push(parameter.clone());
        return;
    };
    let in_parent = parent_categories.iter().any(|c| c == category);
    let in_child = child_categories.iter().any(|c| c == category);
    if in_parent {
        output.parent.push(parameter.clone());
    }
    if in_child {
        output.child.push(parameter.clone());
    }
    if !in_parent && !in_child {
        tracing::trace!(name = parameter.name(), category = category, "Parameter outside selected categories");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_tracing;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cats(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[derive(Default)]
    struct CountingHooks {
        started: AtomicUsize,
        completed: AtomicUsize,
        failed: AtomicUsize,
        last_count: AtomicUsize,
    }

    #[async_trait]
    impl DiscoveryHooks for CountingHooks {
        async fn on_start(&self) -> Result<()> {
            self.started.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn on_complete(&self, parameters: &[Parameter]) -> Result<()> {
            self.completed.fetch_add(1, Ordering::SeqCst);
            self.last_count.store(parameters.len(), Ordering::SeqCst);
            Ok(())
        }
        async fn on_error(&self, _error: &anyhow::Error) -> Result<()> {
            self.failed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn single_wall_yields_one_parent_parameter() {
        init_tracing();
        let tree = json!([{
            "id": "a",
            "type": "Wall",
            "parameters": {"Mark": {"value": "W1", "group": {"currentGroup": "Identity"}}}
        }]);
        let discovered = ParameterDiscovery::new()
            .discover(&tree, &cats(&["Wall"]), &[], None)
            .await
            .unwrap();

        assert_eq!(discovered.parent.len(), 1);
        assert!(discovered.child.is_empty());
        let mark = &discovered.parent[0];
        assert_eq!(mark.name(), "Mark");
        assert_eq!(mark.kind(), "bim");
        assert_eq!(mark.type_label(), "string");
        assert_eq!(mark.group().display(), "Identity");
    }

    #[tokio::test]
    async fn first_seen_definition_wins() {
        init_tracing();
        let tree = json!({
            "id": "root",
            "children": [
                {"id": "w1", "type": "Wall", "parameters": {"Mark": {"value": "W1", "group": "Identity"}}},
                {"id": "w2", "type": "Wall", "parameters": {"Mark": {"value": 42, "group": "Other"}}}
            ]
        });
        let discovered = ParameterDiscovery::new()
            .discover(&tree, &cats(&["Wall"]), &[], None)
            .await
            .unwrap();

        assert_eq!(discovered.parent.len(), 1);
        let mark = &discovered.parent[0];
        assert_eq!(mark.group().display(), "Identity");
        assert_eq!(mark.value_type(), ValueType::String);
        assert_eq!(mark.common().metadata["elementId"], "w1");
    }

    #[tokio::test]
    async fn classification_by_element_type() {
        init_tracing();
        let tree = json!({
            "id": "root",
            "children": [
                {"id": "w", "type": "Wall", "parameters": {"Width": 0.3}, "details": [
                    {"id": "win", "type": "Window", "parameters": {"Glazing": "Double"}}
                ]},
                {"id": "f", "type": "Floor", "parameters": {"Area": 20}}
            ]
        });
        let users = vec![
            Parameter::from(UserParameter::fixed("u1", "Note", ParameterValue::Null)),
            Parameter::from(UserParameter::fixed("u2", "Frame", ParameterValue::Null)).with_category("Window"),
        ];
        let hooks = Arc::new(CountingHooks::default());
        let mut services = DiscoveryServices::new();
        services.add_shared_hook(hooks.clone());

        let discovered = ParameterDiscovery::with_services(services)
            .discover(&tree, &cats(&["Wall"]), &cats(&["Window"]), Some(&users))
            .await
            .unwrap();

        let parent: Vec<&str> = discovered.parent.iter().map(|p| p.name()).collect();
        let child: Vec<&str> = discovered.child.iter().map(|p| p.name()).collect();
        assert_eq!(parent, vec!["Width", "Note"]);
        assert_eq!(child, vec!["Glazing", "Note", "Frame"]);

        assert_eq!(hooks.started.load(Ordering::SeqCst), 1);
        assert_eq!(hooks.completed.load(Ordering::SeqCst), 1);
        assert_eq!(hooks.last_count.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn bad_root_aborts_and_reports() {
        init_tracing();
        let hooks = Arc::new(CountingHooks::default());
        let mut services = DiscoveryServices::new();
        services.add_shared_hook(hooks.clone());

        let result = ParameterDiscovery::with_services(services)
            .discover(&json!(17), &cats(&["Wall"]), &[], None)
            .await;

        assert!(result.is_err());
        assert_eq!(hooks.failed.load(Ordering::SeqCst), 1);
        assert_eq!(hooks.completed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_named_parameter_is_skipped() {
        init_tracing();
        let tree = json!({"id": "w", "type": "Wall", "parameters": {"": 1, "Mark": "W"}});
        let discovered = ParameterDiscovery::new()
            .discover(&tree, &cats(&["Wall"]), &[], None)
            .await
            .unwrap();
        let names: Vec<&str> = discovered.parent.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["Mark"]);
        assert_eq!(discovered.parent[0].order(), 0);
    }
}
