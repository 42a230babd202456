use std::num::NonZeroUsize;

use crate::imports::*;

pub mod cache;
pub mod transform;


use cache::LruCache;
use transform::{CoercingTransform, ValueTransform};

/*
    CONSTS:
    * DEFAULT_BATCH_SIZE - Elements handled between two cooperative yields
    * DEFAULT_CACHE_SIZE - Capacity of the per-invocation value cache
*/
pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_CACHE_SIZE: usize = 1000;

/*
    Types:
    * ProcessingOptions - Batch size, cache capacity and per-field default values
    * ProcessingProgress - Snapshot reported after every batch
    * ProcessingResult - One row per input element plus the aggregated per-element errors
    * ParameterProcessor - Turns elements into table rows by applying parameters to them
*/
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessingOptions {
    pub(crate) batch_size: usize,
    pub(crate) cache_size: usize,
    pub(crate) default_values: RawMap,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        ProcessingOptions {
            batch_size: DEFAULT_BATCH_SIZE,
            cache_size: DEFAULT_CACHE_SIZE,
            default_values: RawMap::new(),
        }
    }
}

// Builder methods
impl ProcessingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn cache_size(&self) -> usize {
        self.cache_size
    }

    pub fn default_values(&self) -> &RawMap {
        &self.default_values
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size;
        self
    }

    pub fn with_default_value(mut self, field: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.default_values.insert(field.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingProgress {
    pub processed: usize,
    pub total: usize,
    pub errors: Vec<ProcessingError>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult {
    pub rows: Vec<TableRow>,
    pub errors: Vec<ProcessingError>,
}

pub type ProgressCallback = Arc<dyn Fn(&ProcessingProgress) + Send + Sync>;

type ValueCache = LruCache<String, ParameterValue>;

#[derive(Clone)]
pub struct ParameterProcessor {
    options: ProcessingOptions,
    transform: Arc<dyn ValueTransform>,
    evaluator: Arc<dyn EquationEvaluator>,
    on_progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for ParameterProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterProcessor")
            .field("options", &self.options)
            .field("has_progress_callback", &self.on_progress.is_some())
            .finish()
    }
}

impl Default for ParameterProcessor {
    fn default() -> Self {
        Self::new(ProcessingOptions::default())
    }
}

impl ParameterProcessor {
    pub fn new(options: ProcessingOptions) -> Self {
        ParameterProcessor {
            options,
            transform: Arc::new(CoercingTransform),
            evaluator: Arc::new(UnresolvedEquations),
            on_progress: None,
        }
    }

    pub fn options(&self) -> &ProcessingOptions {
        &self.options
    }

    pub fn with_transform(mut self, transform: Arc<dyn ValueTransform>) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_equation_evaluator(mut self, evaluator: Arc<dyn EquationEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ProcessingProgress) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    /// Applies `parameters` to every element and to every detail element.
    pub async fn process(&self, elements: &[ElementData], parameters: &[Parameter]) -> ProcessingResult {
        self.run(elements, parameters, parameters).await
    }

    /// Like [`ParameterProcessor::process`], with a separate parameter set for detail elements.
    pub async fn process_table(
        &self,
        elements: &[ElementData],
        parent_parameters: &[Parameter],
        child_parameters: &[Parameter],
    ) -> ProcessingResult {
        self.run(elements, parent_parameters, child_parameters).await
    }

    #[tracing::instrument(
        skip(self, elements, parent_parameters, child_parameters),
        fields(
            elements = elements.len(),
            parameters = parent_parameters.len(),
            batch_size = self.options.batch_size
        )
    )]
    async fn run(
        &self,
        elements: &[ElementData],
        parent_parameters: &[Parameter],
        child_parameters: &[Parameter],
    ) -> ProcessingResult {
        let cache_size = match self.check_input(parent_parameters, child_parameters) {
            Ok(cache_size) => cache_size,
            Err(e) => return self.fail_all(elements, &e),
        };

        // Private to this invocation
        let mut cache: ValueCache = LruCache::new(cache_size);
        let total = elements.len();
        let batch_count = total.div_ceil(self.options.batch_size);
        let mut rows = Vec::with_capacity(total);
        let mut errors = Vec::new();

        for (batch, chunk) in elements.chunks(self.options.batch_size).enumerate() {
            let errors_before = errors.len();
            for element in chunk {
                let mut row = self
                    .row_or_error(element, parent_parameters, &mut cache, &mut errors)
                    .await;
                if let Some(details) = &element.details {
                    let mut detail_rows = Vec::with_capacity(details.len());
                    for detail in details {
                        detail_rows.push(
                            self.row_or_error(detail, child_parameters, &mut cache, &mut errors)
                                .await,
                        );
                    }
                    row.details = Some(detail_rows);
                }
                rows.push(row);
            }

            tracing::debug!(
                batch = batch,
                processed = rows.len(),
                total = total,
                batch_errors = errors.len() - errors_before,
                cached_values = cache.len(),
                "Processed batch"
            );
            self.report(rows.len(), total, &errors);

            if batch + 1 < batch_count {
                tokio::task::yield_now().await;
            }
        }

        ProcessingResult { rows, errors }
    }

    fn check_input(&self, parent_parameters: &[Parameter], child_parameters: &[Parameter]) -> Result<NonZeroUsize> {
        if self.options.batch_size == 0 {
            return Err(anyhow::anyhow!("Batch size must be greater than zero"));
        }
        let cache_size =
            NonZeroUsize::new(self.options.cache_size).context("Cache size must be greater than zero")?;
        if let Some(parameter) = parent_parameters
            .iter()
            .chain(child_parameters)
            .find(|p| p.field().trim().is_empty())
        {
            return Err(anyhow::anyhow!("Parameter '{}' has no field to read", parameter.id()));
        }
        Ok(cache_size)
    }

    // Every element still gets a row so the table renders one line per input
    fn fail_all(&self, elements: &[ElementData], error: &anyhow::Error) -> ProcessingResult {
        let message = format!("{error:#}");
        tracing::error!(elements = elements.len(), error = %message, "Processing input rejected");
        let rows: Vec<TableRow> = elements
            .iter()
            .map(|element| TableRow::error(element, message.clone()))
            .collect();
        let errors: Vec<ProcessingError> = elements
            .iter()
            .map(|element| ProcessingError::new(element.id.clone(), None, message.clone()))
            .collect();
        self.report(rows.len(), elements.len(), &errors);
        ProcessingResult { rows, errors }
    }

    fn report(&self, processed: usize, total: usize, errors: &[ProcessingError]) {
        if let Some(callback) = &self.on_progress {
            callback(&ProcessingProgress {
                processed,
                total,
                errors: errors.to_vec(),
            });
        }
    }

    async fn row_or_error(
        &self,
        element: &ElementData,
        parameters: &[Parameter],
        cache: &mut ValueCache,
        errors: &mut Vec<ProcessingError>,
    ) -> TableRow {
        match self.build_row(element, parameters, cache).await {
            Ok(row) => row,
            Err(error) => {
                tracing::error!(
                    element_id = %error.element_id,
                    field = ?error.field,
                    error = %error.message,
                    "Element failed processing"
                );
                let row = TableRow::error(element, error.message.clone());
                errors.push(error);
                row
            }
        }
    }

    async fn build_row(
        &self,
        element: &ElementData,
        parameters: &[Parameter],
        cache: &mut ValueCache,
    ) -> std::result::Result<TableRow, ProcessingError> {
        let mut row = TableRow::for_element(element);
        for parameter in parameters {
            let state = self
                .resolve(element, parameter, &row, cache)
                .await
                .map_err(|e| {
                    ProcessingError::new(
                        element.id.clone(),
                        Some(parameter.field().to_string()),
                        format!("{e:#}"),
                    )
                })?;
            row.parameters.insert(parameter.field().to_string(), state);
        }
        Ok(row)
    }

    async fn resolve(
        &self,
        element: &ElementData,
        parameter: &Parameter,
        row: &TableRow,
        cache: &mut ValueCache,
    ) -> Result<ParameterValueState> {
        let field = parameter.field();
        let raw = match element.read_field(field) {
            Some(raw) if !raw.is_null() => raw.clone(),
            _ => match self.fallback(parameter) {
                Some(raw) => raw,
                None => {
                    return Ok(ParameterValueState::fresh(
                        ParameterValue::Null,
                        empty_value(parameter.value_type()),
                    ));
                }
            },
        };

        validate_for_parameter(parameter, &raw)?;

        let key = format!("{}:{field}{raw}", parameter.value_type());
        let value = match cache.get(&key) {
            Some(value) => value.clone(),
            None => {
                let value = self
                    .transform
                    .transform(parameter, &raw)
                    .await
                    .with_context(|| format!("Failed to transform '{field}'"))?;
                cache.put(key, value.clone());
                value
            }
        };

        let current = match &value {
            ParameterValue::Equation(equation) if parameter.is_user() => self
                .evaluator
                .evaluate(equation, &row.parameters)
                .with_context(|| format!("Failed to evaluate equation of '{field}'"))?,
            _ => value,
        };
        Ok(ParameterValueState::fresh(ParameterValue::from_raw(&raw), current))
    }

    // Configured default first, then the user parameter's own value
    fn fallback(&self, parameter: &Parameter) -> Option<RawValue> {
        if let Some(default) = self.options.default_values.get(parameter.field()) {
            return Some(default.clone());
        }
        match parameter {
            Parameter::User(user) if !user.value.is_null() => Some(user.value.to_raw()),
            _ => None,
        }
    }
}
