mod columns;
mod discovery;
mod elements;
mod errors;
mod export;
mod filtering;
mod parameters;
mod persistence;
mod processing;
mod tables;
mod values;

// Library exports
pub mod prelude {
    // Values
    pub use crate::values::ValueType;
    pub use crate::values::raw::{RawMap, RawMapExt, RawValue};
    pub use crate::values::state::{ParameterValue, ParameterValueState};
    pub use crate::values::coercion::{coerce_for_parameter, coerce_value, validate_for_parameter};

    // Errors
    pub use crate::errors::{BackendError, NamingConflict, ProcessingError, ValidationError};

    // Parameters
    pub use crate::parameters::{
        BimParameter, CUSTOM_GROUP, DEFAULT_GROUP, Parameter, ParameterGroup, UserParameter,
        UserParameterType,
    };
    pub use crate::parameters::equation::{EquationEvaluator, EquationValue, UnresolvedEquations};
    pub use crate::parameters::set::ParameterSet;

    // Elements
    pub use crate::elements::{ElementData, TableRow};

    // Discovery
    pub use crate::discovery::hooks::{DiscoveryHooks, DiscoveryServices, TracingHooks};
    pub use crate::discovery::{DiscoveredParameters, ParameterDiscovery};

    // Processing
    pub use crate::processing::transform::{CoercingTransform, ValueTransform};
    pub use crate::processing::{
        ParameterProcessor, ProcessingOptions, ProcessingProgress, ProcessingResult, ProgressCallback,
    };

    // Columns and filtering
    pub use crate::columns::merge::{RawParamColumn, duplicate_fields, merge_columns};
    pub use crate::columns::{ColumnDef, ColumnSet};
    pub use crate::filtering::{
        CategoryGroup, FilterOptions, Filterable, SortKey, filter_parameters, group_parameters,
    };

    // Tables and persistence
    pub use crate::persistence::load::load_tables_from_record;
    pub use crate::persistence::{BackendResult, RetryPolicy, SettingsBackend, SettingsService};
    pub use crate::tables::{CategoryFilters, TableCatalog, TableSettings};

    // Export
    pub use crate::export::{ExportSettings, ExportedTable, TabularFormat, encode_frame, export_rows, rows_to_frame};
}

// Internal imports for use within the crate
#[allow(unused_imports)]
pub(crate) mod imports {
    // Core types
    pub use crate::values::{ValueType, coercion::*, helpers::*, raw::*, state::*};

    pub use crate::errors::*;

    pub use crate::parameters::{
        BimParameter, CUSTOM_GROUP, DEFAULT_GROUP, Parameter, ParameterCommon, ParameterGroup,
        UserParameter, UserParameterType,
        equation::{EquationEvaluator, EquationValue, UnresolvedEquations, parse_references},
        set::ParameterSet,
    };

    pub use crate::elements::{ERROR_KEY, ElementData, TableRow, entry_value};

    pub use crate::discovery::hooks::{DiscoveryHooks, DiscoveryServices, TracingHooks};
    pub use crate::discovery::{DiscoveredParameters, ParameterDiscovery};

    pub use crate::columns::merge::{RawParamColumn, duplicate_fields, merge_columns};
    pub use crate::columns::{ColumnDef, ColumnSet};

    pub use crate::filtering::{
        CategoryGroup, FilterOptions, Filterable, OTHER_CATEGORY, SortKey, UNKNOWN_TYPE,
        filter_parameters, group_parameters,
    };

    pub use crate::tables::{CategoryFilters, TableCatalog, TableSettings};

    // Serde
    pub use serde::{Deserialize, Serialize};

    // Async traits
    pub use async_trait::async_trait;

    // Result and error handling
    pub type Result<T> = anyhow::Result<T>;
    pub use anyhow::Context as _;

    // File I/O
    pub use std::path::PathBuf;

    // Collections
    pub use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

    // Shared ownership
    pub use std::sync::Arc;

    // Lazy initialization
    pub use std::sync::LazyLock;
}

#[cfg(test)]
pub(crate) mod test_utils {
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init();
    }
}
