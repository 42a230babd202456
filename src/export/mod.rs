use polars::prelude::{Column, CsvWriter, DataFrame, JsonWriter, ParquetWriter, SerWriter};

use crate::imports::*;

/*
    CONSTS:
    * IDENTITY_COLUMNS - Leading columns every export carries
*/
pub const IDENTITY_COLUMNS: [&str; 4] = ["id", "type", "mark", "category"];

/*
    Types:
    * TabularFormat - Supported output formats
    * ExportSettings - Format and column selection of an export
    * ExportedTable - Encoded bytes plus the suggested file name
*/
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabularFormat {
    #[default]
    Csv,
    Json,
    Parquet,
}

impl TabularFormat {
    pub fn extension(&self) -> &str {
        match self {
            TabularFormat::Csv => "csv",
            TabularFormat::Json => "json",
            TabularFormat::Parquet => "parquet",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportSettings {
    pub(crate) format: TabularFormat,
    pub(crate) include_hidden: bool,
}

// Builder methods
impl ExportSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format(&self) -> TabularFormat {
        self.format
    }

    pub fn include_hidden(&self) -> bool {
        self.include_hidden
    }

    pub fn with_format(mut self, format: TabularFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_include_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportedTable {
    pub file_name: String,
    pub format: TabularFormat,
    pub bytes: Vec<u8>,
    pub rows_count: usize,
    pub columns_count: usize,
}

fn unique_name(header: &str, used: &mut HashSet<String>) -> String {
    if used.insert(header.to_string()) {
        return header.to_string();
    }
    let mut n = 1;
    loop {
        let candidate = format!("{header}_{n}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn cell<'a>(row: &'a TableRow, field: &str) -> Option<&'a ParameterValue> {
    row.get(field)
        .map(|state| state.effective())
        .filter(|value| !value.is_null())
}

fn value_column(name: String, column: &ColumnDef, rows: &[&TableRow]) -> Column {
    let field = column.field.as_str();
    match column.parameter.value_type() {
        ValueType::Number => {
            let values: Vec<Option<f64>> = rows
                .iter()
                .map(|row| cell(row, field).and_then(|v| v.as_f64()))
                .collect();
            Column::new(name.into(), values)
        }
        ValueType::Boolean => {
            let values: Vec<Option<bool>> = rows
                .iter()
                .map(|row| cell(row, field).and_then(|v| v.as_bool()))
                .collect();
            Column::new(name.into(), values)
        }
        _ => {
            let values: Vec<Option<String>> = rows
                .iter()
                .map(|row| cell(row, field).map(|v| v.display()))
                .collect();
            Column::new(name.into(), values)
        }
    }
}

/// One line per row, detail rows right after their parent.
/// Cells hold the effective value (user override first), typed by the column's parameter.
pub fn rows_to_frame(rows: &[TableRow], columns: &[ColumnDef], include_hidden: bool) -> Result<DataFrame> {
    let flat: Vec<&TableRow> = rows.iter().flat_map(|row| row.flatten()).collect();

    let mut used: HashSet<String> = IDENTITY_COLUMNS.iter().map(|c| c.to_string()).collect();
    let mut frame_columns = vec![
        Column::new("id".into(), flat.iter().map(|r| r.id.clone()).collect::<Vec<String>>()),
        Column::new(
            "type".into(),
            flat.iter().map(|r| r.element_type.clone()).collect::<Vec<String>>(),
        ),
        Column::new("mark".into(), flat.iter().map(|r| r.mark.clone()).collect::<Vec<String>>()),
        Column::new(
            "category".into(),
            flat.iter().map(|r| r.category.clone()).collect::<Vec<String>>(),
        ),
    ];

    let mut ordered: Vec<&ColumnDef> = columns
        .iter()
        .filter(|c| include_hidden || c.visible)
        .filter(|c| !IDENTITY_COLUMNS.contains(&c.field.as_str()))
        .collect();
    ordered.sort_by_key(|c| c.order);

    for column in ordered {
        let header = if column.header.is_empty() {
            &column.field
        } else {
            &column.header
        };
        let name = unique_name(header, &mut used);
        frame_columns.push(value_column(name, column, &flat));
    }

    DataFrame::new(frame_columns).context("Failed to build export frame")
}

/// Serialises the frame into an in-memory buffer; persisting the bytes is left to the host.
pub fn encode_frame(df: &mut DataFrame, format: TabularFormat) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    match format {
        TabularFormat::Csv => CsvWriter::new(&mut buffer)
            .include_header(true)
            .finish(df)
            .context("Failed to encode CSV")?,
        TabularFormat::Json => JsonWriter::new(&mut buffer)
            .finish(df)
            .context("Failed to encode JSON")?,
        TabularFormat::Parquet => {
            ParquetWriter::new(&mut buffer)
                .finish(df)
                .context("Failed to encode Parquet")?;
        }
    }
    Ok(buffer)
}

#[tracing::instrument(skip(rows, columns, settings), fields(rows = rows.len(), format = ?settings.format))]
pub async fn export_rows(
    rows: &[TableRow],
    columns: &[ColumnDef],
    name: &str,
    settings: &ExportSettings,
) -> Result<ExportedTable> {
    let mut df = rows_to_frame(rows, columns, settings.include_hidden)?;
    let (rows_count, columns_count) = (df.height(), df.width());

    let format = settings.format;
    let bytes = tokio::task::spawn_blocking(move || encode_frame(&mut df, format))
        .await
        .map_err(|e| anyhow::anyhow!("Task join error: {}", e))??;

    let exported = ExportedTable {
        file_name: format!("{}.{}", name, format.extension()),
        format,
        bytes,
        rows_count,
        columns_count,
    };
    tracing::debug!(
        file_name = %exported.file_name,
        bytes = exported.bytes.len(),
        rows = rows_count,
        columns = columns_count,
        "Encoded export"
    );
    Ok(exported)
}
