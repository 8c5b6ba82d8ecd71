use crate::domain::model::{Record, RecipeArgs};
use crate::domain::ports::Samples;
use crate::domain::recipe::{optional_f64, required_str, string_list, RecipeRegistry};
use crate::utils::error::{DatasetError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

/// Delimited text loaded into memory, one [`Record`] per row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
}

impl Table {
    pub fn from_path(path: &Path, delimiter: u8) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, delimiter)
    }

    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let columns: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(DatasetError::ProcessingError {
                    message: format!("duplicate column '{}' in header", column),
                });
            }
        }
        let mut rows = Vec::new();
        for result in csv_reader.records() {
            let row = result?;
            let data: HashMap<String, Value> = columns
                .iter()
                .zip(row.iter())
                .map(|(column, cell)| (column.clone(), parse_cell(cell)))
                .collect();
            rows.push(Record { data });
        }

        tracing::debug!("Parsed table with {} columns and {} rows", columns.len(), rows.len());
        Ok(Self { columns, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Result<Vec<&Value>> {
        if !self.has_column(name) {
            return Err(DatasetError::ProcessingError {
                message: format!("unknown column '{}'", name),
            });
        }
        Ok(self
            .rows
            .iter()
            .map(|row| row.data.get(name).unwrap_or(&Value::Null))
            .collect())
    }

    /// Recipes every tabular dataset supports.
    pub fn builtin_recipes() -> RecipeRegistry<Table> {
        let mut registry = RecipeRegistry::new();
        let registered = registry
            .register("increment", increment)
            .and_then(|r| r.register("select", select))
            .and_then(|r| r.register("drop_missing", drop_missing))
            .and_then(|r| r.register("rename", rename))
            .map(|_| ());
        debug_assert!(registered.is_ok(), "built-in recipe names are unique");
        registry
    }

    fn require_column(&self, recipe: &str, column: &str) -> Result<()> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(DatasetError::recipe_failed(
                recipe,
                format!("unknown column '{}'", column),
            ))
        }
    }
}

impl Samples for Table {
    type Item = Record;

    fn sample_count(&self) -> usize {
        self.rows.len()
    }

    fn sample(&self, index: usize) -> Result<Record> {
        Ok(self.rows[index].clone())
    }
}

fn parse_cell(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = cell.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = cell.parse::<f64>() {
        if f.is_nan() {
            return Value::Null;
        }
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    match cell {
        "true" | "True" | "TRUE" => Value::Bool(true),
        "false" | "False" | "FALSE" => Value::Bool(false),
        _ => Value::String(cell.to_string()),
    }
}

/// `increment { column, by = 1 }`: adds `by` to every numeric cell of `column`.
fn increment(mut table: Table, args: &RecipeArgs) -> Result<Table> {
    const RECIPE: &str = "increment";
    let column = required_str(RECIPE, args, "column")?.to_string();
    let by = optional_f64(RECIPE, args, "by")?.unwrap_or(1.0);
    table.require_column(RECIPE, &column)?;

    for row in &mut table.rows {
        let Some(cell) = row.data.get_mut(&column) else {
            continue;
        };
        *cell = match &*cell {
            Value::Null => Value::Null,
            Value::Number(n) => match n.as_i64() {
                Some(i) if by.fract() == 0.0 => match checked_step(i, by) {
                    Some(sum) => Value::from(sum),
                    None => {
                        return Err(DatasetError::recipe_failed(
                            RECIPE,
                            format!("adding {} to {} in column '{}' overflows", by, i, column),
                        ))
                    }
                },
                _ => n
                    .as_f64()
                    .and_then(|f| serde_json::Number::from_f64(f + by))
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
            },
            other => {
                return Err(DatasetError::recipe_failed(
                    RECIPE,
                    format!("non-numeric value {} in column '{}'", other, column),
                ))
            }
        };
    }
    Ok(table)
}

/// `i + by` for an integral `by`, or `None` when either side leaves the i64 range.
fn checked_step(i: i64, by: f64) -> Option<i64> {
    if by < i64::MIN as f64 || by >= i64::MAX as f64 {
        return None;
    }
    i.checked_add(by as i64)
}

/// `select { columns }`: keeps the given columns in the given order.
fn select(table: Table, args: &RecipeArgs) -> Result<Table> {
    const RECIPE: &str = "select";
    let columns = string_list(RECIPE, args, "columns")?.ok_or_else(|| {
        DatasetError::recipe_failed(RECIPE, "missing argument 'columns'")
    })?;
    for column in &columns {
        table.require_column(RECIPE, column)?;
    }

    let rows = table
        .rows
        .into_iter()
        .map(|mut row| Record {
            data: columns
                .iter()
                .filter_map(|c| row.data.remove_entry(c))
                .collect(),
        })
        .collect();
    Ok(Table { columns, rows })
}

/// `drop_missing { columns? }`: drops rows with a null in any of `columns` (default: all).
fn drop_missing(mut table: Table, args: &RecipeArgs) -> Result<Table> {
    const RECIPE: &str = "drop_missing";
    let columns = match string_list(RECIPE, args, "columns")? {
        Some(columns) => {
            for column in &columns {
                table.require_column(RECIPE, column)?;
            }
            columns
        }
        None => table.columns.clone(),
    };

    let before = table.rows.len();
    table.rows.retain(|row| {
        columns
            .iter()
            .all(|c| !matches!(row.data.get(c), None | Some(Value::Null)))
    });
    tracing::debug!("drop_missing removed {} rows", before - table.rows.len());
    Ok(table)
}

/// `rename { mapping = { old = "new" } }`
fn rename(mut table: Table, args: &RecipeArgs) -> Result<Table> {
    const RECIPE: &str = "rename";
    let mapping = args
        .get("mapping")
        .and_then(Value::as_object)
        .ok_or_else(|| DatasetError::recipe_failed(RECIPE, "missing object argument 'mapping'"))?;

    let mut renames = Vec::with_capacity(mapping.len());
    for (old, new) in mapping {
        table.require_column(RECIPE, old)?;
        let new = new.as_str().ok_or_else(|| {
            DatasetError::recipe_failed(RECIPE, format!("new name for '{}' must be a string", old))
        })?;
        renames.push((old.clone(), new.to_string()));
    }

    let mut columns = table.columns.clone();
    for (old, new) in &renames {
        if let Some(column) = columns.iter_mut().find(|c| c.as_str() == old.as_str()) {
            *column = new.clone();
        }
    }
    let mut seen = std::collections::HashSet::new();
    if let Some(dup) = columns.iter().find(|c| !seen.insert(c.as_str())) {
        return Err(DatasetError::recipe_failed(
            RECIPE,
            format!("renaming produces duplicate column '{}'", dup),
        ));
    }

    for row in &mut table.rows {
        let mut moved = Vec::with_capacity(renames.len());
        for (old, new) in &renames {
            if let Some(value) = row.data.remove(old) {
                moved.push((new.clone(), value));
            }
        }
        row.data.extend(moved);
    }
    table.columns = columns;
    Ok(table)
}
