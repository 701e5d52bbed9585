//! In-memory occurrence table.
use crate::error::{CrateError, Result};
use crate::schema::RenameMap;
use serde_json::{Map, Value};

/// Column names plus rows of JSON cells. `Value::Null` marks a missing value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell at `row` in column `name`, `None` if either is out of range.
    pub fn cell(&self, row: usize, name: &str) -> Option<&Value> {
        let idx = self.column_index(name)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(CrateError::RowLength {
                row: self.rows.len() + 1,
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Appends `name` filled with nulls unless it already exists.
    pub fn ensure_column(&mut self, name: &str) {
        if self.contains(name) {
            return;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(Value::Null);
        }
    }

    /// Replaces column `name` with `values`, appending it if absent.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(CrateError::RowLength {
                row: 0,
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        let idx = match self.column_index(name) {
            Some(idx) => idx,
            None => {
                self.ensure_column(name);
                self.columns.len() - 1
            }
        };
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[idx] = value;
        }
        Ok(())
    }

    /// Mutable access to every value of one column.
    pub fn column_mut(&mut self, name: &str) -> Result<impl Iterator<Item = &mut Value>> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| CrateError::MissingColumn(name.to_string()))?;
        Ok(self.rows.iter_mut().map(move |row| &mut row[idx]))
    }

    pub fn rename_columns(&mut self, renames: &RenameMap) {
        for column in &mut self.columns {
            if let Some(to) = renames.get(column) {
                *column = to.to_string();
            }
        }
    }

    /// Removes the named columns. Every name must exist.
    pub fn drop_columns<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        let mut doomed = Vec::with_capacity(names.len());
        for name in names {
            let idx = self
                .column_index(name.as_ref())
                .ok_or_else(|| CrateError::MissingColumn(name.as_ref().to_string()))?;
            doomed.push(idx);
        }
        doomed.sort_unstable();
        doomed.dedup();
        self.retain_column_indices(|idx| doomed.binary_search(&idx).is_err());
        Ok(())
    }

    /// Moves the named columns (those present) to the front, in the given order.
    pub fn reorder<S: AsRef<str>>(&mut self, order: &[S]) {
        let mut indices: Vec<usize> = Vec::with_capacity(self.columns.len());
        for name in order {
            if let Some(idx) = self.column_index(name.as_ref()) {
                if !indices.contains(&idx) {
                    indices.push(idx);
                }
            }
        }
        for idx in 0..self.columns.len() {
            if !indices.contains(&idx) {
                indices.push(idx);
            }
        }

        self.columns = indices.iter().map(|&i| self.columns[i].clone()).collect();
        for row in &mut self.rows {
            let mut old = std::mem::take(row);
            *row = indices
                .iter()
                .map(|&i| std::mem::take(&mut old[i]))
                .collect();
        }
    }

    pub fn retain_rows(&mut self, mut keep: impl FnMut(&[Value]) -> bool) {
        self.rows.retain(|row| keep(row));
    }

    fn retain_column_indices(&mut self, keep: impl Fn(usize) -> bool) {
        let columns = std::mem::take(&mut self.columns);
        self.columns = columns
            .into_iter()
            .enumerate()
            .filter(|(i, _)| keep(*i))
            .map(|(_, c)| c)
            .collect();
        for row in &mut self.rows {
            let cells = std::mem::take(row);
            *row = cells
                .into_iter()
                .enumerate()
                .filter(|(i, _)| keep(*i))
                .map(|(_, v)| v)
                .collect();
        }
    }

    /// Flattens JSON objects into a table. Nested objects become
    /// `parent.child` columns; arrays stay as array cells.
    pub fn from_json_records(records: &[Value]) -> Result<Self> {
        let mut flat_records = Vec::with_capacity(records.len());
        let mut columns: Vec<String> = Vec::new();

        for (i, record) in records.iter().enumerate() {
            let object = record.as_object().ok_or_else(|| {
                CrateError::ApiResponseFormatError(format!("result {} is not a JSON object", i))
            })?;
            let mut flat = Vec::new();
            flatten_object("", object, &mut flat);
            for (name, _) in &flat {
                if !columns.contains(name) {
                    columns.push(name.clone());
                }
            }
            flat_records.push(flat);
        }

        let mut table = Table::new(columns);
        for flat in flat_records {
            let mut row = vec![Value::Null; table.columns.len()];
            for (name, value) in flat {
                if let Some(idx) = table.column_index(&name) {
                    row[idx] = value;
                }
            }
            table.rows.push(row);
        }
        Ok(table)
    }
}

fn flatten_object(prefix: &str, object: &Map<String, Value>, out: &mut Vec<(String, Value)>) {
    for (key, value) in object {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            Value::Object(inner) if !inner.is_empty() => flatten_object(&name, inner, out),
            _ => out.push((name, value.clone())),
        }
    }
}

/// Text form of a cell as written to CSV.
pub fn cell_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Text cells read from a CSV that stand for a missing value.
pub const NA_TOKENS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// True for nulls and NA tokens. Whitespace-only text is a value.
pub fn is_missing(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => NA_TOKENS.contains(&s.as_str()),
        _ => false,
    }
}
