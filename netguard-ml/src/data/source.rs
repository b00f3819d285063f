//! Tabular datasets and the CSV codec every stage uses to hand data to the next one.

use crate::error::MlError;
use crate::persistence::atomic_write;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// An ordered table of rows with named columns. Missing values are `Value::Null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataBatch {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl DataBatch {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of one column, in row order.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).unwrap_or(&Value::Null))
                .collect(),
        )
    }

    /// Remove a column if present. Returns whether anything was dropped.
    pub fn drop_column(&mut self, name: &str) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        self.columns.remove(idx);
        for row in &mut self.rows {
            if idx < row.len() {
                row.remove(idx);
            }
        }
        true
    }

    /// Replace every string cell equal to `sentinel` with null.
    pub fn replace_sentinel(&mut self, sentinel: &str) -> usize {
        let mut replaced = 0;
        for cell in self.rows.iter_mut().flatten() {
            if cell.as_str() == Some(sentinel) {
                *cell = Value::Null;
                replaced += 1;
            }
        }
        replaced
    }

    /// New batch holding the rows at `indices`, in that order.
    pub fn select_rows(&self, indices: &[usize]) -> DataBatch {
        DataBatch {
            columns: self.columns.clone(),
            rows: indices
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
        }
    }

    /// Append a column. `values` must have one entry per row.
    pub fn push_column(&mut self, name: &str, values: Vec<Value>) -> Result<(), MlError> {
        if values.len() != self.rows.len() {
            return Err(MlError::invalid_input(format!(
                "column '{name}' has {} values for {} rows",
                values.len(),
                self.rows.len()
            )));
        }
        self.columns.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }

    /// Build a table from JSON documents. Columns are the union of keys in first-seen order.
    pub fn from_documents(docs: Vec<Map<String, Value>>) -> DataBatch {
        let mut columns: Vec<String> = Vec::new();
        for doc in &docs {
            for key in doc.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
        let rows = docs
            .into_iter()
            .map(|mut doc| {
                columns
                    .iter()
                    .map(|col| doc.remove(col).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        DataBatch { columns, rows }
    }

    /// Convert rows back into JSON documents.
    pub fn to_documents(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }
}

/// CSV file data source.
pub struct CsvSource;

impl CsvSource {
    /// Read a CSV file with a header row. Cells are typed: empty → null, integers, floats,
    /// `true`/`false`, otherwise strings.
    pub fn read(path: &Path) -> Result<DataBatch, MlError> {
        if !path.exists() {
            return Err(MlError::not_found(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<DataBatch, MlError> {
        let mut records = parse_records(content)?.into_iter();
        let columns: Vec<String> = records
            .next()
            .ok_or_else(|| MlError::dataset("Empty CSV file"))?
            .into_iter()
            .map(|s| s.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for (line_no, record) in records.enumerate() {
            if record.len() == 1 && record[0].trim().is_empty() {
                continue;
            }
            if record.len() != columns.len() {
                return Err(MlError::dataset(format!(
                    "CSV record {} has {} fields, header has {}",
                    line_no + 2,
                    record.len(),
                    columns.len()
                )));
            }
            rows.push(record.iter().map(|s| parse_cell(s)).collect());
        }
        Ok(DataBatch { columns, rows })
    }

    /// Write a batch as CSV with a header row (atomic).
    pub fn write(path: &Path, batch: &DataBatch) -> Result<(), MlError> {
        atomic_write(path, Self::render(batch).as_bytes())?;
        Ok(())
    }

    pub fn render(batch: &DataBatch) -> String {
        let mut out = String::new();
        let header: Vec<String> = batch.columns.iter().map(|c| escape_field(c)).collect();
        out.push_str(&header.join(","));
        out.push('\n');
        for row in &batch.rows {
            let fields: Vec<String> = row.iter().map(render_cell).collect();
            out.push_str(&fields.join(","));
            out.push('\n');
        }
        out
    }
}

/// Type a raw CSV field.
pub fn parse_cell(raw: &str) -> Value {
    let s = raw.trim();
    if s.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Number(i.into());
    }
    // non-finite floats ("inf", "NaN") have no JSON number and stay text
    if let Some(n) = s.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
        return Value::Number(n);
    }
    match s {
        "true" | "True" => Value::Bool(true),
        "false" | "False" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => escape_field(s),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => escape_field(&other.to_string()),
    }
}

fn escape_field(s: &str) -> String {
    let needs_quotes = s.contains([',', '"', '\n', '\r']) || s.trim() != s;
    if needs_quotes {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Split CSV text into records, honouring quoted fields with embedded commas,
/// doubled quotes, and newlines.
fn parse_records(content: &str) -> Result<Vec<Vec<String>>, MlError> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }
    if in_quotes {
        return Err(MlError::dataset("Unterminated quoted field in CSV"));
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_data_batch_empty() {
        let batch = DataBatch::empty();
        assert_eq!(batch.row_count(), 0);
        assert_eq!(batch.column_count(), 0);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_parse_typed_cells() {
        let batch = CsvSource::parse("protocol,bytes,ratio,flag,note\nTCP,120,0.5,true,\n").unwrap();
        assert_eq!(batch.columns, vec!["protocol", "bytes", "ratio", "flag", "note"]);
        assert_eq!(
            batch.rows[0],
            vec![json!("TCP"), json!(120), json!(0.5), json!(true), Value::Null]
        );
    }

    #[test]
    fn test_non_finite_floats_stay_text() {
        assert_eq!(parse_cell("inf"), json!("inf"));
        assert_eq!(parse_cell("NaN"), json!("NaN"));
        let batch = DataBatch::new(
            vec!["bytes".into(), "tag".into()],
            vec![vec![json!(7), json!("inf")]],
        );
        let parsed = CsvSource::parse(&CsvSource::render(&batch)).unwrap();
        assert_eq!(parsed, batch);
    }

    #[test]
    fn test_quoted_fields() {
        let batch = CsvSource::parse("a,b\n\"x, y\",\"say \"\"hi\"\"\"\n").unwrap();
        assert_eq!(batch.rows[0], vec![json!("x, y"), json!("say \"hi\"")]);
        let rendered = CsvSource::render(&batch);
        assert_eq!(CsvSource::parse(&rendered).unwrap(), batch);
    }

    #[test]
    fn test_ragged_record_is_rejected() {
        let err = CsvSource::parse("a,b\n1\n").unwrap_err();
        assert!(err.to_string().contains("has 1 fields"));
    }

    #[test]
    fn test_drop_column_and_sentinel() {
        let mut batch = DataBatch::new(
            vec!["_id".into(), "protocol".into()],
            vec![vec![json!("1"), json!("na")], vec![json!("2"), json!("UDP")]],
        );
        assert!(batch.drop_column("_id"));
        assert!(!batch.drop_column("_id"));
        assert_eq!(batch.replace_sentinel("na"), 1);
        assert_eq!(batch.rows[0], vec![Value::Null]);
    }

    #[test]
    fn test_from_documents_unions_keys() {
        let docs = vec![
            json!({"a": 1, "b": 2}).as_object().unwrap().clone(),
            json!({"b": 3, "c": 4}).as_object().unwrap().clone(),
        ];
        let batch = DataBatch::from_documents(docs);
        assert_eq!(batch.columns, vec!["a", "b", "c"]);
        assert_eq!(batch.rows[1], vec![Value::Null, json!(3), json!(4)]);
    }

    #[test]
    fn test_read_missing_file_is_not_found() {
        let err = CsvSource::read(Path::new("/nonexistent/train.csv")).unwrap_err();
        assert!(matches!(err, MlError::NotFound(_)));
    }
}
