//! CSV readers producing typed columns.
//!
//! Every field is parsed with a fixed ladder: empty means `Null`, then
//! bool, then integer, then float, with string as the fallback. The `*`
//! wildcard sentinel survives as a string and is interpreted by the raw
//! table constructor, not here.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv as csv_crate;
use ratekit_core::{Column, Frame, Value};
use ratekit_table::{from_raw, KeyedTable};

use crate::error::{Error, Result};

fn parse_cell(field: &str) -> Value {
    let field = field.trim();
    if field.is_empty() {
        return Value::Null;
    }
    match field {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(i) = field.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(f) = field.parse::<f64>() {
        return Value::Num(f);
    }
    Value::Str(field.to_string())
}

/// Read a headered CSV into named, typed columns.
pub fn read_columns<R: Read>(reader: R) -> Result<Vec<Column>> {
    let mut rdr = csv_crate::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv_crate::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(|s| s.to_string()).collect();
    if headers.is_empty() {
        return Err(Error::Schema("csv file has no header row".to_string()));
    }

    let mut columns: Vec<Column> = headers
        .iter()
        .map(|h| Column::new(h.clone(), Vec::new()))
        .collect();
    for record in rdr.records() {
        let record = record?;
        if record.len() != columns.len() {
            return Err(Error::Schema(format!(
                "row has {} fields, header has {}",
                record.len(),
                columns.len()
            )));
        }
        for (col, field) in columns.iter_mut().zip(record.iter()) {
            col.values.push(parse_cell(field));
        }
    }
    Ok(columns)
}

/// Read a table file's raw columns, naming convention intact.
pub fn read_csv_table(path: impl AsRef<Path>) -> Result<Vec<Column>> {
    let file = File::open(path.as_ref())?;
    read_columns(file)
}

/// Load a table file straight into a `KeyedTable` under `name`.
pub fn load_table(path: impl AsRef<Path>, name: &str) -> Result<KeyedTable> {
    let columns = read_csv_table(path)?;
    Ok(from_raw(name, &columns)?)
}

/// Read a record file into a frame keyed on `keys`.
pub fn read_csv_frame(path: impl AsRef<Path>, keys: &[&str]) -> Result<Frame> {
    let file = File::open(path.as_ref())?;
    let columns = read_columns(file)?;
    if keys.is_empty() {
        Ok(Frame::new(columns)?)
    } else {
        Ok(Frame::with_keys(
            columns,
            keys.iter().map(|s| s.to_string()).collect(),
        )?)
    }
}
