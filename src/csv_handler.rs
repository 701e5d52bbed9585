use crate::error::Result;
use crate::table::{Table, cell_to_string};
use csv::{ReaderBuilder, WriterBuilder};
use log::debug;
use serde_json::Value;
use std::io::{Read, Write};
use std::path::Path;

// Reads a headered CSV file into a table. Empty cells become nulls.
pub fn read_table(file_path: &Path) -> Result<Table> {
    let file = std::fs::File::open(file_path)?;
    let table = read_table_from(file)?;
    debug!(
        "Read {} rows x {} columns from {:?}",
        table.len(),
        table.columns().len(),
        file_path
    );
    Ok(table)
}

pub fn read_table_from<R: Read>(source: R) -> Result<Table> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(source);
    let headers: Vec<String> = reader
        .byte_headers()?
        .iter()
        .map(|h| String::from_utf8_lossy(h).into_owned())
        .collect();

    let mut table = Table::new(headers);
    for result in reader.byte_records() {
        let record = result?;
        let row = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    Value::Null
                } else {
                    Value::String(String::from_utf8_lossy(field).into_owned())
                }
            })
            .collect();
        table.push_row(row)?;
    }
    Ok(table)
}

pub fn write_table(table: &Table, file_path: &Path) -> Result<()> {
    let file = std::fs::File::create(file_path)?;
    write_table_to(table, file)
}

pub fn write_table_to<W: Write>(table: &Table, sink: W) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(sink);
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(cell_to_string))?;
    }
    writer.flush()?;
    Ok(())
}

/// File name without its last extension, keeping the directory.
pub fn file_stem(file_path: &Path) -> String {
    let name = file_path.to_string_lossy();
    match name.rfind('.') {
        Some(dot) if dot > 0 && !name[dot..].contains(['/', '\\']) => name[..dot].to_string(),
        _ => name.into_owned(),
    }
}
