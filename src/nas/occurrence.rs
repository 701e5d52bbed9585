//! Brings API and CSV occurrence tables onto the canonical schema.
use crate::error::Result;
use crate::filter::{columns_to_drop, validate_keep};
use crate::nas::client::{NasClient, OccurrenceQuery};
use crate::reference::{is_reference_group_column, unpack_references};
use crate::schema::{RenameMap, SourceKind, occurrence_header, rename_map};
use crate::table::Table;
use log::{debug, info, warn};

/// Columns kept from a raw API table when the caller names none.
pub const RAW_DEFAULT_COLUMNS: [&str; 3] = ["key", "decimalLatitude", "decimalLongitude"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableMode {
    /// Canonical lower-case schema shared with CSV exports.
    Normalized,
    /// Column names exactly as the API returns them.
    Raw,
}

pub fn normalize_api_table(mut table: Table, keep: Option<&[String]>) -> Result<Table> {
    // 1. API names onto the canonical schema
    let renames = rename_map(table.columns(), SourceKind::Api);
    log_renames(&renames);
    table.rename_columns(&renames);
    // 2. Missing columns, canonical order, then the keep list
    conform_to_header(&mut table);
    apply_keep(table, keep)
}

pub fn normalize_csv_table(mut table: Table, keep: Option<&[String]>) -> Result<Table> {
    // 1. Export headings onto the canonical schema
    let renames = rename_map(table.columns(), SourceKind::Csv);
    log_renames(&renames);
    table.rename_columns(&renames);

    // 2. Fold the flat groups into one `references` list per row
    let references = unpack_references(&table)?;
    table.set_column("references", references)?;

    let group_columns: Vec<String> = table
        .columns()
        .iter()
        .filter(|c| is_reference_group_column(c))
        .cloned()
        .collect();
    debug!("Dropping {} flat reference columns", group_columns.len());
    table.drop_columns(&group_columns)?;

    // 3. Missing columns, canonical order, then the keep list
    conform_to_header(&mut table);
    apply_keep(table, keep)
}

/// API table with its own column names; `key` leads when present.
pub fn raw_api_table(mut table: Table, keep: Option<&[String]>) -> Result<Table> {
    let default_keep: Vec<String> = RAW_DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect();
    let keep = keep.unwrap_or(&default_keep);
    // Columns absent from an empty response are not an error.
    if !table.columns().is_empty() {
        validate_keep(table.columns(), keep)?;
    }
    let drop = columns_to_drop(table.columns(), keep);
    table.drop_columns(&drop)?;
    table.reorder(&["key"]);
    Ok(table)
}

pub async fn fetch_occurrence_table(
    client: &NasClient,
    query: &OccurrenceQuery,
    mode: TableMode,
    keep: Option<&[String]>,
) -> Result<Table> {
    let response = client.search_occurrences(query).await?;
    if response.results.is_empty() {
        warn!("No occurrence records returned for species {}", query.species_id);
    }
    let table = Table::from_json_records(&response.results)?;
    match mode {
        TableMode::Normalized => normalize_api_table(table, keep),
        TableMode::Raw => raw_api_table(table, keep),
    }
}

fn log_renames(renames: &RenameMap) {
    if !renames.is_empty() {
        debug!("Renaming {} columns", renames.len());
    }
}

// Adds missing canonical columns as nulls and moves the canonical ones first.
fn conform_to_header(table: &mut Table) {
    let header = occurrence_header();
    let missing: Vec<&str> = header
        .iter()
        .copied()
        .filter(|c| !table.contains(c))
        .collect();
    if !missing.is_empty() {
        debug!("Adding empty columns: {}", missing.join(", "));
    }
    for column in missing {
        table.ensure_column(column);
    }
    table.reorder(header);
}

fn apply_keep(mut table: Table, keep: Option<&[String]>) -> Result<Table> {
    let Some(keep) = keep else {
        return Ok(table);
    };
    validate_keep(table.columns(), keep)?;
    let drop = columns_to_drop(table.columns(), keep);
    info!("Keeping {} columns, dropping {}", keep.len(), drop.len());
    table.drop_columns(&drop)?;
    Ok(table)
}
