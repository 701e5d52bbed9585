//! Plain-text reports: most common reference lists and species search results.
use crate::error::{CrateError, Result};
use crate::nas::client::SearchResponse;
use crate::reference::{Reference, parse_references};
use crate::table::{Table, cell_to_string};
use log::warn;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Write;

const REFERENCES_COLUMN: &str = "references";

/// Counts identical reference lists, most common first. Ties keep the order
/// in which the lists were first seen; rows without references are skipped.
pub fn reference_counts(table: &Table) -> Result<Vec<(Vec<Reference>, usize)>> {
    let idx = table
        .column_index(REFERENCES_COLUMN)
        .ok_or_else(|| CrateError::MissingColumn(REFERENCES_COLUMN.to_string()))?;

    let mut counts: Vec<(Vec<Reference>, usize)> = Vec::new();
    let mut positions: HashMap<Vec<Reference>, usize> = HashMap::new();
    for (row_num, row) in table.rows().iter().enumerate() {
        let references = match parse_references(&row[idx]) {
            Ok(refs) => refs,
            Err(e) => {
                warn!("Skipping unreadable references in row {}: {}", row_num + 1, e);
                continue;
            }
        };
        if references.is_empty() {
            continue;
        }
        match positions.get(&references) {
            Some(&pos) => counts[pos].1 += 1,
            None => {
                positions.insert(references.clone(), counts.len());
                counts.push((references, 1));
            }
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(counts)
}

pub fn write_reference_report(
    counts: &[(Vec<Reference>, usize)],
    writer: &mut dyn Write,
) -> Result<()> {
    for (rank, (references, total)) in counts.iter().enumerate() {
        writeln!(writer, "--------")?;
        writeln!(writer, "Most common reference {}", rank + 1)?;
        writeln!(writer)?;
        for (source, reference) in references.iter().enumerate() {
            writeln!(writer, "Source number:      {}", source + 1)?;
            writeln!(writer, "Title:              {}", text(&reference.title))?;
            writeln!(writer, "Author:             {}", text(&reference.author))?;
            writeln!(writer, "Publisher:          {}", text(&reference.publisher))?;
            writeln!(
                writer,
                "Publisher Location: {}",
                text(&reference.publisher_location)
            )?;
            writeln!(
                writer,
                "Year:               {}",
                reference.year.map(|y| y.to_string()).unwrap_or_default()
            )?;
            writeln!(writer, "Reference Type:     {}", text(&reference.ref_type))?;
            writeln!(writer)?;
        }
        writeln!(writer, "Total Occurrences:  {}", total)?;
        writeln!(writer, "--------")?;
        writeln!(writer)?;
    }
    Ok(())
}

/// `key: value` lines per species, separated by blank lines.
pub fn write_species_report(
    species: &[Value],
    indent: &str,
    writer: &mut dyn Write,
) -> Result<()> {
    for entry in species {
        match entry.as_object() {
            Some(fields) => {
                for (name, value) in fields {
                    writeln!(writer, "{}{}: {}", indent, name, cell_to_string(value))?;
                }
            }
            None => writeln!(writer, "{}{}", indent, cell_to_string(entry))?,
        }
        writeln!(writer)?;
    }
    Ok(())
}

pub fn write_search_summary(response: &SearchResponse, writer: &mut dyn Write) -> Result<()> {
    writeln!(writer, "Results of Search:")?;
    writeln!(writer, "  endOfRecords: {}", optional(response.end_of_records))?;
    writeln!(writer, "  count: {}", optional(response.count))?;
    writeln!(writer, "  offset: {}", optional(response.offset))?;
    writeln!(writer, "  limit: {}", optional(response.limit))?;
    writeln!(writer, "  Species list:")?;
    write_species_report(&response.results, "    ", writer)
}

fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
