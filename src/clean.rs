//! Column cleanup for exported tables: keep/drop selection, renames, the
//! `system:index` year relabelling and per-target splits.
use crate::error::{CrateError, Result};
use crate::filter::{columns_to_drop, manage_columns};
use crate::schema::RenameMap;
use crate::table::{Table, cell_to_string};
use log::{debug, info};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

pub const YEAR_INDEX_COLUMN: &str = "system:index";
const YEAR_INDEX_WIDTH: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanOptions {
    pub drop_columns: Vec<String>,
    pub keep_columns: Vec<String>,
    pub split_columns: Vec<String>,
    pub rename_columns: RenameMap,
    pub rename_year: bool,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            drop_columns: Vec::new(),
            keep_columns: Vec::new(),
            split_columns: Vec::new(),
            rename_columns: RenameMap::new(),
            rename_year: true,
        }
    }
}

/// Years assigned, in order, to the distinct `system:index` prefixes.
pub fn index_years() -> Vec<i64> {
    (2002..=2013).chain(2015..=2016).collect()
}

/// Parses `OLD=NEW` pairs into a rename map.
pub fn parse_renames<S: AsRef<str>>(pairs: &[S]) -> Result<RenameMap> {
    let mut renames = RenameMap::new();
    for pair in pairs {
        let pair = pair.as_ref();
        match pair.split_once('=') {
            Some((from, to)) if !from.trim().is_empty() && !to.trim().is_empty() => {
                renames.insert(from.trim(), to.trim())
            }
            _ => return Err(CrateError::InvalidRename(pair.to_string())),
        }
    }
    Ok(renames)
}

/// Replaces `system:index` values by the year of their 10-character prefix.
/// Prefixes past the last known year keep their truncated text.
pub fn rename_years(table: &mut Table) -> Result<()> {
    if !table.contains(YEAR_INDEX_COLUMN) {
        return Ok(());
    }
    let years = index_years();
    let mut assigned: HashMap<String, i64> = HashMap::new();
    for cell in table.column_mut(YEAR_INDEX_COLUMN)? {
        let prefix: String = cell_to_string(cell).chars().take(YEAR_INDEX_WIDTH).collect();
        let next = assigned.len();
        let year = match assigned.get(&prefix).copied() {
            Some(year) => Some(year),
            None if next < years.len() => {
                assigned.insert(prefix.clone(), years[next]);
                Some(years[next])
            }
            None => None,
        };
        *cell = match year {
            Some(year) => Value::from(year),
            None => Value::String(prefix),
        };
    }
    debug!("Relabelled {} distinct index prefixes", assigned.len());
    Ok(())
}

/// Cleans `table` and returns the output file names with their tables.
pub fn clean_table(
    mut table: Table,
    stem: &str,
    options: &CleanOptions,
) -> Result<Vec<(String, Table)>> {
    let mut drop_list = resolve_drop_list(&table, options)?;

    // Keeping a column by its new name keeps its source.
    for kept in &options.keep_columns {
        if let Some(source) = options.rename_columns.source_of(kept) {
            drop_list.retain(|c| c != source);
        }
    }

    if options.rename_year {
        rename_years(&mut table)?;
    }

    let table = manage_columns(table, &drop_list, &options.rename_columns)?;
    info!(
        "Cleaned table has {} columns after dropping {}",
        table.columns().len(),
        drop_list.len()
    );

    if options.split_columns.is_empty() {
        return Ok(vec![(format!("{}_clean.csv", stem), table)]);
    }

    let mut resolved = Vec::with_capacity(options.split_columns.len());
    for column in &options.split_columns {
        let name = if table.contains(column) {
            column.clone()
        } else {
            match options.rename_columns.get(column) {
                Some(to) if table.contains(to) => to.to_string(),
                _ => {
                    return Err(CrateError::InvalidColumnSelection(format!(
                        "can't split by column '{}': it does not exist",
                        column
                    )));
                }
            }
        };
        resolved.push((column, name));
    }

    let mut outputs = Vec::with_capacity(resolved.len());
    for (label, name) in &resolved {
        let others: Vec<&str> = resolved
            .iter()
            .map(|(_, n)| n.as_str())
            .filter(|n| n != name)
            .collect();
        let mut part = table.clone();
        part.drop_columns(&others)?;
        outputs.push((format!("{}_{}.csv", stem, label), part));
    }
    Ok(outputs)
}

fn resolve_drop_list(table: &Table, options: &CleanOptions) -> Result<Vec<String>> {
    let drop = &options.drop_columns;
    let keep = &options.keep_columns;
    match (drop.is_empty(), keep.is_empty()) {
        (false, false) => {
            let all: BTreeSet<&str> = table.columns().iter().map(String::as_str).collect();
            let drop_set: BTreeSet<&str> = drop.iter().map(String::as_str).collect();
            // A keep name may be the new name of a renamed column.
            let keep_set: BTreeSet<&str> = keep
                .iter()
                .map(|name| match options.rename_columns.source_of(name) {
                    Some(source) if !table.contains(name) => source,
                    _ => name.as_str(),
                })
                .collect();
            let union: BTreeSet<&str> = drop_set.union(&keep_set).copied().collect();
            if union != all || !drop_set.is_disjoint(&keep_set) {
                return Err(CrateError::InvalidColumnSelection(
                    "drop and keep lists do not combine to make the set of all columns"
                        .to_string(),
                ));
            }
            Ok(drop.clone())
        }
        (false, true) => Ok(drop.clone()),
        (true, false) => {
            for name in keep {
                let known = table.contains(name)
                    || options
                        .rename_columns
                        .source_of(name)
                        .is_some_and(|source| table.contains(source));
                if !known {
                    return Err(CrateError::UnknownColumn(name.clone()));
                }
            }
            Ok(columns_to_drop(table.columns(), keep))
        }
        (true, true) => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn habitat_table() -> Table {
        let mut table = Table::new(["system:index", "weightedPWCT", "weightedPRBT", "Cloud", "huc12"]);
        for (index, wct, rbt) in [
            ("2002_01_01_0000000000000000002a", 0.4, 0.1),
            ("2002_01_01_0000000000000000002b", 0.5, 0.2),
            ("2003_01_01_00000000000000000001", 0.6, 0.3),
        ] {
            table
                .push_row(vec![json!(index), json!(wct), json!(rbt), json!(3), json!("1701")])
                .unwrap();
        }
        table
    }

    #[test]
    fn years_follow_first_seen_prefixes() {
        let mut table = habitat_table();
        rename_years(&mut table).unwrap();
        let years: Vec<&Value> = (0..3).map(|r| table.cell(r, YEAR_INDEX_COLUMN).unwrap()).collect();
        assert_eq!(years, vec![&json!(2002), &json!(2002), &json!(2003)]);
    }

    #[test]
    fn years_skip_2014_and_run_out() {
        assert_eq!(index_years().len(), 14);
        assert!(!index_years().contains(&2014));

        let mut table = Table::new([YEAR_INDEX_COLUMN]);
        for i in 0..15 {
            table.push_row(vec![json!(format!("prefix{:04}xyz", i))]).unwrap();
        }
        rename_years(&mut table).unwrap();
        assert_eq!(table.cell(12, YEAR_INDEX_COLUMN), Some(&json!(2015)));
        assert_eq!(table.cell(13, YEAR_INDEX_COLUMN), Some(&json!(2016)));
        assert_eq!(table.cell(14, YEAR_INDEX_COLUMN), Some(&json!("prefix0014")));
    }

    #[test]
    fn keep_only_with_rename() {
        let options = CleanOptions {
            keep_columns: strings(&["year", "weightedPWCT"]),
            rename_columns: parse_renames(&["system:index=year"]).unwrap(),
            ..CleanOptions::default()
        };
        let outputs = clean_table(habitat_table(), "habitat", &options).unwrap();
        assert_eq!(outputs.len(), 1);
        let (name, table) = &outputs[0];
        assert_eq!(name, "habitat_clean.csv");
        assert_eq!(table.columns(), ["year", "weightedPWCT"]);
        assert_eq!(table.cell(2, "year"), Some(&json!(2003)));
    }

    #[test]
    fn drop_and_keep_must_cover_all_columns() {
        let options = CleanOptions {
            drop_columns: strings(&["Cloud"]),
            keep_columns: strings(&["huc12"]),
            rename_year: false,
            ..CleanOptions::default()
        };
        let result = clean_table(habitat_table(), "h", &options);
        assert!(matches!(result, Err(CrateError::InvalidColumnSelection(_))));

        let options = CleanOptions {
            drop_columns: strings(&["Cloud", "huc12"]),
            keep_columns: strings(&["system:index", "weightedPWCT", "weightedPRBT"]),
            rename_year: false,
            ..CleanOptions::default()
        };
        let outputs = clean_table(habitat_table(), "h", &options).unwrap();
        assert_eq!(
            outputs[0].1.columns(),
            ["system:index", "weightedPWCT", "weightedPRBT"]
        );
        assert_eq!(
            outputs[0].1.cell(0, YEAR_INDEX_COLUMN),
            Some(&json!("2002_01_01_0000000000000000002a"))
        );
    }

    #[test]
    fn drop_and_keep_accept_renamed_keep_names() {
        let options = CleanOptions {
            drop_columns: strings(&["Cloud", "huc12"]),
            keep_columns: strings(&["year", "weightedPWCT", "weightedPRBT"]),
            rename_columns: parse_renames(&["system:index=year"]).unwrap(),
            ..CleanOptions::default()
        };
        let outputs = clean_table(habitat_table(), "h", &options).unwrap();
        assert_eq!(
            outputs[0].1.columns(),
            ["year", "weightedPWCT", "weightedPRBT"]
        );
        assert_eq!(outputs[0].1.cell(0, "year"), Some(&json!(2002)));
    }

    #[test]
    fn split_writes_one_table_per_target() {
        let options = CleanOptions {
            drop_columns: strings(&["Cloud", "huc12"]),
            split_columns: strings(&["weightedPWCT", "rbt"]),
            rename_columns: parse_renames(&["weightedPRBT=rbt"]).unwrap(),
            ..CleanOptions::default()
        };
        let outputs = clean_table(habitat_table(), "trout", &options).unwrap();
        let names: Vec<&str> = outputs.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["trout_weightedPWCT.csv", "trout_rbt.csv"]);
        assert_eq!(outputs[0].1.columns(), ["system:index", "weightedPWCT"]);
        assert_eq!(outputs[1].1.columns(), ["system:index", "rbt"]);
    }

    #[test]
    fn split_by_original_name() {
        let options = CleanOptions {
            split_columns: strings(&["weightedPRBT"]),
            rename_columns: parse_renames(&["weightedPRBT=rbt"]).unwrap(),
            ..CleanOptions::default()
        };
        let outputs = clean_table(habitat_table(), "t", &options).unwrap();
        assert_eq!(outputs[0].0, "t_weightedPRBT.csv");
        assert!(outputs[0].1.contains("rbt"));
    }

    #[test]
    fn unknown_split_or_keep_fails() {
        let options = CleanOptions {
            split_columns: strings(&["nope"]),
            ..CleanOptions::default()
        };
        assert!(clean_table(habitat_table(), "t", &options).is_err());

        let options = CleanOptions {
            keep_columns: strings(&["nope"]),
            ..CleanOptions::default()
        };
        assert!(matches!(
            clean_table(habitat_table(), "t", &options),
            Err(CrateError::UnknownColumn(_))
        ));
    }

    #[test]
    fn rename_parsing() {
        let renames = parse_renames(&["a=b", " c = d "]).unwrap();
        assert_eq!(renames.get("c"), Some("d"));
        assert!(matches!(
            parse_renames(&["novalue="]),
            Err(CrateError::InvalidRename(_))
        ));
        assert!(parse_renames(&["plain"]).is_err());
    }
}
