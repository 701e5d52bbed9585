//! Keep/drop column selection.
use crate::error::{CrateError, Result};
use crate::schema::RenameMap;
use crate::table::{Table, is_missing};
use log::info;
use std::collections::BTreeSet;

// Renames applied by `select_complete` to columns of a raw NAS export.
const EXPORT_RENAMES: [(&str, &str); 3] = [
    ("Specimen Number", "key"),
    ("Latitude", "latitude"),
    ("Longitude", "longitude"),
];

/// Columns not listed in `keep`, sorted and without duplicates.
pub fn columns_to_drop<A: AsRef<str>, B: AsRef<str>>(columns: &[A], keep: &[B]) -> Vec<String> {
    let keep: BTreeSet<&str> = keep.iter().map(|k| k.as_ref()).collect();
    columns
        .iter()
        .map(|c| c.as_ref())
        .filter(|c| !keep.contains(c))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Fails on the first keep name that is not one of `columns`.
pub fn validate_keep<A: AsRef<str>, B: AsRef<str>>(columns: &[A], keep: &[B]) -> Result<()> {
    for name in keep {
        let name = name.as_ref();
        if !columns.iter().any(|c| c.as_ref() == name) {
            return Err(CrateError::UnknownColumn(name.to_string()));
        }
    }
    Ok(())
}

/// Drops `drop` and applies `renames`, after checking that every name exists
/// and that no renamed column is also being dropped.
pub fn manage_columns<S: AsRef<str>>(
    mut table: Table,
    drop: &[S],
    renames: &RenameMap,
) -> Result<Table> {
    for name in drop {
        if !table.contains(name.as_ref()) {
            return Err(CrateError::InvalidColumnSelection(format!(
                "can't drop column '{}': it does not exist",
                name.as_ref()
            )));
        }
    }
    for (from, to) in renames.iter() {
        if !table.contains(from) {
            return Err(CrateError::InvalidColumnSelection(format!(
                "can't rename '{}' to '{}': '{}' does not exist",
                from, to, from
            )));
        }
        if drop.iter().any(|d| d.as_ref() == from) {
            return Err(CrateError::InvalidColumnSelection(format!(
                "can't rename '{}' to '{}': '{}' is being dropped",
                from, to, from
            )));
        }
    }
    table.drop_columns(drop)?;
    table.rename_columns(renames);
    Ok(table)
}

/// Keeps the `keep` columns in table order, gives the export's specimen and
/// coordinate columns short names with `key` first, and drops every row that
/// has a missing value.
pub fn select_complete<S: AsRef<str>>(mut table: Table, keep: &[S]) -> Result<Table> {
    validate_keep(table.columns(), keep)?;
    let drop = columns_to_drop(table.columns(), keep);
    table.drop_columns(&drop)?;

    let renames: RenameMap = EXPORT_RENAMES
        .into_iter()
        .filter(|(from, _)| table.contains(from))
        .collect();
    table.rename_columns(&renames);
    table.reorder(&["key"]);

    let before = table.len();
    table.retain_rows(|row| !row.iter().any(is_missing));
    info!(
        "Kept {} of {} rows with every selected value present",
        table.len(),
        before
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn drop_is_sorted_set_difference() {
        let columns = ["zeta", "key", "alpha", "key", "lat"];
        let drop = columns_to_drop(&columns, &["lat", "missing"]);
        assert_eq!(drop, vec!["alpha", "key", "zeta"]);
    }

    #[test]
    fn drop_everything_with_empty_keep() {
        let keep: [&str; 0] = [];
        assert_eq!(columns_to_drop(&["b", "a"], &keep), vec!["a", "b"]);
    }

    #[test]
    fn keep_must_name_known_columns() {
        assert!(validate_keep(&["a", "b"], &["b"]).is_ok());
        let result = validate_keep(&["a", "b"], &["b", "c"]);
        assert!(matches!(result, Err(CrateError::UnknownColumn(c)) if c == "c"));
    }

    fn table() -> Table {
        let mut table = Table::new(["a", "b", "c"]);
        table.push_row(vec![json!(1), json!(2), json!(3)]).unwrap();
        table
    }

    #[test]
    fn manage_drops_then_renames() {
        let renames: RenameMap = [("a", "alpha")].into_iter().collect();
        let table = manage_columns(table(), &["b"], &renames).unwrap();
        assert_eq!(table.columns(), ["alpha", "c"]);
        assert_eq!(table.rows()[0], vec![json!(1), json!(3)]);
    }

    #[test]
    fn select_complete_renames_and_drops_incomplete_rows() {
        let mut table = Table::new(["State", "Specimen Number", "Latitude", "Longitude"]);
        table
            .push_row(vec![json!("FL"), json!("1"), json!("27.1"), json!("-80.2")])
            .unwrap();
        table
            .push_row(vec![json!("FL"), json!("2"), serde_json::Value::Null, json!("-80.3")])
            .unwrap();
        table
            .push_row(vec![serde_json::Value::Null, json!("3"), json!("26.0"), json!("-81.0")])
            .unwrap();

        let keep = ["Latitude", "Specimen Number", "Longitude"];
        let table = select_complete(table, &keep).unwrap();
        assert_eq!(table.columns(), ["key", "latitude", "longitude"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(1, "key"), Some(&json!("3")));

        let bad = select_complete(Table::new(["a"]), &["b"]);
        assert!(matches!(bad, Err(CrateError::UnknownColumn(_))));
    }

    #[test]
    fn select_complete_treats_na_tokens_as_missing() {
        let mut table = Table::new(["Specimen Number", "Latitude", "Longitude"]);
        table.push_row(vec![json!("1"), json!("NA"), json!("-80.1")]).unwrap();
        table.push_row(vec![json!("2"), json!("   "), json!("-80.2")]).unwrap();
        table.push_row(vec![json!("3"), json!("27.0"), json!("-80.3")]).unwrap();

        let keep = ["Specimen Number", "Latitude", "Longitude"];
        let table = select_complete(table, &keep).unwrap();
        let keys: Vec<&serde_json::Value> = table.rows().iter().map(|row| &row[0]).collect();
        assert_eq!(keys, [&json!("2"), &json!("3")]);
    }

    #[test]
    fn manage_rejects_bad_requests() {
        let none = RenameMap::new();
        assert!(matches!(
            manage_columns(table(), &["zzz"], &none),
            Err(CrateError::InvalidColumnSelection(_))
        ));

        let renames: RenameMap = [("zzz", "z")].into_iter().collect();
        let nothing: [&str; 0] = [];
        assert!(manage_columns(table(), &nothing, &renames).is_err());

        let renames: RenameMap = [("b", "beta")].into_iter().collect();
        assert!(manage_columns(table(), &["b"], &renames).is_err());
    }
}
