//! Occurrence references: the nested list the API returns, and the flat
//! `reference1..location6` column groups of CSV exports.
use crate::error::{CrateError, Result};
use crate::table::Table;
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Number of reference groups in a CSV export row.
pub const REFERENCE_GROUPS: usize = 6;

const GROUP_FIELDS: [&str; 7] = [
    "reference",
    "type",
    "date",
    "author",
    "title",
    "publisher",
    "location",
];

static GROUP_COLUMN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(reference|type|date|author|title|publisher|location)([1-6])$")
        .expect("valid reference group regex")
});

/// One citation attached to an occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    #[serde(deserialize_with = "lenient_key")]
    pub key: i64,
    #[serde(rename = "refType", default, deserialize_with = "lenient_string")]
    pub ref_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub year: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub publisher: Option<String>,
    #[serde(
        rename = "publisherLocation",
        default,
        deserialize_with = "lenient_string"
    )]
    pub publisher_location: Option<String>,
}

/// True for the flat per-group columns (`reference1`, `type1`, ... `location6`).
pub fn is_reference_group_column(name: &str) -> bool {
    GROUP_COLUMN_REGEX.is_match(name)
}

/// All 42 flat group column names, group by group.
#[cfg(test)]
pub fn reference_group_columns() -> Vec<String> {
    (1..=REFERENCE_GROUPS)
        .flat_map(|n| GROUP_FIELDS.iter().map(move |field| format!("{}{}", field, n)))
        .collect()
}

/// Builds the reference list for one row, stopping at the first group
/// without a usable key.
pub fn unpack_row(table: &Table, row: usize) -> Vec<Reference> {
    let mut references = Vec::new();
    for n in 1..=REFERENCE_GROUPS {
        let field = |name: &str| table.cell(row, &format!("{}{}", name, n));
        let Some(key) = field("reference").and_then(value_as_int) else {
            break;
        };
        references.push(Reference {
            key,
            ref_type: field("type").and_then(value_as_string),
            year: field("date").and_then(value_as_int),
            author: field("author").and_then(value_as_string),
            title: field("title").and_then(value_as_string),
            publisher: field("publisher").and_then(value_as_string),
            publisher_location: field("location").and_then(value_as_string),
        });
    }
    references
}

/// `references` cells for every row of a table carrying flat group columns.
pub fn unpack_references(table: &Table) -> Result<Vec<Value>> {
    (0..table.len())
        .map(|row| -> Result<Value> { Ok(serde_json::to_value(unpack_row(table, row))?) })
        .collect()
}

/// Reads a `references` cell back into structured records. Entries that do
/// not decode are skipped with a warning; a cell that is not a list is an error.
pub fn parse_references(value: &Value) -> Result<Vec<Reference>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(s) if s.trim().is_empty() => Ok(Vec::new()),
        Value::String(s) => {
            let entries: Vec<Value> = serde_json::from_str(s)?;
            Ok(decode_entries(&entries))
        }
        Value::Array(entries) => Ok(decode_entries(entries)),
        other => Err(CrateError::ApiResponseFormatError(format!(
            "references cell is not a list: {}",
            other
        ))),
    }
}

fn decode_entries(entries: &[Value]) -> Vec<Reference> {
    entries
        .iter()
        .filter_map(|entry| match Reference::deserialize(entry) {
            Ok(reference) => Some(reference),
            Err(e) => {
                warn!("Skipping unreadable reference {}: {}", entry, e);
                None
            }
        })
        .collect()
}

/// Integer from a number or numeric string; spreadsheet floats like
/// `"1234.0"` are accepted when they have no fractional part.
pub fn value_as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(float_to_int)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(float_to_int))
        }
        _ => None,
    }
}

// `i64::MAX as f64` rounds up to 2^63, which is already out of range.
fn float_to_int(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_key<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    value_as_int(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid reference key: {}", value)))
}

fn lenient_int<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<i64>, D::Error> {
    Ok(value_as_int(&Value::deserialize(deserializer)?))
}

fn lenient_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    Ok(value_as_string(&Value::deserialize(deserializer)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn group_table(rows: Vec<Vec<Value>>, groups: usize) -> Table {
        let columns: Vec<String> = reference_group_columns()
            .into_iter()
            .take(groups * GROUP_FIELDS.len())
            .collect();
        let mut table = Table::new(columns);
        for row in rows {
            table.push_row(row).unwrap();
        }
        table
    }

    fn group(key: Value, title: &str) -> Vec<Value> {
        vec![
            key,
            json!("Journal Article"),
            json!("1998.0"),
            json!("Smith, J."),
            json!(title),
            json!("Fish Press"),
            Value::Null,
        ]
    }

    #[test]
    fn group_columns_are_recognized() {
        let columns = reference_group_columns();
        assert_eq!(columns.len(), 42);
        assert_eq!(columns[0], "reference1");
        assert_eq!(columns[41], "location6");
        assert!(columns.iter().all(|c| is_reference_group_column(c)));
        assert!(!is_reference_group_column("date"));
        assert!(!is_reference_group_column("reference7"));
        assert!(!is_reference_group_column("references"));
    }

    #[test]
    fn unpacks_until_first_missing_key() {
        let mut row = group(json!("12.0"), "First");
        row.extend(group(Value::Null, "Skipped"));
        row.extend(group(json!("14"), "Never read"));
        let table = group_table(vec![row], 3);

        let refs = unpack_row(&table, 0);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].key, 12);
        assert_eq!(refs[0].year, Some(1998));
        assert_eq!(refs[0].title.as_deref(), Some("First"));
        assert_eq!(refs[0].publisher_location, None);
    }

    #[test]
    fn missing_group_columns_end_the_list() {
        let mut row = group(json!("1"), "A");
        row.extend(group(json!("2"), "B"));
        let table = group_table(vec![row], 2);
        let refs = unpack_row(&table, 0);
        assert_eq!(refs.iter().map(|r| r.key).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn non_integer_key_stops() {
        let table = group_table(vec![group(json!("12.5"), "A")], 1);
        assert!(unpack_row(&table, 0).is_empty());
    }

    #[test]
    fn unpacked_cells_use_api_field_names() {
        let table = group_table(vec![group(json!("5"), "T")], 1);
        let cells = unpack_references(&table).unwrap();
        assert_eq!(
            cells[0],
            json!([{
                "key": 5,
                "refType": "Journal Article",
                "year": 1998,
                "author": "Smith, J.",
                "title": "T",
                "publisher": "Fish Press",
                "publisherLocation": null
            }])
        );
    }

    #[test]
    fn parses_api_references() {
        let cell = json!([
            {"key": "33", "refType": "Database", "year": 2004, "author": "USGS",
             "title": "Survey", "publisher": 77, "publisherLocation": "Gainesville, FL"},
            {"key": 34}
        ]);
        let refs = parse_references(&cell).unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].key, 33);
        assert_eq!(refs[0].publisher.as_deref(), Some("77"));
        assert_eq!(refs[1].title, None);

        assert!(parse_references(&Value::Null).unwrap().is_empty());
        let text = Value::String(cell.to_string());
        assert_eq!(parse_references(&text).unwrap(), refs);
        assert!(parse_references(&json!({"key": 1})).is_err());
        assert!(parse_references(&json!("not json")).is_err());
    }

    #[test]
    fn unreadable_entries_are_skipped() {
        let cell = json!([{"title": "no key"}, {"key": 8, "title": "Kept"}, {"key": null}]);
        let refs = parse_references(&cell).unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].key, 8);
        assert!(parse_references(&json!([{"title": "no key"}])).unwrap().is_empty());
    }

    #[test]
    fn int_conversion() {
        assert_eq!(value_as_int(&json!(7)), Some(7));
        assert_eq!(value_as_int(&json!(7.0)), Some(7));
        assert_eq!(value_as_int(&json!(" 2001.0 ")), Some(2001));
        assert_eq!(value_as_int(&json!("n/a")), None);
        assert_eq!(value_as_int(&Value::Null), None);
    }

    #[test]
    fn out_of_range_floats_are_not_ints() {
        assert_eq!(value_as_int(&json!("1e300")), None);
        assert_eq!(value_as_int(&json!(1e300)), None);
        assert_eq!(value_as_int(&json!("-1e19")), None);
        assert_eq!(value_as_int(&json!("9223372036854775808.0")), None);
        assert_eq!(value_as_int(&json!("1e3")), Some(1000));
    }
}
