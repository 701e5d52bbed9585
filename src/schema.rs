//! Column-name normalization shared by API and CSV sources.

/// Where a table came from. Each source has its own column aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Api,
    Csv,
}

const API_ALIASES: [(&str, &str); 1] = [("key", "specimennumber")];

const CSV_ALIASES: [(&str, &str); 6] = [
    ("Latitude", "decimallatitude"),
    ("Longitude", "decimallongitude"),
    ("Museum_Cat_No", "museumcatnumber"),
    ("HUC 8 Number", "huc8"),
    ("Source", "latlongsource"),
    ("Accuracy", "latlongaccuracy"),
];

const OCCURRENCE_HEADER: [&str; 35] = [
    "specimennumber",
    "speciesid",
    "group",
    "family",
    "genus",
    "species",
    "scientificname",
    "commonname",
    "country",
    "state",
    "county",
    "locality",
    "decimallatitude",
    "decimallongitude",
    "latlongsource",
    "latlongaccuracy",
    "drainagename",
    "centroidtype",
    "huc8name",
    "huc8",
    "huc10name",
    "huc10",
    "huc12name",
    "huc12",
    "date",
    "year",
    "month",
    "day",
    "status",
    "comments",
    "recordtype",
    "disposal",
    "museumcatnumber",
    "freshmarineintro",
    "references",
];

/// Canonical occurrence columns, in output order.
pub fn occurrence_header() -> &'static [&'static str] {
    &OCCURRENCE_HEADER
}

/// Lower-cases a column name and strips spaces and underscores.
pub fn normalize_column_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != ' ' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Ordered `from -> to` column renames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameMap {
    entries: Vec<(String, String)>,
}

impl RenameMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rename, replacing the target in place if `from` is already mapped.
    pub fn insert(&mut self, from: impl Into<String>, to: impl Into<String>) {
        let from = from.into();
        let to = to.into();
        match self.entries.iter_mut().find(|(f, _)| *f == from) {
            Some(entry) => entry.1 = to,
            None => self.entries.push((from, to)),
        }
    }

    pub fn get(&self, from: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(f, _)| f == from)
            .map(|(_, t)| t.as_str())
    }

    /// Source column whose target is `to`, if any.
    pub fn source_of(&self, to: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, t)| t == to)
            .map(|(f, _)| f.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(f, t)| (f.as_str(), t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<F: Into<String>, T: Into<String>> FromIterator<(F, T)> for RenameMap {
    fn from_iter<I: IntoIterator<Item = (F, T)>>(iter: I) -> Self {
        let mut map = RenameMap::new();
        for (from, to) in iter {
            map.insert(from, to);
        }
        map
    }
}

/// Builds the rename map that brings `columns` onto the canonical schema.
///
/// Every column maps to its normalized form, then the source aliases for
/// columns that are actually present override that default.
pub fn rename_map<S: AsRef<str>>(columns: &[S], kind: SourceKind) -> RenameMap {
    let mut map: RenameMap = columns
        .iter()
        .map(|c| (c.as_ref(), normalize_column_name(c.as_ref())))
        .collect();

    let aliases: &[(&str, &str)] = match kind {
        SourceKind::Api => &API_ALIASES,
        SourceKind::Csv => &CSV_ALIASES,
    };
    for (from, to) in aliases {
        if map.get(from).is_some() {
            map.insert(*from, *to);
        }
    }
    map
}
