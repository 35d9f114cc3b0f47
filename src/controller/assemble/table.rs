use crate::error::QueryError;
use ahash::RandomState;
use chrono::NaiveDate;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::LazyLock;

/// Rows inspected when inferring column types.
const SAMPLE_ROWS: usize = 1_000;

static ISO_DATE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").ok());

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Date(NaiveDate),
    Text(String),
}

impl Cell {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Self::Int(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Int(_) | Self::Float(_) => 1,
            Self::Date(_) => 2,
            Self::Text(_) => 3,
        }
    }

    /// Total order used for sorting: nulls first, then numbers, dates and text.
    #[must_use]
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (a, b) if a.rank() == 1 && b.rank() == 1 => {
                let (a, b) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
                a.total_cmp(&b)
            }
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Date(value) => write!(f, "{}", value.format("%Y-%m-%d")),
            Self::Text(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    Float,
    Date,
    Text,
}

impl ColumnType {
    fn infer<'a>(samples: impl Iterator<Item = &'a str>) -> Self {
        let mut candidate = Self::Int;
        let mut seen = false;
        for raw in samples.filter(|raw| !is_missing(raw)) {
            seen = true;
            while !candidate.accepts(raw) {
                candidate = match candidate {
                    Self::Int => Self::Float,
                    Self::Float => Self::Date,
                    Self::Date | Self::Text => Self::Text,
                };
                if candidate == Self::Text {
                    return candidate;
                }
            }
        }
        if seen { candidate } else { Self::Text }
    }

    fn accepts(self, raw: &str) -> bool {
        match self {
            Self::Int => raw.parse::<i64>().is_ok(),
            Self::Float => raw.parse::<f64>().is_ok(),
            Self::Date => ISO_DATE.as_ref().is_some_and(|re| re.is_match(raw)),
            Self::Text => true,
        }
    }

    fn parse(self, raw: &str) -> Cell {
        if is_missing(raw) {
            return Cell::Null;
        }
        match self {
            Self::Int => raw.parse().map_or(Cell::Null, Cell::Int),
            Self::Float => raw.parse().map_or(Cell::Null, Cell::Float),
            Self::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_or(Cell::Null, Cell::Date),
            Self::Text => Cell::Text(raw.to_string()),
        }
    }
}

fn is_missing(raw: &str) -> bool {
    raw.is_empty() || raw.eq_ignore_ascii_case("null")
}

fn strip_bom(raw: &str) -> &str {
    raw.trim_start_matches('\u{feff}')
}

/// Rows of typed cells under named columns.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<String>,
    types: Vec<ColumnType>,
    rows: Vec<Vec<Cell>>,
    index: HashMap<String, usize, RandomState>,
}

impl Table {
    /// # Errors
    ///
    /// Will return `Err` if `columns` and `types` differ in length or a row has the wrong width
    pub fn new(
        columns: Vec<String>,
        types: Vec<ColumnType>,
        rows: Vec<Vec<Cell>>,
    ) -> Result<Self, QueryError> {
        if columns.len() != types.len() || rows.iter().any(|row| row.len() != columns.len()) {
            return Err(QueryError::Parse(
                "row width does not match the column count".to_string(),
            ));
        }
        let mut table = Self {
            columns,
            types,
            rows,
            index: HashMap::default(),
        };
        table.reindex();
        Ok(table)
    }

    /// Parse CSV text, possibly several responses glued together.
    ///
    /// Repeated header lines are dropped. Cells that do not fit their
    /// column's inferred type become `Null`.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the text is not readable as CSV
    pub fn parse_csv(text: &str) -> Result<Self, QueryError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(true)
            .from_reader(strip_bom(text).as_bytes());

        let header: Vec<String> = reader
            .headers()?
            .iter()
            .map(|name| strip_bom(name).trim().to_string())
            .collect();
        if header.is_empty() || header.iter().all(String::is_empty) {
            return Ok(Self::default());
        }
        let width = header.len();

        let mut raw_rows: Vec<Vec<String>> = Vec::new();
        let mut repeated_headers = 0;
        for record in reader.records() {
            let record = record?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            let is_header = record.len() == width
                && record
                    .iter()
                    .zip(&header)
                    .all(|(cell, name)| strip_bom(cell).trim() == name.as_str());
            if is_header {
                repeated_headers += 1;
                continue;
            }
            let mut row: Vec<String> = record.iter().take(width).map(ToString::to_string).collect();
            row.resize(width, String::new());
            raw_rows.push(row);
        }
        if repeated_headers > 0 {
            tracing::debug!(repeated_headers, "dropped repeated header rows");
        }

        let types: Vec<ColumnType> = (0..width)
            .map(|col| {
                ColumnType::infer(raw_rows.iter().take(SAMPLE_ROWS).map(|row| row[col].as_str()))
            })
            .collect();
        let rows = raw_rows
            .into_iter()
            .map(|row| {
                row.iter()
                    .zip(&types)
                    .map(|(raw, ty)| ty.parse(raw))
                    .collect()
            })
            .collect();

        Self::new(dedupe_names(header), types, rows)
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn column_types(&self) -> &[ColumnType] {
        &self.types
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    #[must_use]
    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.column_index(name).map(|idx| self.types[idx])
    }

    #[must_use]
    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|cells| &cells[idx])
    }

    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Cell>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Remove the named columns; names not present are ignored.
    pub fn drop_columns(&mut self, names: &[&str]) {
        let keep: Vec<bool> = self
            .columns
            .iter()
            .map(|column| !names.contains(&column.as_str()))
            .collect();
        if keep.iter().all(|k| *k) {
            return;
        }
        retain_flagged(&mut self.columns, &keep);
        retain_flagged(&mut self.types, &keep);
        for row in &mut self.rows {
            retain_flagged(row, &keep);
        }
        self.reindex();
    }

    /// Remove rows whose `column` is null. Returns how many were removed.
    pub fn drop_nulls(&mut self, column: &str) -> usize {
        let Some(idx) = self.column_index(column) else {
            return 0;
        };
        let before = self.rows.len();
        self.rows.retain(|row| !row[idx].is_null());
        before - self.rows.len()
    }

    /// Stable ascending sort on the given keys. Keys the table lacks are skipped.
    pub fn sort_by(&mut self, keys: &[&str]) {
        let indices: Vec<usize> = keys
            .iter()
            .filter_map(|key| self.column_index(key))
            .collect();
        if indices.is_empty() {
            return;
        }
        self.rows.sort_by(|a, b| {
            indices
                .iter()
                .map(|&idx| a[idx].sort_cmp(&b[idx]))
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        });
    }

    /// Append a column, replacing any existing column of the same name.
    ///
    /// # Errors
    ///
    /// Will return `Err` if `values` does not have one cell per row
    pub fn push_column(
        &mut self,
        name: &str,
        ty: ColumnType,
        values: Vec<Cell>,
    ) -> Result<(), QueryError> {
        if values.len() != self.rows.len() {
            return Err(QueryError::Parse(format!(
                "column '{name}' has {} values for {} rows",
                values.len(),
                self.rows.len()
            )));
        }
        self.drop_columns(&[name]);
        self.columns.push(name.to_string());
        self.types.push(ty);
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        self.reindex();
        Ok(())
    }

    /// Replace NaN floats with `Null`.
    pub fn nan_to_null(&mut self) {
        for cell in self.rows.iter_mut().flatten() {
            if matches!(cell, Cell::Float(value) if value.is_nan()) {
                *cell = Cell::Null;
            }
        }
    }

    /// # Errors
    ///
    /// Will return `Err` if writing to `writer` fails
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), QueryError> {
        let mut out = csv::Writer::from_writer(writer);
        out.write_record(&self.columns)?;
        for row in &self.rows {
            out.write_record(row.iter().map(ToString::to_string))?;
        }
        out.flush()?;
        Ok(())
    }

    fn reindex(&mut self) {
        self.index = self
            .columns
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();
    }
}

fn retain_flagged<T>(values: &mut Vec<T>, keep: &[bool]) {
    let mut flags = keep.iter();
    values.retain(|_| flags.next().copied().unwrap_or(true));
}

/// Second and later copies of a column name get `_duplicated_{n}` appended.
fn dedupe_names(names: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize, RandomState> = HashMap::default();
    names
        .into_iter()
        .map(|name| {
            let count = seen.entry(name.clone()).or_insert(0);
            let renamed = if *count == 0 {
                name
            } else {
                format!("{name}_duplicated_{}", *count - 1)
            };
            *count += 1;
            renamed
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_narrowest_type_per_column() {
        let table = Table::parse_csv(
            "game_date,game_pk,release_speed,player_name\n\
             2021-04-01,634642,95.1,\"Cole, Gerrit\"\n\
             2021-04-02,634650,,\"Kershaw, Clayton\"\n",
        )
        .unwrap();
        assert_eq!(
            table.column_types(),
            &[ColumnType::Date, ColumnType::Int, ColumnType::Float, ColumnType::Text]
        );
        assert_eq!(table.get(1, "release_speed"), Some(&Cell::Null));
        assert_eq!(
            table.get(0, "player_name"),
            Some(&Cell::Text("Cole, Gerrit".into()))
        );
    }

    #[test]
    fn glued_chunks_drop_repeated_headers_and_bom() {
        let text = "\u{feff}a,b\n1,x\n\u{feff}a,b\n2,y\n";
        let table = Table::parse_csv(text).unwrap();
        assert_eq!(table.columns(), &["a".to_string(), "b".to_string()]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.column_type("a"), Some(ColumnType::Int));
    }

    #[test]
    fn empty_input_is_an_empty_table() {
        let table = Table::parse_csv("").unwrap();
        assert!(table.is_empty());
        assert!(table.columns().is_empty());
    }

    #[test]
    fn duplicate_names_are_renamed() {
        let table = Table::parse_csv("pitcher,fielder_2,pitcher,fielder_2\n1,2,1,2\n").unwrap();
        assert_eq!(
            table.columns(),
            &[
                "pitcher".to_string(),
                "fielder_2".to_string(),
                "pitcher_duplicated_0".to_string(),
                "fielder_2_duplicated_0".to_string()
            ]
        );
    }

    #[test]
    fn short_rows_are_padded_with_nulls() {
        let table = Table::parse_csv("a,b,c\n1,2\n").unwrap();
        assert_eq!(table.get(0, "c"), Some(&Cell::Null));
    }

    #[test]
    fn sort_puts_nulls_first_and_skips_missing_keys() {
        let mut table = Table::parse_csv("k,v\n2,b\n,a\n1,c\n1,a\n").unwrap();
        table.sort_by(&["k", "missing", "v"]);
        let keys: Vec<String> = table.column("k").unwrap().map(ToString::to_string).collect();
        let values: Vec<String> = table.column("v").unwrap().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["", "1", "1", "2"]);
        assert_eq!(values, vec!["a", "a", "c", "b"]);
    }

    #[test]
    fn drop_and_push_columns() {
        let mut table = Table::parse_csv("a,b,c\n1,2,3\n4,5,6\n").unwrap();
        table.drop_columns(&["b", "zzz"]);
        assert_eq!(table.columns(), &["a".to_string(), "c".to_string()]);
        assert_eq!(table.get(1, "c"), Some(&Cell::Int(6)));
        table
            .push_column("d", ColumnType::Int, vec![Cell::Int(7), Cell::Int(8)])
            .unwrap();
        assert_eq!(table.get(0, "d"), Some(&Cell::Int(7)));
        assert!(table.push_column("e", ColumnType::Int, vec![]).is_err());
    }

    #[test]
    fn nan_becomes_null() {
        let mut table = Table::parse_csv("x\n1.5\nNaN\n").unwrap();
        table.nan_to_null();
        assert_eq!(table.get(1, "x"), Some(&Cell::Null));
    }

    #[test]
    fn writes_csv_back_out() {
        let table = Table::parse_csv("a,b\n1,\"x, y\"\n").unwrap();
        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a,b\n1,\"x, y\"\n");
    }
}
