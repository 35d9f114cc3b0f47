mod table;

pub use table::{Cell, ColumnType, Table};

use crate::error::QueryError;

/// Columns the search endpoint still emits but no longer fills.
pub const DEPRECATED_COLUMNS: &[&str] = &[
    "spin_dir",
    "spin_rate_deprecated",
    "break_angle_deprecated",
    "break_length_deprecated",
    "tfs_deprecated",
    "tfs_zulu_deprecated",
    "umpire",
    "pitcher_duplicated_0",
    "fielder_2_duplicated_0",
];

/// Pitch-level ordering of search results.
pub const SORT_KEYS: &[&str] = &["game_date", "game_pk", "at_bat_number", "pitch_number"];

/// Rows without this column are partial lines from a broken chunk.
pub const DATE_COLUMN: &str = "game_date";

/// Post-processing applied to cleaned search results.
pub trait TableTransform: Send + Sync {
    /// # Errors
    ///
    /// Will return `Err` if the table cannot be transformed
    fn apply(&self, table: &mut Table) -> Result<(), QueryError>;
}

/// Adds a couple of columns derived from release metrics.
///
/// `bauer_units` is spin rate over release speed; `release_pos_y` is the
/// release point's distance from home plate.
#[derive(Debug, Clone, Copy, Default)]
pub struct DerivedColumns;

const MOUND_TO_PLATE_FEET: f64 = 60.5;

impl TableTransform for DerivedColumns {
    fn apply(&self, table: &mut Table) -> Result<(), QueryError> {
        if let (Some(spin), Some(speed)) = (
            table.column_index("release_spin_rate"),
            table.column_index("release_speed"),
        ) {
            let values = table
                .rows()
                .iter()
                .map(|row| match (row[spin].as_f64(), row[speed].as_f64()) {
                    (Some(spin), Some(speed)) if speed != 0.0 => Cell::Float(spin / speed),
                    _ => Cell::Null,
                })
                .collect();
            table.push_column("bauer_units", ColumnType::Float, values)?;
        } else {
            tracing::warn!("release_spin_rate or release_speed missing; skipping bauer_units");
        }

        if let Some(extension) = table.column_index("release_extension") {
            let values = table
                .rows()
                .iter()
                .map(|row| {
                    row[extension]
                        .as_f64()
                        .map_or(Cell::Null, |ext| Cell::Float(MOUND_TO_PLATE_FEET - ext))
                })
                .collect();
            table.push_column("release_pos_y", ColumnType::Float, values)?;
        } else {
            tracing::warn!("release_extension missing; skipping release_pos_y");
        }
        Ok(())
    }
}

/// Clean concatenated search output.
///
/// Aggregate output is returned as parsed. Pitch-level output loses rows
/// without a game date and the deprecated columns, then is sorted by pitch
/// order and handed to `transform`.
///
/// # Errors
///
/// Will return `Err` if the text is not CSV or the transform fails
pub fn assemble_search(
    text: &str,
    aggregate: bool,
    transform: Option<&dyn TableTransform>,
) -> Result<Table, QueryError> {
    let mut table = Table::parse_csv(text)?;
    if aggregate {
        return Ok(table);
    }
    let dropped = table.drop_nulls(DATE_COLUMN);
    if dropped > 0 {
        tracing::debug!(dropped, "dropped rows without a game date");
    }
    table.drop_columns(DEPRECATED_COLUMNS);
    table.sort_by(SORT_KEYS);
    if let Some(transform) = transform {
        transform.apply(&mut table)?;
    }
    tracing::info!(rows = table.len(), columns = table.columns().len(), "assembled search");
    Ok(table)
}

/// Parse leaderboard output, turning NaN into nulls.
///
/// # Errors
///
/// Will return `Err` if the text is not CSV
pub fn assemble_leaderboard(text: &str) -> Result<Table, QueryError> {
    let mut table = Table::parse_csv(text)?;
    table.nan_to_null();
    Ok(table)
}
