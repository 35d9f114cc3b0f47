use crate::controller::lookup::IdSource;
use std::fs;
use std::path::PathBuf;

/// # Errors
///
/// Will return `Err` if the file is not readable
pub fn check_readable_file(file: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(file);
    if !path.is_file() || fs::metadata(&path).is_err() {
        return Err(format!("The file '{file}' is not readable."));
    }
    Ok(path)
}

/// Split `field=value` into its parts.
///
/// # Errors
///
/// Will return `Err` if there is no `=` or the field name is empty
pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing field name in '{raw}'"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// # Errors
///
/// Will return `Err` if `raw` is not one of mlbam, fangraphs, bbref or retro
pub fn parse_id_source(raw: &str) -> Result<IdSource, String> {
    raw.parse::<IdSource>().map_err(|e| e.to_string())
}
