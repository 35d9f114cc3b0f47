use crate::error::QueryError;
use crate::model::season::{first_season, season_dates};
use chrono::{Datelike, Days, NaiveDate};

/// Average pitches thrown in one game, both teams combined.
pub const PITCHES_PER_GAME: u32 = 325;
/// Games on a typical day of the regular season.
pub const GAMES_PER_DAY: u32 = 15;
pub const GAMES_PER_REGULAR_SEASON: u32 = 2_430;
pub const GAMES_PER_POSTSEASON: u32 = 53;
/// Rows one request aims to stay under.
pub const MAX_ROWS_PER_REQUEST: u32 = 15_000;
/// Rows the service returns at most before truncating silently.
pub const SERVICE_ROW_LIMIT: u32 = 40_000;

pub const ROWS_PER_DAY: f64 = (PITCHES_PER_GAME * GAMES_PER_DAY) as f64;

/// One physical request's date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Set when `start` is the season's opening day.
    pub season_opener: bool,
}

impl DateWindow {
    /// Lower bound as sent on the wire. Opening-day windows start at January 1st
    /// so spring games bucketed under the season year are included.
    #[must_use]
    pub fn start_param(&self) -> String {
        if self.season_opener {
            format!("{}-01-01", self.start.year())
        } else {
            self.start.format("%Y-%m-%d").to_string()
        }
    }

    #[must_use]
    pub fn end_param(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }

    #[must_use]
    pub fn days(&self) -> i64 {
        inclusive_days(self.start, self.end)
    }
}

#[must_use]
pub fn inclusive_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

#[must_use]
pub fn estimate_rows(start: NaiveDate, end: NaiveDate, frequency: f64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let days = inclusive_days(start, end).max(0) as f64;
    ROWS_PER_DAY * days * frequency
}

/// Longest window, in days, expected to stay under the row ceiling.
#[must_use]
pub fn window_days(frequency: f64) -> u64 {
    let days = (f64::from(MAX_ROWS_PER_REQUEST) / (ROWS_PER_DAY * frequency)).floor();
    if days.is_finite() && days >= 1.0 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let days = days as u64;
        days
    } else if days.is_infinite() {
        u64::MAX
    } else {
        1
    }
}

/// Partition `[start, end]` into windows that stay under the row ceiling
/// and never straddle two seasons.
///
/// # Errors
///
/// Will return `Err` if the range must be split and touches a year after the last one in
/// the season table
pub fn split(
    start: NaiveDate,
    end: NaiveDate,
    frequency: f64,
) -> Result<Vec<DateWindow>, QueryError> {
    if start > end {
        return Err(QueryError::InvalidBound {
            lower: start.to_string(),
            upper: end.to_string(),
            field: None,
        });
    }
    let estimated = estimate_rows(start, end, frequency);
    if estimated < f64::from(MAX_ROWS_PER_REQUEST) {
        return Ok(vec![DateWindow {
            start,
            end,
            season_opener: false,
        }]);
    }

    let span = window_days(frequency);
    let mut windows = Vec::new();
    for year in start.year().max(first_season())..=end.year() {
        let season = season_dates(year)?;
        let last = season.end.min(end);
        let mut cursor = season.start.max(start);
        while cursor <= last {
            let window_end = cursor
                .checked_add_days(Days::new(span.saturating_sub(1)))
                .map_or(last, |day| day.min(last));
            windows.push(DateWindow {
                start: cursor,
                end: window_end,
                season_opener: cursor == season.start,
            });
            match window_end.succ_opt() {
                Some(next) => cursor = next,
                None => break,
            }
        }
    }
    if windows.is_empty() {
        tracing::warn!(%start, %end, "date range holds no season days; no requests planned");
    }
    tracing::debug!(
        estimated_rows = estimated,
        window_days = span,
        windows = windows.len(),
        "split date range"
    );
    Ok(windows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn small_range_is_one_literal_window() {
        let windows = split(day(2021, 4, 1), day(2021, 4, 10), 0.01).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].start_param(), "2021-04-01");
        assert_eq!(windows[0].end_param(), "2021-04-10");
    }

    #[test]
    fn small_range_is_not_rewritten_on_opening_day() {
        let windows = split(day(2021, 4, 1), day(2021, 4, 2), 1.0).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].start_param(), "2021-04-01");
    }

    #[test]
    fn window_length_follows_frequency() {
        assert_eq!(window_days(1.0), 3);
        assert_eq!(window_days(0.5), 6);
        assert_eq!(window_days(0.01), 307);
        assert_eq!(window_days(50.0), 1);
    }

    #[test]
    fn three_seasons_split_without_gaps_or_overlaps() {
        let start = day(2019, 3, 20);
        let end = day(2021, 11, 2);
        let windows = split(start, end, 1.0).unwrap();

        for window in &windows {
            assert_eq!(window.start.year(), window.end.year());
            assert!(window.start <= window.end);
            assert!(estimate_rows(window.start, window.end, 1.0) <= f64::from(MAX_ROWS_PER_REQUEST));
        }

        for year in 2019..=2021 {
            let season = season_dates(year).unwrap();
            let mut in_season: Vec<&DateWindow> =
                windows.iter().filter(|w| w.start.year() == year).collect();
            in_season.sort_by_key(|w| w.start);
            assert_eq!(in_season.first().unwrap().start, season.start);
            assert!(in_season.first().unwrap().season_opener);
            assert_eq!(in_season.last().unwrap().end, season.end);
            for pair in in_season.windows(2) {
                assert_eq!(pair[0].end.succ_opt().unwrap(), pair[1].start);
            }
        }
    }

    #[test]
    fn opening_day_window_starts_on_new_years_day() {
        let windows = split(day(2020, 1, 1), day(2020, 12, 31), 1.0).unwrap();
        assert_eq!(windows[0].start, day(2020, 7, 23));
        assert_eq!(windows[0].start_param(), "2020-01-01");
        assert!(windows[1..].iter().all(|w| !w.season_opener));
        assert_eq!(windows.last().unwrap().end, day(2020, 10, 27));
    }

    #[test]
    fn mid_season_start_keeps_literal_date() {
        let windows = split(day(2021, 6, 1), day(2021, 6, 30), 1.0).unwrap();
        assert_eq!(windows[0].start_param(), "2021-06-01");
        assert_eq!(windows.last().unwrap().end, day(2021, 6, 30));
    }

    #[test]
    fn year_after_table_is_an_error_when_splitting() {
        let err = split(day(2029, 4, 1), day(2030, 9, 1), 1.0).unwrap_err();
        assert_eq!(err, QueryError::SeasonOutOfRange(2029));
    }

    #[test]
    fn years_before_first_season_are_skipped() {
        let windows = split(day(2007, 4, 1), day(2008, 9, 1), 1.0).unwrap();
        assert_eq!(windows[0].start, day(2008, 3, 25));
        assert!(windows[0].season_opener);
        assert!(windows.iter().all(|w| w.start.year() == 2008));
    }

    #[test]
    fn off_season_range_has_no_windows() {
        let windows = split(day(2021, 12, 1), day(2022, 1, 31), 1.0).unwrap();
        assert!(windows.is_empty());
    }
}
