use crate::error::QueryError;
use chrono::{Datelike, NaiveDate};

/// Opening day of the regular season and final day of the postseason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonDates {
    pub year: i32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

// (year, start month, start day, end month, end day)
const SEASON_TABLE: &[(i32, u32, u32, u32, u32)] = &[
    (2008, 3, 25, 10, 27),
    (2009, 4, 5, 11, 4),
    (2010, 4, 4, 11, 1),
    (2011, 3, 31, 10, 28),
    (2012, 3, 28, 10, 28),
    (2013, 3, 31, 10, 30),
    (2014, 3, 22, 10, 29),
    (2015, 4, 5, 11, 1),
    (2016, 4, 3, 11, 2),
    (2017, 4, 2, 11, 1),
    (2018, 3, 29, 10, 28),
    (2019, 3, 20, 10, 30),
    (2020, 7, 23, 10, 27),
    (2021, 4, 1, 11, 2),
    (2022, 4, 7, 11, 5),
    (2023, 3, 30, 11, 1),
    (2024, 3, 20, 10, 30),
    (2025, 3, 18, 11, 1),
    (2026, 3, 26, 11, 1),
];

/// Earliest date the service has pitch-level data for.
pub const DATA_AVAILABLE_FROM: (i32, u32, u32) = (2008, 1, 1);

/// Before this date exit velocity and batted-ball metrics are missing.
pub const FULL_TRACKING_FROM: (i32, u32, u32) = (2015, 1, 1);

/// Look up the boundaries for one season.
///
/// # Errors
///
/// Will return `Err` if the year is not in the season table
pub fn season_dates(year: i32) -> Result<SeasonDates, QueryError> {
    SEASON_TABLE
        .iter()
        .find(|(y, ..)| *y == year)
        .and_then(|&(year, sm, sd, em, ed)| {
            Some(SeasonDates {
                year,
                start: NaiveDate::from_ymd_opt(year, sm, sd)?,
                end: NaiveDate::from_ymd_opt(year, em, ed)?,
            })
        })
        .ok_or(QueryError::SeasonOutOfRange(year))
}

#[must_use]
pub fn first_season() -> i32 {
    SEASON_TABLE.first().map_or(2008, |(year, ..)| *year)
}

#[must_use]
pub fn latest_season() -> i32 {
    SEASON_TABLE.last().map_or(2008, |(year, ..)| *year)
}

#[must_use]
pub fn supported_years() -> Vec<i32> {
    SEASON_TABLE.iter().map(|(year, ..)| *year).collect()
}

/// Every calendar year touched by `[start, end]`.
#[must_use]
pub fn years_between(start: NaiveDate, end: NaiveDate) -> Vec<i32> {
    if start > end {
        return Vec::new();
    }
    (start.year()..=end.year()).collect()
}

pub(crate) fn threshold(date: (i32, u32, u32)) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_and_well_formed() {
        let years = supported_years();
        assert!(years.windows(2).all(|pair| pair[1] == pair[0] + 1));
        for year in years {
            let season = season_dates(year).unwrap();
            assert!(season.start < season.end);
            assert_eq!(season.start.year(), year);
            assert_eq!(season.end.year(), year);
        }
    }

    #[test]
    fn shortened_2020_season() {
        let season = season_dates(2020).unwrap();
        assert_eq!(season.start, NaiveDate::from_ymd_opt(2020, 7, 23).unwrap());
        assert_eq!(season.end, NaiveDate::from_ymd_opt(2020, 10, 27).unwrap());
    }

    #[test]
    fn unknown_year_is_an_error() {
        assert_eq!(season_dates(1999), Err(QueryError::SeasonOutOfRange(1999)));
    }

    #[test]
    fn current_season_is_in_table() {
        let season = season_dates(2026).unwrap();
        assert_eq!(season.start, NaiveDate::from_ymd_opt(2026, 3, 26).unwrap());
        assert!(latest_season() >= 2026);
    }

    #[test]
    fn years_between_crosses_new_year() {
        let start = NaiveDate::from_ymd_opt(2020, 12, 31).unwrap();
        let end = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        assert_eq!(years_between(start, end), vec![2020, 2021]);
        assert!(years_between(end, start).is_empty());
    }
}
