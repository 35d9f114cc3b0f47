pub mod splitter;

use crate::controller::query::{Query, RequestPlan, RequestPlanner};
use crate::error::QueryError;
use crate::model::season::{
    self, DATA_AVAILABLE_FROM, FULL_TRACKING_FROM, first_season, latest_season, season_dates,
    threshold,
};
use crate::model::{Collection, FieldValues, Param, PlayerIndex, QueryArgs};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Multi-select field holding the season years.
pub const SEASON_FIELD: &str = "season";
/// Date-range field holding the game dates.
pub const DATE_FIELD: &str = "game_date";

/// Arguments every search starts from.
#[must_use]
pub fn default_args(aggregate: bool) -> QueryArgs {
    QueryArgs::new()
        .with("player_type", "pitcher")
        .with("min_pitches", "0")
        .with("min_results", "0")
        .with("group_by", "player name")
        .with("sort_by", "pitches")
        .with("player_event_sort", "exit velocity")
        .with("sort_order", "desc")
        .with("min_pa", "0")
        .with("season_type", "regular season")
        .with("data_type", if aggregate { "aggregate" } else { "details" })
        .with("get_all", "true")
}

/// A search query that tracks how selective it is and splits itself
/// into date windows small enough for the service to return whole.
pub struct SearchQuery<'r> {
    query: Query<'r>,
    contributions: BTreeMap<String, f64>,
    metric_slots: BTreeMap<String, usize>,
    next_metric_slot: usize,
}

impl<'r> SearchQuery<'r> {
    /// Build the query, then fill in any missing date bound from the season table.
    ///
    /// # Errors
    ///
    /// Will return `Err` on an unknown field, an invalid value, or dates that
    /// cannot be resolved to a valid range
    pub fn new(
        collection: &'r Collection,
        players: &'r dyn PlayerIndex,
        args: &QueryArgs,
    ) -> Result<Self, QueryError> {
        let mut search = Self {
            query: Query::new(collection, players),
            contributions: BTreeMap::new(),
            metric_slots: BTreeMap::new(),
            next_metric_slot: 1,
        };
        for (name, value) in args.iter() {
            search.add(name, value)?;
        }
        search.resolve_dates()?;
        Ok(search)
    }

    /// Add one field. Empty values are skipped so defaults stay in effect.
    ///
    /// # Errors
    ///
    /// Will return `Err` if `name` is unknown or `value` fails validation
    pub fn add(&mut self, name: &str, value: &Param) -> Result<(), QueryError> {
        if value.is_empty() {
            return Ok(());
        }
        let collection = self.query.collection();
        let field = collection.field(name)?;
        let slot = if field.is_metric() {
            match self.metric_slots.get(name) {
                Some(slot) => *slot,
                None => {
                    let slot = self.next_metric_slot;
                    self.next_metric_slot += 1;
                    self.metric_slots.insert(name.to_string(), slot);
                    slot
                }
            }
        } else {
            1
        };
        let params = self.query.encode(field, value, slot)?;
        self.query.merge(params);
        let frequency = field.get_frequency(self.query.params());
        self.contributions.insert(name.to_string(), frequency);
        Ok(())
    }

    /// Rewrite the season field to every year the date range touches.
    /// Years before the first season with data are left out; if none
    /// remain the season field is not touched.
    ///
    /// # Errors
    ///
    /// Will return `Err` if a touched year is not a valid season choice
    pub fn update_seasons(&mut self) -> Result<(), QueryError> {
        let (start, end) = self.dates()?;
        let years = season::years_between(start, end)
            .into_iter()
            .filter(|year| *year >= first_season())
            .collect::<Vec<_>>();
        if years.is_empty() {
            tracing::debug!(%start, %end, "no seasons with data in date range");
            return Ok(());
        }
        tracing::debug!(?years, "updating seasons to match dates");
        self.add(SEASON_FIELD, &Param::from(years))
    }

    /// Product of every field's frequency contribution.
    #[must_use]
    pub fn running_frequency(&self) -> f64 {
        self.contributions.values().product()
    }

    #[must_use]
    pub fn query(&self) -> &Query<'r> {
        &self.query
    }

    /// Selected season years, ascending.
    #[must_use]
    pub fn seasons(&self) -> Vec<i32> {
        let Ok(field) = self.query.collection().field(SEASON_FIELD) else {
            return Vec::new();
        };
        let mut years: Vec<i32> = match field.get_values(self.query.params()) {
            FieldValues::Many(values) => values.iter().filter_map(|v| v.parse().ok()).collect(),
            _ => Vec::new(),
        };
        years.sort_unstable();
        years.dedup();
        years
    }

    /// Resolved start and end dates.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the collection has no date field or a bound is unset
    pub fn dates(&self) -> Result<(NaiveDate, NaiveDate), QueryError> {
        match self.date_values()? {
            (Some(start), Some(end)) => Ok((start, end)),
            _ => Err(QueryError::Config(format!(
                "search query has no resolved '{DATE_FIELD}' range"
            ))),
        }
    }

    /// Plan requests as of `today`, which only affects advisories.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the date range cannot be split
    pub fn plan_at(&self, today: NaiveDate) -> Result<RequestPlan, QueryError> {
        let (start, end) = self.dates()?;
        let frequency = self.running_frequency();
        let windows = splitter::split(start, end, frequency)?;
        let slug = &self.query.collection().field(DATE_FIELD)?.slug;
        let (lower_key, upper_key) = (format!("{slug}_gt"), format!("{slug}_lt"));

        let requests = windows
            .iter()
            .map(|window| {
                let mut params = self.query.params().clone();
                params.insert(lower_key.clone(), vec![window.start_param()]);
                params.insert(upper_key.clone(), vec![window.end_param()]);
                params
            })
            .collect::<Vec<_>>();

        let mut advisories = advisories(start, end, today);
        if requests.is_empty() {
            advisories.push(format!(
                "no regular season or postseason dates fall between {start} and {end}; nothing was requested"
            ));
        }
        for advisory in &advisories {
            tracing::warn!("{advisory}");
        }
        let estimated_rows = splitter::estimate_rows(start, end, frequency);
        tracing::info!(
            requests = requests.len(),
            estimated_rows,
            frequency,
            "planned search"
        );
        Ok(RequestPlan {
            requests,
            advisories,
            estimated_rows: Some(estimated_rows),
        })
    }

    fn date_values(&self) -> Result<(Option<NaiveDate>, Option<NaiveDate>), QueryError> {
        let field = self.query.collection().field(DATE_FIELD)?;
        Ok(match field.get_values(self.query.params()) {
            FieldValues::Dates(start, end) => (start, end),
            _ => (None, None),
        })
    }

    fn resolve_dates(&mut self) -> Result<(), QueryError> {
        let (start, end) = self.date_values()?;
        let seasons = self.seasons();
        let first = seasons.first().copied().unwrap_or_else(latest_season);
        let last = seasons.last().copied().unwrap_or_else(latest_season);

        let start = match start {
            Some(start) => start,
            None => season_dates(first)?.start,
        };
        let end = match end {
            Some(end) => end,
            None => season_dates(last)?.end,
        };
        if start > end {
            return Err(QueryError::InvalidBound {
                lower: start.to_string(),
                upper: end.to_string(),
                field: Some(DATE_FIELD.to_string()),
            });
        }
        self.add(DATE_FIELD, &Param::from(vec![start, end]))
    }
}

impl RequestPlanner for SearchQuery<'_> {
    fn url_path(&self) -> &str {
        self.query.url_path()
    }

    fn plan(&self) -> Result<RequestPlan, QueryError> {
        self.plan_at(chrono::Local::now().date_naive())
    }
}

/// Non-fatal notes about the data a date range will return.
#[must_use]
pub fn advisories(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Vec<String> {
    let mut notes = Vec::new();
    if start < threshold(DATA_AVAILABLE_FROM) {
        notes.push("pitch-level data is only available from the 2008 season onwards".to_string());
    }
    if start < threshold(FULL_TRACKING_FROM) {
        notes.push(
            "exit velocity, batted ball events and spin-derived columns are not available before 2015"
                .to_string(),
        );
    }
    if end >= today {
        notes.push(
            "data is refreshed once a day around 3 am; today's games may be missing or incomplete"
                .to_string(),
        );
    }
    notes
}
