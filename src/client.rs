use crate::config::Settings;
use crate::controller::assemble::{DerivedColumns, Table, TableTransform, assemble_leaderboard, assemble_search};
use crate::controller::download::{HttpTransport, Transport};
use crate::controller::leaderboard::{Leaderboard, LeaderboardQuery};
use crate::controller::lookup::LookupTable;
use crate::controller::query::RequestPlanner;
use crate::controller::search::{DATE_FIELD, SEASON_FIELD, SearchQuery, default_args};
use crate::error::QueryError;
use crate::model::{Param, ParamValue, PlayerIndex, QueryArgs, Registry};
use chrono::NaiveDate;

/// Registry collection used for pitch-level searches.
pub const SEARCH_COLLECTION: &str = "search";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Rewrite the season field to match explicit dates.
    pub update_seasons: bool,
    /// Ask for grouped rows instead of one row per pitch.
    pub aggregate: bool,
    /// Append the derived release-metric columns.
    pub derived_columns: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            update_seasons: true,
            aggregate: false,
            derived_columns: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub table: Table,
    pub advisories: Vec<String>,
}

/// Entry point for search and leaderboard queries.
pub struct Savant {
    settings: Settings,
    registry: Registry,
    transport: Box<dyn Transport>,
    players: Box<dyn PlayerIndex>,
    today: Option<NaiveDate>,
}

impl Savant {
    #[must_use]
    pub fn new(
        settings: Settings,
        registry: Registry,
        transport: Box<dyn Transport>,
        players: Box<dyn PlayerIndex>,
    ) -> Self {
        Self {
            settings,
            registry,
            transport,
            players,
            today: None,
        }
    }

    /// Build a client from settings: field registry, HTTP transport and the
    /// cached player register.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the registry, transport or lookup table cannot be set up
    pub async fn connect(settings: Settings) -> Result<Self, QueryError> {
        let registry = match &settings.fields_json {
            Some(path) => Registry::from_path(path)?,
            None => Registry::builtin()?,
        };
        let transport = HttpTransport::new(&settings)?;
        let players = LookupTable::load(&settings, false).await?;
        Ok(Self::new(
            settings,
            registry,
            Box::new(transport),
            Box::new(players),
        ))
    }

    /// Pin the date used for "today" advisories.
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Generic pitch-level search over any fields of the search collection.
    ///
    /// # Errors
    ///
    /// Will return `Err` if validation, a request or parsing fails
    pub async fn search(
        &self,
        args: QueryArgs,
        options: SearchOptions,
    ) -> Result<SearchResult, QueryError> {
        let args = default_args(options.aggregate).merged(args);
        let collection = self.registry.collection(SEARCH_COLLECTION)?;
        let mut query = SearchQuery::new(collection, self.players.as_ref(), &args)?;
        if options.update_seasons {
            query.update_seasons()?;
        }
        let plan = match self.today {
            Some(today) => query.plan_at(today)?,
            None => query.plan()?,
        };
        let url = join_url(&self.settings.base_url, query.url_path());
        let text = self.transport.execute(&url, &plan.requests).await?;

        let derived = DerivedColumns;
        let transform = options
            .derived_columns
            .then_some(&derived as &dyn TableTransform);
        let table = assemble_search(&text, options.aggregate, transform)?;
        Ok(SearchResult {
            table,
            advisories: plan.advisories,
        })
    }

    /// Every pitch of one or more seasons.
    ///
    /// # Errors
    ///
    /// Will return `Err` if validation, a request or parsing fails
    pub async fn season(
        &self,
        years: impl Into<Param>,
        args: QueryArgs,
        options: SearchOptions,
    ) -> Result<SearchResult, QueryError> {
        let args = QueryArgs::new().with(SEASON_FIELD, years).merged(args);
        self.search(args, options).await
    }

    /// Every pitch between two dates; a missing end means a single day.
    ///
    /// # Errors
    ///
    /// Will return `Err` if validation, a request or parsing fails
    pub async fn dates(
        &self,
        start: impl Into<ParamValue>,
        end: impl Into<ParamValue>,
        args: QueryArgs,
        options: SearchOptions,
    ) -> Result<SearchResult, QueryError> {
        let start = start.into();
        let end = end.into();
        let end = if end.is_blank() { start.clone() } else { end };
        let args = QueryArgs::new()
            .with(DATE_FIELD, vec![start, end])
            .merged(args);
        self.search(args, options).await
    }

    /// Every pitch of a single game.
    ///
    /// # Errors
    ///
    /// Will return `Err` if validation, a request or parsing fails
    pub async fn game(
        &self,
        game_pk: impl Into<Param>,
        args: QueryArgs,
        options: SearchOptions,
    ) -> Result<SearchResult, QueryError> {
        let args = QueryArgs::new()
            .with("game_pk", game_pk)
            .with(SEASON_FIELD, "all years")
            .merged(args);
        let options = SearchOptions {
            update_seasons: false,
            ..options
        };
        self.search(args, options).await
    }

    /// Pitches thrown by the given pitchers.
    ///
    /// # Errors
    ///
    /// Will return `Err` if validation, a request or parsing fails
    pub async fn pitcher(
        &self,
        pitchers: impl Into<Param>,
        start: impl Into<ParamValue>,
        end: impl Into<ParamValue>,
        args: QueryArgs,
        options: SearchOptions,
    ) -> Result<SearchResult, QueryError> {
        let args = QueryArgs::new()
            .with("player_type", "pitcher")
            .with("pitchers", pitchers)
            .with(DATE_FIELD, Param(vec![start.into(), end.into()]))
            .merged(args);
        self.search(args, options).await
    }

    /// Pitches seen by the given batters.
    ///
    /// # Errors
    ///
    /// Will return `Err` if validation, a request or parsing fails
    pub async fn batter(
        &self,
        batters: impl Into<Param>,
        start: impl Into<ParamValue>,
        end: impl Into<ParamValue>,
        args: QueryArgs,
        options: SearchOptions,
    ) -> Result<SearchResult, QueryError> {
        let args = QueryArgs::new()
            .with("player_type", "batter")
            .with("batters", batters)
            .with(DATE_FIELD, Param(vec![start.into(), end.into()]))
            .merged(args);
        self.search(args, options).await
    }

    /// Pitches between the given pitchers and batters.
    ///
    /// # Errors
    ///
    /// Will return `Err` if validation, a request or parsing fails
    pub async fn matchup(
        &self,
        pitchers: impl Into<Param>,
        batters: impl Into<Param>,
        start: impl Into<ParamValue>,
        end: impl Into<ParamValue>,
        args: QueryArgs,
        options: SearchOptions,
    ) -> Result<SearchResult, QueryError> {
        let args = QueryArgs::new()
            .with("pitchers", pitchers)
            .with("batters", batters)
            .with(DATE_FIELD, Param(vec![start.into(), end.into()]))
            .merged(args);
        self.search(args, options).await
    }

    /// Pitches in games played by the given teams.
    ///
    /// # Errors
    ///
    /// Will return `Err` if validation, a request or parsing fails
    pub async fn team(
        &self,
        teams: impl Into<Param>,
        start: impl Into<ParamValue>,
        end: impl Into<ParamValue>,
        args: QueryArgs,
        options: SearchOptions,
    ) -> Result<SearchResult, QueryError> {
        let args = QueryArgs::new()
            .with("team", teams)
            .with(DATE_FIELD, Param(vec![start.into(), end.into()]))
            .merged(args);
        self.search(args, options).await
    }

    /// Any leaderboard collection. Named leaderboards start from their usual arguments.
    ///
    /// # Errors
    ///
    /// Will return `Err` if validation, the request or parsing fails
    pub async fn leaderboard(&self, name: &str, args: QueryArgs) -> Result<Table, QueryError> {
        let (name, args) = match name.parse::<Leaderboard>() {
            Ok(board) => (board.name(), board.defaults().merged(args)),
            Err(_) => (name, args),
        };
        let collection = self.registry.collection(name)?;
        let query = LeaderboardQuery::new(collection, self.players.as_ref(), &args)?;
        let plan = query.plan()?;
        let url = join_url(&self.settings.leaderboard_url, query.url_path());
        let text = self.transport.execute(&url, &plan.requests).await?;
        assemble_leaderboard(&text)
    }

    /// # Errors
    ///
    /// Will return `Err` if validation, the request or parsing fails
    pub async fn exit_velocity(&self, args: QueryArgs) -> Result<Table, QueryError> {
        self.leaderboard(Leaderboard::ExitVelocity.name(), args).await
    }

    /// # Errors
    ///
    /// Will return `Err` if validation, the request or parsing fails
    pub async fn expected_stats(&self, args: QueryArgs) -> Result<Table, QueryError> {
        self.leaderboard(Leaderboard::ExpectedStats.name(), args).await
    }

    /// # Errors
    ///
    /// Will return `Err` if validation, the request or parsing fails
    pub async fn percentile_rankings(&self, args: QueryArgs) -> Result<Table, QueryError> {
        self.leaderboard(Leaderboard::PercentileRankings.name(), args)
            .await
    }

    /// # Errors
    ///
    /// Will return `Err` if the subgroup does not belong to the group, or the request fails
    pub async fn swing_take(&self, args: QueryArgs) -> Result<Table, QueryError> {
        self.leaderboard(Leaderboard::SwingTake.name(), args).await
    }

    /// # Errors
    ///
    /// Will return `Err` if validation, the request or parsing fails
    pub async fn pitch_arsenals(&self, args: QueryArgs) -> Result<Table, QueryError> {
        self.leaderboard(Leaderboard::PitchArsenals.name(), args).await
    }

    /// # Errors
    ///
    /// Will return `Err` if validation, the request or parsing fails
    pub async fn pitch_arsenal_stats(&self, args: QueryArgs) -> Result<Table, QueryError> {
        self.leaderboard(Leaderboard::PitchArsenalStats.name(), args)
            .await
    }

    /// # Errors
    ///
    /// Will return `Err` if validation, the request or parsing fails
    pub async fn home_runs(&self, args: QueryArgs) -> Result<Table, QueryError> {
        self.leaderboard(Leaderboard::HomeRuns.name(), args).await
    }

    /// # Errors
    ///
    /// Will return `Err` if validation, the request or parsing fails
    pub async fn sprint_speed(&self, args: QueryArgs) -> Result<Table, QueryError> {
        self.leaderboard(Leaderboard::SprintSpeed.name(), args).await
    }

    /// # Errors
    ///
    /// Will return `Err` if validation, the request or parsing fails
    pub async fn park_factors(&self, args: QueryArgs) -> Result<Table, QueryError> {
        self.leaderboard(Leaderboard::ParkFactors.name(), args).await
    }

    /// Change in one stat between two consecutive seasons.
    ///
    /// # Errors
    ///
    /// Will return `Err` if validation, the request or parsing fails
    pub async fn year_to_year_changes(&self, args: QueryArgs) -> Result<Table, QueryError> {
        self.leaderboard(Leaderboard::YearToYearChanges.name(), args).await
    }

    /// # Errors
    ///
    /// Will return `Err` if validation, the request or parsing fails
    pub async fn pitch_tempo(&self, args: QueryArgs) -> Result<Table, QueryError> {
        self.leaderboard(Leaderboard::PitchTempo.name(), args).await
    }

    /// Movement of one pitch type against the league average.
    ///
    /// # Errors
    ///
    /// Will return `Err` if validation, the request or parsing fails
    pub async fn pitch_movement(&self, args: QueryArgs) -> Result<Table, QueryError> {
        self.leaderboard(Leaderboard::PitchMovement.name(), args).await
    }

    /// Active spin share. The season is given as `"<year> spin based"` or `"<year> observed"`.
    ///
    /// # Errors
    ///
    /// Will return `Err` if validation, the request or parsing fails
    pub async fn active_spin(&self, args: QueryArgs) -> Result<Table, QueryError> {
        self.leaderboard(Leaderboard::ActiveSpin.name(), args).await
    }

    /// # Errors
    ///
    /// Will return `Err` if validation, the request or parsing fails
    pub async fn spin_direction_comparison(&self, args: QueryArgs) -> Result<Table, QueryError> {
        self.leaderboard(Leaderboard::SpinDirectionComparison.name(), args).await
    }

    /// # Errors
    ///
    /// Will return `Err` if validation, the request or parsing fails
    pub async fn spin_direction(&self, args: QueryArgs) -> Result<Table, QueryError> {
        self.leaderboard(Leaderboard::SpinDirection.name(), args).await
    }

    /// Outs above average for fielders or teams.
    ///
    /// # Errors
    ///
    /// Will return `Err` if validation, the request or parsing fails
    pub async fn oaa(&self, args: QueryArgs) -> Result<Table, QueryError> {
        self.leaderboard(Leaderboard::Oaa.name(), args).await
    }

    /// Outfield outs above average split by direction.
    ///
    /// # Errors
    ///
    /// Will return `Err` if validation, the request or parsing fails
    pub async fn of_directional_oaa(&self, args: QueryArgs) -> Result<Table, QueryError> {
        self.leaderboard(Leaderboard::OfDirectionalOaa.name(), args).await
    }

    /// # Errors
    ///
    /// Will return `Err` if validation, the request or parsing fails
    pub async fn of_catch_probability(&self, args: QueryArgs) -> Result<Table, QueryError> {
        self.leaderboard(Leaderboard::OfCatchProbability.name(), args).await
    }

    /// # Errors
    ///
    /// Will return `Err` if validation, the request or parsing fails
    pub async fn of_jump(&self, args: QueryArgs) -> Result<Table, QueryError> {
        self.leaderboard(Leaderboard::OfJump.name(), args).await
    }

    /// Catcher pop time to second and third base.
    ///
    /// # Errors
    ///
    /// Will return `Err` if validation, the request or parsing fails
    pub async fn poptime(&self, args: QueryArgs) -> Result<Table, QueryError> {
        self.leaderboard(Leaderboard::Poptime.name(), args).await
    }

    /// # Errors
    ///
    /// Will return `Err` if validation, the request or parsing fails
    pub async fn framing(&self, args: QueryArgs) -> Result<Table, QueryError> {
        self.leaderboard(Leaderboard::Framing.name(), args).await
    }

    /// # Errors
    ///
    /// Will return `Err` if validation, the request or parsing fails
    pub async fn arm_strength(&self, args: QueryArgs) -> Result<Table, QueryError> {
        self.leaderboard(Leaderboard::ArmStrength.name(), args).await
    }

    /// Split times over each five-foot segment to first base.
    ///
    /// # Errors
    ///
    /// Will return `Err` if validation, the request or parsing fails
    pub async fn running_splits(&self, args: QueryArgs) -> Result<Table, QueryError> {
        self.leaderboard(Leaderboard::RunningSplits.name(), args).await
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_handles_slashes() {
        assert_eq!(
            join_url("https://baseballsavant.mlb.com/", "/statcast_search/csv"),
            "https://baseballsavant.mlb.com/statcast_search/csv"
        );
        assert_eq!(
            join_url("https://baseballsavant.mlb.com/leaderboard", "swing-take"),
            "https://baseballsavant.mlb.com/leaderboard/swing-take"
        );
    }

    #[test]
    fn default_options_match_usual_search() {
        let options = SearchOptions::default();
        assert!(options.update_seasons);
        assert!(!options.aggregate);
    }
}
