use crate::controller::query::{Query, RequestPlan, RequestPlanner};
use crate::error::QueryError;
use crate::model::season::latest_season;
use crate::model::{Collection, FieldValues, PlayerIndex, QueryArgs};
use std::fmt;
use std::str::FromStr;

/// Subgroups allowed under each group of the swing/take leaderboard.
const SWING_TAKE_GROUPS: &[(&str, &[&str])] = &[
    ("Swing-Take", &["swing", "take"]),
    (
        "Pitch Type",
        &["fastball", "curve", "cutter", "changeup", "slider", "other"],
    ),
    ("Attack Region", &["heart", "shadow", "chase", "waste"]),
    ("Bat-side", &["R", "L"]),
];

/// Leaderboards with named entry points and their usual arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leaderboard {
    ExitVelocity,
    ExpectedStats,
    PercentileRankings,
    SwingTake,
    PitchArsenals,
    PitchArsenalStats,
    HomeRuns,
    SprintSpeed,
    ParkFactors,
    YearToYearChanges,
    PitchTempo,
    PitchMovement,
    ActiveSpin,
    SpinDirectionComparison,
    SpinDirection,
    Oaa,
    OfDirectionalOaa,
    OfCatchProbability,
    OfJump,
    Poptime,
    Framing,
    ArmStrength,
    RunningSplits,
}

impl Leaderboard {
    pub const ALL: [Leaderboard; 23] = [
        Self::ExitVelocity,
        Self::ExpectedStats,
        Self::PercentileRankings,
        Self::SwingTake,
        Self::PitchArsenals,
        Self::PitchArsenalStats,
        Self::HomeRuns,
        Self::SprintSpeed,
        Self::ParkFactors,
        Self::YearToYearChanges,
        Self::PitchTempo,
        Self::PitchMovement,
        Self::ActiveSpin,
        Self::SpinDirectionComparison,
        Self::SpinDirection,
        Self::Oaa,
        Self::OfDirectionalOaa,
        Self::OfCatchProbability,
        Self::OfJump,
        Self::Poptime,
        Self::Framing,
        Self::ArmStrength,
        Self::RunningSplits,
    ];

    /// Collection name in the field registry.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::ExitVelocity => "exit_velocity",
            Self::ExpectedStats => "expected_stats",
            Self::PercentileRankings => "percentile_rankings",
            Self::SwingTake => "swing_take",
            Self::PitchArsenals => "pitch_arsenals",
            Self::PitchArsenalStats => "pitch_arsenal_stats",
            Self::HomeRuns => "home_runs",
            Self::SprintSpeed => "sprint_speed",
            Self::ParkFactors => "park_factors",
            Self::YearToYearChanges => "year_to_year_changes",
            Self::PitchTempo => "pitch_tempo",
            Self::PitchMovement => "pitch_movement",
            Self::ActiveSpin => "active_spin",
            Self::SpinDirectionComparison => "spin_direction_comparison",
            Self::SpinDirection => "spin_direction",
            Self::Oaa => "oaa",
            Self::OfDirectionalOaa => "of_directional_oaa",
            Self::OfCatchProbability => "of_catch_probability",
            Self::OfJump => "of_jump",
            Self::Poptime => "poptime",
            Self::Framing => "framing",
            Self::ArmStrength => "arm_strength",
            Self::RunningSplits => "running_splits",
        }
    }

    #[must_use]
    pub fn defaults(self) -> QueryArgs {
        let season = i64::from(latest_season());
        match self {
            Self::ExitVelocity => QueryArgs::new()
                .with("player_type", "batters")
                .with("minimum_bbe", "qualified"),
            Self::ExpectedStats => QueryArgs::new()
                .with("player_type", "batters")
                .with("season", season)
                .with("minimum_bip", "qualified"),
            Self::PercentileRankings => QueryArgs::new()
                .with("player_type", "batters")
                .with("season", season),
            Self::SwingTake => QueryArgs::new()
                .with("player_type", "batters")
                .with("group", "all")
                .with("min_pitches", "qualified"),
            Self::PitchArsenals => QueryArgs::new()
                .with("season", season)
                .with("metric", "average speed")
                .with("min_pitches", 250_i64),
            Self::PitchArsenalStats => QueryArgs::new()
                .with("player_type", "pitcher")
                .with("season", season)
                .with("min_pa", 10_i64),
            Self::HomeRuns => QueryArgs::new()
                .with("season", season)
                .with("player_type", "batters")
                .with("min_hr", 0_i64),
            Self::SprintSpeed => QueryArgs::new()
                .with("start_season", season)
                .with("end_season", season)
                .with("min_opportunities", 10_i64),
            Self::ParkFactors => QueryArgs::new()
                .with("factor_type", "year")
                .with("season", season)
                .with("condition", "all")
                .with("three_year_rolling", "no")
                .with("stat", "woba"),
            Self::YearToYearChanges => QueryArgs::new()
                .with("player_type", "batters")
                .with("stat_type", "hard hit %")
                .with("year_pair", format!("{}-{season}", season - 1)),
            Self::PitchTempo => QueryArgs::new()
                .with("player_type", "pitcher")
                .with("min_pitches", "qualified")
                .with("start_season", season)
                .with("end_season", season)
                .with("split_seasons", "no")
                .with("with_team_only", 1_i64),
            Self::PitchMovement => QueryArgs::new()
                .with("season", season)
                .with("pitch_type", "FF")
                .with("min_pitches", "qualified"),
            Self::ActiveSpin => QueryArgs::new()
                .with("season", format!("{season} spin based"))
                .with("min_pitches", 50_i64),
            Self::SpinDirectionComparison => QueryArgs::new()
                .with("season", season)
                .with("pitch_types", "FF/CH")
                .with("min_pitches", 100_i64)
                .with("pov", "pitcher"),
            Self::SpinDirection => QueryArgs::new()
                .with("season", season)
                .with("pitch_type", "FF")
                .with("min_pitches", 100_i64)
                .with("pov", "pitcher"),
            Self::Oaa => QueryArgs::new()
                .with("player_type", "fielder")
                .with("min_attempts", "qualified")
                .with("time_range", "year")
                .with("start_season", season)
                .with("end_season", season)
                .with("split_seasons", "no")
                .with("visual", "hide"),
            Self::OfDirectionalOaa => QueryArgs::new()
                .with("min_opportunities", "qualified")
                .with("season", season),
            Self::OfCatchProbability => QueryArgs::new()
                .with("type", "player")
                .with("min_opportunities", "qualified")
                .with("play_type", "all plays")
                .with("season", season),
            Self::OfJump => QueryArgs::new()
                .with("season", season)
                .with("min_attempts", "qualified"),
            Self::Poptime => QueryArgs::new()
                .with("season", season)
                .with("min_attempts_2b", 5_i64)
                .with("min_attempts_3b", 0_i64),
            Self::Framing => QueryArgs::new()
                .with("player_type", "catcher")
                .with("season", season)
                .with("min_pitches", "qualified"),
            Self::ArmStrength => QueryArgs::new()
                .with("season", season)
                .with("min_throws", 100_i64),
            Self::RunningSplits => QueryArgs::new()
                .with("season", season)
                .with("min_opportunities", 5_i64)
                .with("data_type", "raw"),
        }
    }
}

impl fmt::Display for Leaderboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Leaderboard {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|board| board.name() == wanted)
            .ok_or_else(|| {
                let names: Vec<String> = Self::ALL.iter().map(|b| b.name().to_string()).collect();
                QueryError::UnknownCollection {
                    name: s.to_string(),
                    suggestions: crate::error::close_matches(s, &names),
                }
            })
    }
}

/// A single, unsplit leaderboard request. Always asks for CSV output.
pub struct LeaderboardQuery<'r> {
    query: Query<'r>,
}

impl<'r> LeaderboardQuery<'r> {
    /// # Errors
    ///
    /// Will return `Err` on an unknown field, an invalid value, or a
    /// swing/take subgroup that does not belong to the chosen group
    pub fn new(
        collection: &'r Collection,
        players: &'r dyn PlayerIndex,
        args: &QueryArgs,
    ) -> Result<Self, QueryError> {
        let mut query = Query::from_args(collection, players, args)?;
        if collection.name == Leaderboard::SwingTake.name() {
            check_subgroup(&query)?;
        }
        query.set_raw("csv", vec!["true".to_string()]);
        Ok(Self { query })
    }

    #[must_use]
    pub fn query(&self) -> &Query<'r> {
        &self.query
    }
}

impl RequestPlanner for LeaderboardQuery<'_> {
    fn url_path(&self) -> &str {
        self.query.url_path()
    }

    fn plan(&self) -> Result<RequestPlan, QueryError> {
        self.query.plan()
    }
}

fn selected(query: &Query, name: &str) -> String {
    match query.collection().fields.get(name) {
        Some(field) => match field.get_values(query.params()) {
            FieldValues::Single(value) => value,
            _ => String::new(),
        },
        None => String::new(),
    }
}

fn check_subgroup(query: &Query) -> Result<(), QueryError> {
    let group = selected(query, "group");
    let subgroup = selected(query, "subgroup");
    if subgroup.is_empty() {
        return Ok(());
    }
    let valid = SWING_TAKE_GROUPS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(&group))
        .map(|(_, subgroups)| *subgroups)
        .unwrap_or_default();
    if valid.iter().any(|allowed| allowed.eq_ignore_ascii_case(&subgroup)) {
        return Ok(());
    }
    Err(QueryError::InvalidSubgroup {
        group,
        subgroup,
        leaderboard: query.collection().name.clone(),
        valid: valid.iter().map(ToString::to_string).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Registry;
    use std::collections::HashSet;

    fn swing_take<'r>(
        registry: &'r Registry,
        players: &'r HashSet<String>,
        group: &str,
        subgroup: &str,
    ) -> Result<LeaderboardQuery<'r>, QueryError> {
        let args = Leaderboard::SwingTake
            .defaults()
            .with("group", group)
            .with("subgroup", subgroup);
        LeaderboardQuery::new(registry.collection("swing_take")?, players, &args)
    }

    #[test]
    fn matching_subgroup_is_accepted() {
        let registry = Registry::builtin().unwrap();
        let players = HashSet::new();
        let query = swing_take(&registry, &players, "Swing-Take", "swing").unwrap();
        let plan = query.plan().unwrap();
        assert_eq!(plan.requests.len(), 1);
        assert_eq!(plan.requests[0]["csv"], vec!["true".to_string()]);
        assert_eq!(plan.requests[0]["type"], vec!["Swing-Take".to_string()]);
        assert_eq!(query.url_path(), "swing-take");
    }

    #[test]
    fn mismatched_subgroup_is_rejected() {
        let registry = Registry::builtin().unwrap();
        let players = HashSet::new();
        let err = swing_take(&registry, &players, "Swing-Take", "fastball")
            .err()
            .unwrap();
        match err {
            QueryError::InvalidSubgroup { valid, .. } => assert_eq!(valid, vec!["swing", "take"]),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn bat_side_subgroup_ignores_case() {
        let registry = Registry::builtin().unwrap();
        let players = HashSet::new();
        assert!(swing_take(&registry, &players, "bat-side", "left").is_ok());
    }

    #[test]
    fn subgroup_under_all_is_rejected() {
        let registry = Registry::builtin().unwrap();
        let players = HashSet::new();
        assert!(swing_take(&registry, &players, "all", "heart").is_err());
    }

    #[test]
    fn every_named_leaderboard_builds_with_defaults() {
        let registry = Registry::builtin().unwrap();
        let players = HashSet::new();
        for board in Leaderboard::ALL {
            let collection = registry.collection(board.name()).unwrap();
            let query = LeaderboardQuery::new(collection, &players, &board.defaults());
            assert!(query.is_ok(), "{board} failed: {:?}", query.err());
        }
    }

    #[test]
    fn every_registry_leaderboard_has_a_name() {
        let registry = Registry::builtin().unwrap();
        let boards: Vec<&str> = registry.names().filter(|name| *name != "search").collect();
        assert_eq!(boards.len(), Leaderboard::ALL.len());
        for name in boards {
            assert!(name.parse::<Leaderboard>().is_ok(), "{name} has no entry point");
        }
    }

    fn default_params(registry: &Registry, board: Leaderboard) -> crate::model::ParamMap {
        let players: HashSet<String> = HashSet::new();
        let collection = registry.collection(board.name()).unwrap();
        let query = LeaderboardQuery::new(collection, &players, &board.defaults()).unwrap();
        query.plan().unwrap().requests.remove(0)
    }

    #[test]
    fn fielding_and_spin_defaults_encode() {
        let registry = Registry::builtin().unwrap();
        let season = latest_season();

        let params = default_params(&registry, Leaderboard::ActiveSpin);
        assert_eq!(params["year"], vec![format!("{season}_spin-based")]);

        let params = default_params(&registry, Leaderboard::Oaa);
        assert_eq!(params["min"], vec!["q".to_string()]);
        assert_eq!(params["type"], vec!["Fielder".to_string()]);

        let params = default_params(&registry, Leaderboard::YearToYearChanges);
        assert_eq!(params["year"], vec![format!("{}-{season}", season - 1)]);
    }

    #[test]
    fn names_parse_loosely() {
        assert_eq!("Sprint-Speed".parse::<Leaderboard>().unwrap(), Leaderboard::SprintSpeed);
        assert!("sprint".parse::<Leaderboard>().is_err());
        assert_eq!("OF-Jump".parse::<Leaderboard>().unwrap(), Leaderboard::OfJump);
    }
}
