mod types;
mod validation;

pub use types::{Cli, Command, FileConfig, LeaderboardArgs, LookupArgs, SearchArgs};
pub use validation::{check_readable_file, parse_key_value};

use crate::client::SearchOptions;
use crate::config::Settings;
use crate::controller::lookup::IdSource;
use crate::controller::search::{DATE_FIELD, SEASON_FIELD};
use crate::model::{Param, ParamValue, QueryArgs};
use anyhow::{Context, Result, anyhow};
use std::fs;

/// What `lookup` should print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupTarget {
    Id(String),
    Name(String),
    IdOf {
        name: String,
        source: IdSource,
        start_year: Option<i32>,
    },
    Table,
}

/// Merge command-line flags over the TOML file over built-in defaults.
///
/// # Errors
///
/// Will return `Err` if the config file cannot be read or parsed
pub fn load_config(cli: &Cli) -> Result<Settings> {
    let file_config = match cli.config_toml.as_ref() {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("read config toml {}", path.display()))?;
            toml::from_str::<FileConfig>(&contents)
                .with_context(|| format!("parse config toml {}", path.display()))?
        }
        None => FileConfig::default(),
    };
    Ok(merge_settings(cli, file_config))
}

fn merge_settings(cli: &Cli, file_config: FileConfig) -> Settings {
    let defaults = Settings::default();
    Settings {
        base_url: cli
            .base_url
            .clone()
            .or(file_config.base_url)
            .unwrap_or(defaults.base_url),
        leaderboard_url: cli
            .leaderboard_url
            .clone()
            .or(file_config.leaderboard_url)
            .unwrap_or(defaults.leaderboard_url),
        lookup_url: file_config.lookup_url.unwrap_or(defaults.lookup_url),
        lookup_cache: cli
            .lookup_cache
            .clone()
            .or(file_config.lookup_cache)
            .unwrap_or(defaults.lookup_cache),
        fields_json: cli.fields_json.clone().or(file_config.fields_json),
        stagger_ms: cli
            .stagger_ms
            .or(file_config.stagger_ms)
            .unwrap_or(defaults.stagger_ms),
        timeout_secs: cli
            .timeout_secs
            .or(file_config.timeout_secs)
            .unwrap_or(defaults.timeout_secs),
        show_progress: !cli.no_progress
            && file_config.show_progress.unwrap_or(defaults.show_progress),
        log_level: cli
            .log_level
            .clone()
            .or(file_config.log_level)
            .unwrap_or(defaults.log_level),
    }
}

/// Turn `field=value` pairs into query arguments; values are comma lists.
#[must_use]
pub fn params_to_args(params: &[(String, String)]) -> QueryArgs {
    params
        .iter()
        .fold(QueryArgs::new(), |args, (key, value)| {
            args.with(key, Param::from_csv_list(value))
        })
}

/// Query arguments and options for the `search` subcommand.
#[must_use]
pub fn search_query(args: &SearchArgs) -> (QueryArgs, SearchOptions) {
    let mut query = QueryArgs::new();
    let lists = [
        (SEASON_FIELD, &args.season),
        ("team", &args.team),
        ("game_pk", &args.game_pk),
        ("batters", &args.batters),
        ("pitchers", &args.pitchers),
    ];
    for (field, raw) in lists {
        if let Some(raw) = raw {
            query.set(field, Param::from_csv_list(raw));
        }
    }
    if args.start_date.is_some() || args.end_date.is_some() {
        let bound = |raw: &Option<String>| {
            raw.as_deref()
                .map_or(ParamValue::Null, |value| ParamValue::from(value.trim()))
        };
        query.set(
            DATE_FIELD,
            Param(vec![bound(&args.start_date), bound(&args.end_date)]),
        );
    }
    let query = query.merged(params_to_args(&args.params));
    let options = SearchOptions {
        update_seasons: !args.no_update_seasons,
        aggregate: args.aggregate,
        derived_columns: !args.no_derived_columns,
    };
    (query, options)
}

/// # Errors
///
/// Will return `Err` if none of `--id`, `--name` or `--table` was given
pub fn lookup_target(args: &LookupArgs) -> Result<LookupTarget> {
    if let Some(id) = &args.id {
        return Ok(LookupTarget::Id(id.clone()));
    }
    if let Some(name) = &args.name {
        return Ok(match args.source {
            Some(source) => LookupTarget::IdOf {
                name: name.clone(),
                source,
                start_year: args.start_year,
            },
            None => LookupTarget::Name(name.clone()),
        });
    }
    if args.table {
        return Ok(LookupTarget::Table);
    }
    Err(anyhow!("lookup needs one of --id, --name or --table"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn cli_flags_win_over_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "stagger_ms = 250\nlog_level = \"debug\"\nshow_progress = true").unwrap();
        let path = file.path().to_string_lossy().to_string();
        let cli = Cli::parse_from([
            "rusty-savant",
            "--config-toml",
            &path,
            "--log-level",
            "warn",
            "--no-progress",
            "leaderboard",
            "expected_stats",
        ]);
        let settings = load_config(&cli).unwrap();
        assert_eq!(settings.stagger_ms, 250);
        assert_eq!(settings.log_level, "warn");
        assert!(!settings.show_progress);
        assert_eq!(settings.timeout_secs, Settings::default().timeout_secs);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "lookup_url = \"http://127.0.0.1/people.csv\"\nshow_progress = false"
        )
        .unwrap();
        let path = file.path().to_string_lossy().to_string();
        let cli = Cli::parse_from(["rusty-savant", "--config-toml", &path, "lookup", "--table"]);
        let settings = load_config(&cli).unwrap();
        let defaults = Settings::default();
        assert_eq!(settings.lookup_url, "http://127.0.0.1/people.csv");
        assert!(!settings.show_progress);
        assert_eq!(settings.base_url, defaults.base_url);
        assert_eq!(settings.stagger_ms, defaults.stagger_ms);
        assert_eq!(settings.lookup_cache, defaults.lookup_cache);
    }

    #[test]
    fn search_flags_become_query_args() {
        let cli = Cli::parse_from([
            "rusty-savant",
            "search",
            "--season",
            "2021, 2022",
            "--start-date",
            "2021-04-01",
            "--pitchers",
            "543243",
            "-p",
            "pitch_type=FF,SL",
            "--aggregate",
        ]);
        let Command::Search(search) = cli.command else {
            panic!("expected search");
        };
        let (args, options) = search_query(&search);
        assert!(options.aggregate);
        assert!(options.update_seasons);
        assert_eq!(
            args.get(SEASON_FIELD).unwrap().values(),
            &[ParamValue::from("2021"), ParamValue::from("2022")]
        );
        assert_eq!(
            args.get(DATE_FIELD).unwrap().values(),
            &[ParamValue::from("2021-04-01"), ParamValue::Null]
        );
        assert_eq!(args.get("pitch_type").unwrap().values().len(), 2);
    }

    #[test]
    fn lookup_needs_a_target() {
        let cli = Cli::parse_from(["rusty-savant", "lookup", "--refresh"]);
        let Command::Lookup(lookup) = cli.command else {
            panic!("expected lookup");
        };
        assert!(lookup_target(&lookup).is_err());

        let cli = Cli::parse_from(["rusty-savant", "lookup", "--name", "Mookie Betts"]);
        let Command::Lookup(lookup) = cli.command else {
            panic!("expected lookup");
        };
        assert_eq!(
            lookup_target(&lookup).unwrap(),
            LookupTarget::Name("Mookie Betts".to_string())
        );
    }

    #[test]
    fn lookup_source_selects_single_id() {
        let cli = Cli::parse_from([
            "rusty-savant",
            "lookup",
            "--name",
            "will smith",
            "--source",
            "bbref",
            "--start-year",
            "2019",
        ]);
        let Command::Lookup(lookup) = cli.command else {
            panic!("expected lookup");
        };
        assert_eq!(
            lookup_target(&lookup).unwrap(),
            LookupTarget::IdOf {
                name: "will smith".to_string(),
                source: IdSource::Bbref,
                start_year: Some(2019),
            }
        );
        assert!(Cli::try_parse_from(["rusty-savant", "lookup", "--source", "bbref"]).is_err());
    }

    #[test]
    fn conflicting_lookup_targets_are_rejected() {
        let parsed = Cli::try_parse_from(["rusty-savant", "lookup", "--id", "1", "--table"]);
        assert!(parsed.is_err());
    }
}
