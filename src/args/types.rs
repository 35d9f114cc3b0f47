use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;

use super::validation::{check_readable_file, parse_id_source, parse_key_value};
use crate::controller::lookup::IdSource;

#[derive(Parser, Debug)]
#[command(author, version, about = "Query Statcast pitch data and Savant leaderboards", long_about = None)]
pub struct Cli {
    /// TOML file with settings; command-line flags take precedence.
    #[arg(long, global = true, value_parser = check_readable_file)]
    pub config_toml: Option<PathBuf>,
    #[arg(long, global = true)]
    pub base_url: Option<String>,
    #[arg(long, global = true)]
    pub leaderboard_url: Option<String>,
    /// Tracing filter, e.g. `info` or `rusty_savant=debug`.
    #[arg(long, global = true)]
    pub log_level: Option<String>,
    /// Milliseconds between request submissions.
    #[arg(long, global = true)]
    pub stagger_ms: Option<u64>,
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,
    #[arg(long, global = true)]
    pub no_progress: bool,
    /// Field registry JSON replacing the built-in one.
    #[arg(long, global = true, value_parser = check_readable_file)]
    pub fields_json: Option<PathBuf>,
    #[arg(long, global = true)]
    pub lookup_cache: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Pitch-level search, split into date windows when large.
    Search(SearchArgs),
    /// Download one leaderboard.
    Leaderboard(LeaderboardArgs),
    /// Look players up in the cached register.
    Lookup(LookupArgs),
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Write CSV here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Comma separated seasons, e.g. `2021,2022`.
    #[arg(long)]
    pub season: Option<String>,
    #[arg(long)]
    pub start_date: Option<String>,
    #[arg(long)]
    pub end_date: Option<String>,
    /// Comma separated team abbreviations.
    #[arg(long)]
    pub team: Option<String>,
    #[arg(long)]
    pub game_pk: Option<String>,
    /// Comma separated MLBAM ids.
    #[arg(long)]
    pub batters: Option<String>,
    #[arg(long)]
    pub pitchers: Option<String>,
    /// Any other search field as `field=value[,value...]`.
    #[arg(short = 'p', long = "param", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,
    #[arg(long)]
    pub aggregate: bool,
    /// Keep the season field as given even when dates fall outside it.
    #[arg(long)]
    pub no_update_seasons: bool,
    /// Skip the derived release-metric columns.
    #[arg(long)]
    pub no_derived_columns: bool,
}

#[derive(Args, Debug)]
pub struct LeaderboardArgs {
    /// Leaderboard collection, e.g. `expected_stats` or `swing-take`.
    pub name: String,
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    #[arg(short = 'p', long = "param", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,
}

#[derive(Args, Debug)]
pub struct LookupArgs {
    /// Id under any id system.
    #[arg(long, conflicts_with_all = ["name", "table"])]
    pub id: Option<String>,
    /// Full, first or last name.
    #[arg(long, conflicts_with = "table")]
    pub name: Option<String>,
    /// With `--name`, print only the player's id under this system.
    #[arg(long, requires = "name", value_parser = parse_id_source)]
    pub source: Option<IdSource>,
    /// Debut year used to pick between players sharing a name.
    #[arg(long, requires = "source")]
    pub start_year: Option<i32>,
    /// Dump the whole table.
    #[arg(long)]
    pub table: bool,
    /// Download the register again even when cached.
    #[arg(long)]
    pub refresh: bool,
    #[arg(long)]
    pub mlb_only: bool,
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Settings as read from `--config-toml`; every key is optional.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub leaderboard_url: Option<String>,
    pub lookup_url: Option<String>,
    pub lookup_cache: Option<PathBuf>,
    pub fields_json: Option<PathBuf>,
    pub stagger_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub show_progress: Option<bool>,
    pub log_level: Option<String>,
}
