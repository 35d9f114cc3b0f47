use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://baseballsavant.mlb.com";
pub const DEFAULT_LEADERBOARD_URL: &str = "https://baseballsavant.mlb.com/leaderboard";
pub const DEFAULT_LOOKUP_URL: &str =
    "https://raw.githubusercontent.com/chadwickbureau/register/master/data/people.csv";

/// Runtime settings shared by the client and its transport.
///
/// Built from defaults here; the CLI layers a TOML file and flags over them
/// in `args::load_config`.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub base_url: String,
    pub leaderboard_url: String,
    pub lookup_url: String,
    /// Where the downloaded player register is cached.
    pub lookup_cache: PathBuf,
    /// Field registry override; the built-in document is used when unset.
    pub fields_json: Option<PathBuf>,
    /// Pause between request submissions.
    pub stagger_ms: u64,
    pub timeout_secs: u64,
    pub show_progress: bool,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            leaderboard_url: DEFAULT_LEADERBOARD_URL.to_string(),
            lookup_url: DEFAULT_LOOKUP_URL.to_string(),
            lookup_cache: default_lookup_cache(),
            fields_json: None,
            stagger_ms: 1_000,
            timeout_secs: 180,
            show_progress: true,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    #[must_use]
    pub fn stagger(&self) -> Duration {
        Duration::from_millis(self.stagger_ms)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_lookup_cache() -> PathBuf {
    std::env::temp_dir()
        .join("rusty-savant")
        .join("lookup_table.csv")
}
