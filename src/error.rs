use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("unknown field '{name}' for collection '{collection}'{}", did_you_mean(.suggestions))]
    FieldName {
        name: String,
        collection: String,
        suggestions: Vec<String>,
    },
    #[error("invalid value '{value}' for field '{field}'{}", did_you_mean(.suggestions))]
    FieldValue {
        value: String,
        field: String,
        suggestions: Vec<String>,
    },
    #[error("invalid type for '{value}' in field '{field}'; expected {expected}")]
    FieldType {
        value: String,
        field: String,
        expected: &'static str,
    },
    #[error("{given} values given; field '{field}' takes a maximum of {max} values")]
    TooManyValues {
        field: String,
        given: usize,
        max: usize,
    },
    #[error("min value '{lower}' > max value '{upper}'{}", for_field(.field))]
    InvalidBound {
        lower: String,
        upper: String,
        field: Option<String>,
    },
    #[error(
        "invalid subgroup '{subgroup}' for group '{group}' in leaderboard '{leaderboard}'; subgroup must be in {}",
        quoted(.valid)
    )]
    InvalidSubgroup {
        group: String,
        subgroup: String,
        leaderboard: String,
        valid: Vec<String>,
    },
    #[error("player id '{0}' not found")]
    IdNotFound(String),
    #[error("player name '{0}' not found")]
    NameNotFound(String),
    #[error("invalid id source '{0}'; expected one of mlbam, fangraphs, bbref, retro")]
    InvalidSource(String),
    #[error("season {0} is outside the supported season table")]
    SeasonOutOfRange(i32),
    #[error("unknown collection '{name}'{}", did_you_mean(.suggestions))]
    UnknownCollection {
        name: String,
        suggestions: Vec<String>,
    },
    #[error("config error: {0}")]
    Config(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("http status {status} for {url}")]
    Http { status: u16, url: String },
    #[error("parse error: {0}")]
    Parse(String),
    #[error("io error: {0}")]
    Io(String),
}

impl From<reqwest::Error> for QueryError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Http {
                status: status.as_u16(),
                url: err.url().map(ToString::to_string).unwrap_or_default(),
            },
            None => Self::Network(err.to_string()),
        }
    }
}

impl From<csv::Error> for QueryError {
    fn from(err: csv::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<std::io::Error> for QueryError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

fn did_you_mean(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!("; did you mean {}?", quoted(suggestions))
    }
}

fn for_field(field: &Option<String>) -> String {
    field
        .as_ref()
        .map(|name| format!(" for field '{name}'"))
        .unwrap_or_default()
}

fn quoted(values: &[String]) -> String {
    values
        .iter()
        .map(|value| format!("'{value}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Rank `candidates` by similarity to `word` and keep the closest few.
///
/// Exact case-insensitive hits always come first.
#[must_use]
pub fn close_matches<'a, I>(word: &str, candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let target = word.to_lowercase();
    let mut ranked: Vec<(f64, &String)> = candidates
        .into_iter()
        .map(|name| (strsim::jaro_winkler(&name.to_lowercase(), &target), name))
        .collect();
    ranked.sort_by(|(score_a, name_a), (score_b, name_b)| {
        score_b
            .partial_cmp(score_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| name_a.cmp(name_b))
    });
    ranked
        .into_iter()
        .filter(|(score, _)| *score >= 0.75)
        .take(3)
        .map(|(_, name)| name.clone())
        .collect()
}
