use crate::error::{QueryError, close_matches};
use crate::model::param::{Param, ParamMap, ParamValue};
use ahash::RandomState;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Identity lookup used to filter player ids before they reach the wire.
pub trait PlayerIndex: Send + Sync {
    fn exists(&self, id: &str) -> bool;
}

impl PlayerIndex for HashSet<String> {
    fn exists(&self, id: &str) -> bool {
        self.contains(id)
    }
}

/// Per-call state a field needs while encoding.
pub struct EncodeContext<'a> {
    pub players: &'a dyn PlayerIndex,
    /// Slot number for metric-range fields (`metric_{slot}`), starting at 1.
    pub metric_slot: usize,
}

/// Declarative description of a field, as found in the collection JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub slug: String,
    pub field_type: String,
    #[serde(default)]
    pub choices: BTreeMap<String, String>,
    #[serde(default)]
    pub frequencies: HashMap<String, f64, RandomState>,
    #[serde(default)]
    pub aliases: BTreeMap<String, Vec<String>>,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default = "default_trailing_delimiter")]
    pub add_trailing_delimiter: bool,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
}

fn default_delimiter() -> String {
    "|".to_string()
}

fn default_trailing_delimiter() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Passthrough,
    SingleSelect {
        choices: BTreeMap<String, String>,
    },
    MultiSelect {
        choices: BTreeMap<String, String>,
        aliases: BTreeMap<String, Vec<String>>,
        delimiter: String,
        trailing_delimiter: bool,
    },
    PlayerLookup,
    DateRange,
    MetricRange {
        min_value: Option<f64>,
        max_value: Option<f64>,
    },
}

/// Values recovered from wire parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValues {
    Single(String),
    Many(Vec<String>),
    Dates(Option<NaiveDate>, Option<NaiveDate>),
    Range(Option<f64>, Option<f64>),
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub slug: String,
    pub frequencies: HashMap<String, f64, RandomState>,
    pub kind: FieldKind,
}

impl From<FieldSpec> for Field {
    fn from(spec: FieldSpec) -> Self {
        let lowered = |map: BTreeMap<String, String>| -> BTreeMap<String, String> {
            map.into_iter().map(|(k, v)| (k.to_lowercase(), v)).collect()
        };
        let kind = match spec.field_type.as_str() {
            "single-select" => FieldKind::SingleSelect {
                choices: lowered(spec.choices),
            },
            "multi-select" => FieldKind::MultiSelect {
                choices: lowered(spec.choices),
                aliases: spec
                    .aliases
                    .into_iter()
                    .map(|(k, v)| (k.to_lowercase(), v))
                    .collect(),
                delimiter: spec.delimiter,
                trailing_delimiter: spec.add_trailing_delimiter,
            },
            "player-lookup" => FieldKind::PlayerLookup,
            "date-range" => FieldKind::DateRange,
            "metric-range" => FieldKind::MetricRange {
                min_value: spec.min_value,
                max_value: spec.max_value,
            },
            _ => FieldKind::Passthrough,
        };
        Self {
            name: spec.name,
            slug: spec.slug,
            frequencies: spec.frequencies,
            kind,
        }
    }
}

impl Field {
    #[must_use]
    pub fn is_metric(&self) -> bool {
        matches!(self.kind, FieldKind::MetricRange { .. })
    }

    #[must_use]
    pub fn is_date_range(&self) -> bool {
        matches!(self.kind, FieldKind::DateRange)
    }

    /// Encode `value` into wire parameters.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the value fails this field's validation rules
    pub fn get_params(&self, value: &Param, ctx: &EncodeContext) -> Result<ParamMap, QueryError> {
        match &self.kind {
            FieldKind::Passthrough => {
                let value = self.single_value(value)?;
                Ok(ParamMap::from([(self.slug.clone(), vec![value])]))
            }
            FieldKind::SingleSelect { choices } => {
                let value = self.single_value(value)?;
                let slug = self.resolve_choice(&value, choices)?;
                Ok(ParamMap::from([(self.slug.clone(), vec![escape(&slug)])]))
            }
            FieldKind::MultiSelect {
                choices,
                aliases,
                delimiter,
                trailing_delimiter,
            } => {
                let mut slugs = BTreeSet::new();
                for item in value.values().iter().filter(|item| !item.is_blank()) {
                    slugs.extend(self.resolve_multi(&item.to_string(), choices, aliases)?);
                }
                let mut joined = slugs
                    .iter()
                    .map(|slug| escape(slug))
                    .collect::<Vec<_>>()
                    .join(delimiter);
                if *trailing_delimiter && !slugs.is_empty() {
                    joined.push_str(delimiter);
                }
                Ok(ParamMap::from([(self.slug.clone(), vec![joined])]))
            }
            FieldKind::PlayerLookup => {
                let mut ids: Vec<String> = value
                    .values()
                    .iter()
                    .filter(|item| !item.is_blank())
                    .map(|item| item.to_string().trim().to_string())
                    .filter(|id| ctx.players.exists(id))
                    .collect();
                ids.sort();
                ids.dedup();
                Ok(ParamMap::from([(self.slug.clone(), ids)]))
            }
            FieldKind::DateRange => {
                let (start, end) = self.date_bounds(value)?;
                Ok(ParamMap::from([
                    (format!("{}_gt", self.slug), vec![format_date(start)]),
                    (format!("{}_lt", self.slug), vec![format_date(end)]),
                ]))
            }
            FieldKind::MetricRange {
                min_value,
                max_value,
            } => {
                let (lower, upper) = self.metric_bounds(value, *min_value, *max_value)?;
                let slot = ctx.metric_slot;
                Ok(ParamMap::from([
                    (format!("metric_{slot}"), vec![self.slug.clone()]),
                    (format!("metric_{slot}_gt"), vec![format_number(lower)]),
                    (format!("metric_{slot}_lt"), vec![format_number(upper)]),
                ]))
            }
        }
    }

    /// Recover this field's values from wire parameters.
    #[must_use]
    pub fn get_values(&self, params: &ParamMap) -> FieldValues {
        match &self.kind {
            FieldKind::Passthrough => FieldValues::Single(first_param(params, &self.slug)),
            FieldKind::SingleSelect { .. } => {
                FieldValues::Single(unescape(&first_param(params, &self.slug)))
            }
            FieldKind::MultiSelect { delimiter, .. } => {
                let raw = unescape(&first_param(params, &self.slug));
                FieldValues::Many(
                    raw.split(delimiter.as_str())
                        .filter(|part| !part.is_empty())
                        .map(ToString::to_string)
                        .collect(),
                )
            }
            FieldKind::PlayerLookup => FieldValues::Many(
                params
                    .get(&self.slug)
                    .map(|ids| ids.iter().filter(|id| !id.is_empty()).cloned().collect())
                    .unwrap_or_default(),
            ),
            FieldKind::DateRange => FieldValues::Dates(
                parse_date(&first_param(params, &format!("{}_gt", self.slug))),
                parse_date(&first_param(params, &format!("{}_lt", self.slug))),
            ),
            FieldKind::MetricRange { .. } => {
                let mut slot = 1;
                loop {
                    let name = first_param(params, &format!("metric_{slot}"));
                    if name.is_empty() {
                        return FieldValues::Range(None, None);
                    }
                    if name == self.slug {
                        return FieldValues::Range(
                            parse_number(&first_param(params, &format!("metric_{slot}_gt"))),
                            parse_number(&first_param(params, &format!("metric_{slot}_lt"))),
                        );
                    }
                    slot += 1;
                }
            }
        }
    }

    /// Estimated share of the full result set this field's selection keeps.
    #[must_use]
    pub fn get_frequency(&self, params: &ParamMap) -> f64 {
        let frequency = match (&self.kind, self.get_values(params)) {
            (FieldKind::SingleSelect { .. }, FieldValues::Single(value)) => {
                if value.is_empty() {
                    1.0
                } else {
                    self.frequency_of(&value)
                }
            }
            (FieldKind::MultiSelect { .. }, FieldValues::Many(values)) => {
                if values.is_empty() {
                    1.0
                } else {
                    values.iter().map(|value| self.frequency_of(value)).sum()
                }
            }
            (FieldKind::PlayerLookup, FieldValues::Many(ids)) => {
                if ids.is_empty() {
                    1.0
                } else {
                    0.01 * ids.len() as f64
                }
            }
            (_, FieldValues::Single(value)) if !value.is_empty() => self.default_frequency(),
            (_, FieldValues::Dates(start, end)) if start.is_some() || end.is_some() => {
                self.default_frequency()
            }
            (_, FieldValues::Range(lower, upper)) if lower.is_some() || upper.is_some() => {
                self.default_frequency()
            }
            _ => 1.0,
        };
        bounded_frequency(frequency)
    }

    fn default_frequency(&self) -> f64 {
        self.frequencies.get("default").copied().unwrap_or(1.0)
    }

    fn frequency_of(&self, value: &str) -> f64 {
        self.frequencies
            .get(value)
            .copied()
            .unwrap_or_else(|| self.default_frequency())
    }

    fn single_value(&self, value: &Param) -> Result<String, QueryError> {
        let present: Vec<&ParamValue> = value
            .values()
            .iter()
            .filter(|item| !item.is_blank())
            .collect();
        if present.len() > 1 {
            return Err(QueryError::TooManyValues {
                field: self.name.clone(),
                given: present.len(),
                max: 1,
            });
        }
        Ok(present
            .first()
            .map(|item| item.to_string().trim().to_string())
            .unwrap_or_default())
    }

    fn resolve_choice(
        &self,
        value: &str,
        choices: &BTreeMap<String, String>,
    ) -> Result<String, QueryError> {
        if value.is_empty() {
            return Ok(String::new());
        }
        if let Some(slug) = choices.get(&value.to_lowercase()) {
            return Ok(slug.clone());
        }
        if choices.values().any(|slug| slug == value) {
            return Ok(value.to_string());
        }
        Err(self.value_error(value, choices.keys()))
    }

    fn resolve_multi(
        &self,
        value: &str,
        choices: &BTreeMap<String, String>,
        aliases: &BTreeMap<String, Vec<String>>,
    ) -> Result<Vec<String>, QueryError> {
        let value = value.trim();
        let lowered = value.to_lowercase();
        if let Some(slug) = choices.get(&lowered) {
            return Ok(vec![slug.clone()]);
        }
        if let Some(slugs) = aliases.get(&lowered) {
            return Ok(slugs.clone());
        }
        if choices.values().any(|slug| slug == value) {
            return Ok(vec![value.to_string()]);
        }
        Err(self.value_error(value, choices.keys().chain(aliases.keys())))
    }

    fn value_error<'a, I>(&self, value: &str, candidates: I) -> QueryError
    where
        I: IntoIterator<Item = &'a String>,
    {
        QueryError::FieldValue {
            value: value.to_string(),
            field: self.name.clone(),
            suggestions: close_matches(value, candidates),
        }
    }

    fn range_values<'a>(
        &self,
        value: &'a Param,
    ) -> Result<(&'a ParamValue, &'a ParamValue), QueryError> {
        const NULL: &ParamValue = &ParamValue::Null;
        match value.values() {
            [] => Ok((NULL, NULL)),
            [only] => Ok((only, only)),
            [lower, upper] => Ok((lower, upper)),
            many => Err(QueryError::TooManyValues {
                field: self.name.clone(),
                given: many.len(),
                max: 2,
            }),
        }
    }

    fn date_bounds(
        &self,
        value: &Param,
    ) -> Result<(Option<NaiveDate>, Option<NaiveDate>), QueryError> {
        let (lower, upper) = self.range_values(value)?;
        let start = self.date_value(lower)?;
        let end = self.date_value(upper)?;
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(QueryError::InvalidBound {
                    lower: format_date(Some(start)),
                    upper: format_date(Some(end)),
                    field: Some(self.name.clone()),
                });
            }
        }
        Ok((start, end))
    }

    fn date_value(&self, value: &ParamValue) -> Result<Option<NaiveDate>, QueryError> {
        match value {
            ParamValue::Null => Ok(None),
            ParamValue::Text(text) if text.trim().is_empty() => Ok(None),
            ParamValue::Text(text) => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
                .map(Some)
                .map_err(|_| QueryError::FieldValue {
                    value: text.clone(),
                    field: self.name.clone(),
                    suggestions: Vec::new(),
                }),
            ParamValue::Date(date) => Ok(Some(*date)),
            ParamValue::Int(_) | ParamValue::Float(_) => Err(QueryError::FieldType {
                value: value.to_string(),
                field: self.name.clone(),
                expected: "a date or YYYY-MM-DD string",
            }),
        }
    }

    fn metric_bounds(
        &self,
        value: &Param,
        min_value: Option<f64>,
        max_value: Option<f64>,
    ) -> Result<(Option<f64>, Option<f64>), QueryError> {
        let (lower, upper) = self.range_values(value)?;
        let range_min = min_value.unwrap_or(f64::NEG_INFINITY);
        let range_max = max_value.unwrap_or(f64::INFINITY);
        let clamp = |bound: f64| bound.max(range_min).min(range_max);

        let lower = self.metric_value(lower)?.map(clamp);
        let upper = self.metric_value(upper)?.map(clamp);
        if let (Some(lower), Some(upper)) = (lower, upper) {
            if lower > upper {
                return Err(QueryError::InvalidBound {
                    lower: format_number(Some(lower)),
                    upper: format_number(Some(upper)),
                    field: Some(self.name.clone()),
                });
            }
        }
        Ok((lower, upper))
    }

    fn metric_value(&self, value: &ParamValue) -> Result<Option<f64>, QueryError> {
        let number = match value {
            ParamValue::Null => return Ok(None),
            ParamValue::Text(text) if text.trim().is_empty() => return Ok(None),
            ParamValue::Text(text) => {
                text.trim()
                    .parse::<f64>()
                    .map_err(|_| QueryError::FieldValue {
                        value: text.clone(),
                        field: self.name.clone(),
                        suggestions: Vec::new(),
                    })?
            }
            #[allow(clippy::cast_precision_loss)]
            ParamValue::Int(number) => *number as f64,
            ParamValue::Float(number) => *number,
            ParamValue::Date(_) => {
                return Err(QueryError::FieldType {
                    value: value.to_string(),
                    field: self.name.clone(),
                    expected: "a number",
                });
            }
        };
        if number.is_nan() {
            return Err(QueryError::FieldValue {
                value: value.to_string(),
                field: self.name.clone(),
                suggestions: Vec::new(),
            });
        }
        Ok(Some(number))
    }
}

fn escape(value: &str) -> String {
    value.replace('.', r"\.")
}

fn unescape(value: &str) -> String {
    value.replace(r"\.", ".")
}

fn first_param(params: &ParamMap, key: &str) -> String {
    params
        .get(key)
        .and_then(|values| values.first())
        .cloned()
        .unwrap_or_default()
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn format_number(number: Option<f64>) -> String {
    number.map(|number| number.to_string()).unwrap_or_default()
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok()
}

fn bounded_frequency(frequency: f64) -> f64 {
    if frequency.is_nan() {
        1.0
    } else {
        frequency.clamp(1e-6, 1.0)
    }
}
