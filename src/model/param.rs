use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;

/// Wire parameters: URL query key to one or more values.
pub type ParamMap = BTreeMap<String, Vec<String>>;

/// A single caller-supplied value before a field validates it.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Null,
    Text(String),
    Int(i64),
    Float(f64),
    Date(NaiveDate),
}

impl ParamValue {
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Text(text) => write!(f, "{text}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Date(value) => write!(f, "{}", value.format("%Y-%m-%d")),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<NaiveDate> for ParamValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Zero or more values handed to one field.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Param(pub Vec<ParamValue>);

impl Param {
    #[must_use]
    pub fn none() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn values(&self) -> &[ParamValue] {
        &self.0
    }

    /// True when nothing meaningful was supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(ParamValue::is_blank)
    }

    /// Split a comma separated CLI value into a list.
    #[must_use]
    pub fn from_csv_list(raw: &str) -> Self {
        Self(
            raw.split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(ParamValue::from)
                .collect(),
        )
    }
}

impl From<ParamValue> for Param {
    fn from(value: ParamValue) -> Self {
        Self(vec![value])
    }
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Self(vec![value.into()])
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Self(vec![value.into()])
    }
}

impl From<i64> for Param {
    fn from(value: i64) -> Self {
        Self(vec![value.into()])
    }
}

impl From<i32> for Param {
    fn from(value: i32) -> Self {
        Self(vec![value.into()])
    }
}

impl From<f64> for Param {
    fn from(value: f64) -> Self {
        Self(vec![value.into()])
    }
}

impl From<NaiveDate> for Param {
    fn from(value: NaiveDate) -> Self {
        Self(vec![value.into()])
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for Param {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self(vec![value.into()]),
            None => Self::none(),
        }
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for Param {
    fn from(values: Vec<T>) -> Self {
        Self(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ParamValue> + Clone> From<&[T]> for Param {
    fn from(values: &[T]) -> Self {
        Self(values.iter().cloned().map(Into::into).collect())
    }
}

/// Ordered field name/value pairs for one logical query.
///
/// Order matters: metric slots and frequency contributions are assigned in
/// insertion order. Setting an existing name replaces it in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryArgs {
    entries: Vec<(String, Param)>,
}

impl QueryArgs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<Param>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<Param>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// Overlay `other` on top of `self`, keeping `self`'s ordering for shared keys.
    #[must_use]
    pub fn merged(mut self, other: QueryArgs) -> Self {
        for (name, value) in other.entries {
            self.set(&name, value);
        }
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Param> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Param)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
