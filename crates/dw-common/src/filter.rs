//! Event kinds, country codes and wildcard-aware filters.
//!
//! Filters travel on the wire as plain strings: the empty string is the
//! wildcard, any other value is an exact match. Internally they are a
//! tagged `Any | Exact(value)` so "unset" and "match this" never blur.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Kinds of domain events a subscription can listen for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Register,
    Change,
    Delete,
    /// Recognized but never raised internally; reserved for external triggers
    Invoke,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::Register,
        EventKind::Change,
        EventKind::Delete,
        EventKind::Invoke,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Register => "REGISTER",
            EventKind::Change => "CHANGE",
            EventKind::Delete => "DELETE",
            EventKind::Invoke => "INVOKE",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("the event must be empty, 'REGISTER', 'CHANGE', 'DELETE' or 'INVOKE' (got '{0}')")]
pub struct InvalidEventKind(pub String);

impl FromStr for EventKind {
    type Err = InvalidEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "REGISTER" => Ok(EventKind::Register),
            "CHANGE" => Ok(EventKind::Change),
            "DELETE" => Ok(EventKind::Delete),
            "INVOKE" => Ok(EventKind::Invoke),
            _ => Err(InvalidEventKind(s.to_string())),
        }
    }
}

/// Registry check: the four kinds or the empty wildcard, case-insensitive.
/// Surrounding whitespace is not ignored.
pub fn is_valid_event_kind(value: &str) -> bool {
    value.parse::<EventFilter>().is_ok()
}

/// ISO country code, trimmed and upper-cased on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CountryCode(String);

impl CountryCode {
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CountryCode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(CountryCode::new(s))
    }
}

/// Either matches everything or exactly one value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Filter<T> {
    Any,
    Exact(T),
}

pub type EventFilter = Filter<EventKind>;
pub type CountryFilter = Filter<CountryCode>;

impl<T> Default for Filter<T> {
    fn default() -> Self {
        Filter::Any
    }
}

impl<T: PartialEq> Filter<T> {
    /// Whether a value passes this filter. `Any` admits everything.
    pub fn admits(&self, value: &T) -> bool {
        match self {
            Filter::Any => true,
            Filter::Exact(expected) => expected == value,
        }
    }
}

impl<T> Filter<T> {
    pub fn is_any(&self) -> bool {
        matches!(self, Filter::Any)
    }

    pub fn exact(&self) -> Option<&T> {
        match self {
            Filter::Any => None,
            Filter::Exact(value) => Some(value),
        }
    }
}

impl EventFilter {
    /// Dispatch-side matching: a wildcard subscription admits any event,
    /// an exact subscription only the same exact event.
    pub fn matches_event(&self, event: &EventFilter) -> bool {
        match (self, event) {
            (Filter::Any, _) => true,
            (Filter::Exact(expected), Filter::Exact(actual)) => expected == actual,
            (Filter::Exact(_), Filter::Any) => false,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Filter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Any => Ok(()),
            Filter::Exact(value) => value.fmt(f),
        }
    }
}

impl<T: FromStr> FromStr for Filter<T> {
    type Err = T::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Filter::Any);
        }
        s.parse().map(Filter::Exact)
    }
}

impl From<EventKind> for EventFilter {
    fn from(kind: EventKind) -> Self {
        Filter::Exact(kind)
    }
}

impl From<CountryCode> for CountryFilter {
    fn from(code: CountryCode) -> Self {
        if code.is_empty() {
            Filter::Any
        } else {
            Filter::Exact(code)
        }
    }
}

impl<T: fmt::Display> Serialize for Filter<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, T> Deserialize<'de> for Filter<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(Filter::Any),
            Some(s) => s.parse().map_err(de::Error::custom),
        }
    }
}
