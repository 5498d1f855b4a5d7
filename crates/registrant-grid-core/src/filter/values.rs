use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::models::PersonField;
use crate::utils::{format_date, parse_date};

/// Identity of one filter input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FilterKey {
    Builtin(PersonField),
    /// Attribute filter, keyed by attribute key.
    Attribute(String),
    /// Record creation date range.
    CreatedRange,
}

/// Raw filter inputs, as typed or as loaded from stored preferences.
///
/// Blank values are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterValues {
    values: BTreeMap<FilterKey, String>,
}

impl FilterValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: FilterKey, value: impl Into<String>) {
        self.values.insert(key, value.into());
    }

    pub fn with(mut self, key: FilterKey, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn remove(&mut self, key: &FilterKey) {
        self.values.remove(key);
    }

    /// Trimmed value for `key`, or `None` when missing or blank.
    pub fn get(&self, key: &FilterKey) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn builtin(&self, field: PersonField) -> Option<&str> {
        self.get(&FilterKey::Builtin(field))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FilterKey, &str)> {
        self.values.iter().map(|(k, v)| (k, v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.values.values().all(|v| v.trim().is_empty())
    }
}

/// How the upper end of a date range compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpperBound {
    /// `value <= upper`
    Inclusive,
    /// `value < upper`
    Exclusive,
}

impl UpperBound {
    pub fn admits<T: PartialOrd>(&self, value: &T, upper: &T) -> bool {
        match self {
            UpperBound::Inclusive => value <= upper,
            UpperBound::Exclusive => value < upper,
        }
    }
}

/// A date range with independently optional ends.
///
/// Stored as `"lower,upper"` where either side may be blank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub lower: Option<NaiveDate>,
    pub upper: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(lower: Option<NaiveDate>, upper: Option<NaiveDate>) -> Self {
        Self { lower, upper }
    }

    /// Parse a stored `"lower,upper"` value. Unparseable ends are dropped.
    pub fn parse(delimited: &str) -> Self {
        let mut parts = delimited.splitn(2, ',');
        let lower = parts.next().and_then(parse_date);
        let upper = parts.next().and_then(parse_date);
        Self { lower, upper }
    }

    pub fn to_delimited(&self) -> String {
        let side = |d: Option<NaiveDate>| d.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default();
        if self.is_empty() {
            return String::new();
        }
        format!("{},{}", side(self.lower), side(self.upper))
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }

    /// Lower bound inclusive, upper bound per `upper_bound`.
    pub fn contains(&self, date: NaiveDate, upper_bound: UpperBound) -> bool {
        if let Some(lower) = self.lower {
            if date < lower {
                return false;
            }
        }
        match self.upper {
            Some(upper) => upper_bound.admits(&date, &upper),
            None => true,
        }
    }

    pub fn contains_datetime(&self, at: NaiveDateTime, upper_bound: UpperBound) -> bool {
        self.contains(at.date(), upper_bound)
    }

    /// Summary text: "A to B", "from A", "through B".
    pub fn summary(&self) -> String {
        match (self.lower, self.upper) {
            (Some(lower), Some(upper)) => format!("{} to {}", format_date(lower), format_date(upper)),
            (Some(lower), None) => format!("from {}", format_date(lower)),
            (None, Some(upper)) => format!("through {}", format_date(upper)),
            (None, None) => String::new(),
        }
    }
}
