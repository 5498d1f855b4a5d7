//! Attribute filters.
//!
//! Attribute filter values are stored as a JSON array of strings whose shape
//! depends on the attribute's field type. An [`AttributeFieldFilter`] turns
//! that array into a [`ValueFilter`] and back into display text.

use serde::{Deserialize, Serialize};

use super::values::{DateRange, UpperBound};
use crate::models::attribute::parse_bool;
use crate::models::{AttributeDefinition, AttributeFieldType};
use crate::utils::{contains_ignore_case, parse_date, starts_with_ignore_case};

/// Comparison for text attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextComparison {
    Contains,
    EqualTo,
    StartsWith,
}

impl TextComparison {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "contains" => Some(TextComparison::Contains),
            "equalto" | "equals" => Some(TextComparison::EqualTo),
            "startswith" => Some(TextComparison::StartsWith),
            _ => None,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            TextComparison::Contains => "Contains",
            TextComparison::EqualTo => "Is",
            TextComparison::StartsWith => "Starts with",
        }
    }
}

/// A parsed attribute filter, applied to a single stored value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueFilter {
    Text { comparison: TextComparison, value: String },
    Number { lower: Option<f64>, upper: Option<f64> },
    Boolean(bool),
    Date(DateRange),
    AnyOf(Vec<String>),
}

impl ValueFilter {
    pub fn matches(&self, raw: &str) -> bool {
        let raw = raw.trim();
        match self {
            ValueFilter::Text { comparison, value } => match comparison {
                TextComparison::Contains => contains_ignore_case(raw, value),
                TextComparison::EqualTo => raw.eq_ignore_ascii_case(value),
                TextComparison::StartsWith => starts_with_ignore_case(raw, value),
            },
            ValueFilter::Number { lower, upper } => match raw.parse::<f64>() {
                Ok(n) => lower.map_or(true, |l| n >= l) && upper.map_or(true, |u| n <= u),
                Err(_) => false,
            },
            ValueFilter::Boolean(expected) => parse_bool(raw) == Some(*expected),
            ValueFilter::Date(range) => {
                parse_date(raw).map_or(false, |date| range.contains(date, UpperBound::Inclusive))
            }
            ValueFilter::AnyOf(options) => options.iter().any(|o| o.eq_ignore_ascii_case(raw)),
        }
    }
}

/// Turns stored attribute filter values into filters and display text.
pub trait AttributeFieldFilter {
    /// `None` means "apply nothing" (blank or unusable input).
    fn parse(&self, attribute: &AttributeDefinition, values: &[String]) -> Option<ValueFilter>;

    fn format(&self, attribute: &AttributeDefinition, values: &[String]) -> String;
}

/// Decode the stored JSON array. Anything else is treated as no filter.
pub fn parse_stored_values(stored: &str) -> Option<Vec<String>> {
    serde_json::from_str::<Vec<String>>(stored).ok()
}

/// Encode filter values for storage.
pub fn to_stored_values(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_default()
}

/// Filter behavior for the built-in attribute field types.
///
/// Value shapes:
/// - Text: `[value]` or `[comparison, value]`
/// - Integer / Decimal: `[value]` or `[lower, upper]`
/// - Boolean: `[value]`
/// - Date: `["lower,upper"]` or `[lower, upper]`
/// - SingleSelect: one entry per selected option
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAttributeFilter;

impl AttributeFieldFilter for DefaultAttributeFilter {
    fn parse(&self, attribute: &AttributeDefinition, values: &[String]) -> Option<ValueFilter> {
        let values: Vec<&str> = values.iter().map(|v| v.trim()).collect();
        if values.iter().all(|v| v.is_empty()) {
            return None;
        }

        match attribute.field_type {
            AttributeFieldType::Text => {
                let (comparison, value) = match values.as_slice() {
                    [value] => (TextComparison::Contains, *value),
                    [comparison, value, ..] => (TextComparison::parse(comparison)?, *value),
                    [] => return None,
                };
                if value.is_empty() {
                    return None;
                }
                Some(ValueFilter::Text {
                    comparison,
                    value: value.to_string(),
                })
            }
            AttributeFieldType::Integer | AttributeFieldType::Decimal => {
                let number = |s: &str| s.parse::<f64>().ok();
                let (lower, upper) = match values.as_slice() {
                    [value] => {
                        let n = number(value)?;
                        (Some(n), Some(n))
                    }
                    [lower, upper, ..] => (number(lower), number(upper)),
                    [] => return None,
                };
                if lower.is_none() && upper.is_none() {
                    return None;
                }
                Some(ValueFilter::Number { lower, upper })
            }
            AttributeFieldType::Boolean => values
                .iter()
                .find_map(|v| parse_bool(v))
                .map(ValueFilter::Boolean),
            AttributeFieldType::Date => {
                let range = match values.as_slice() {
                    [delimited] => DateRange::parse(delimited),
                    [lower, upper, ..] => DateRange::parse(&format!("{},{}", lower, upper)),
                    [] => return None,
                };
                (!range.is_empty()).then_some(ValueFilter::Date(range))
            }
            AttributeFieldType::SingleSelect => {
                let options: Vec<String> = values
                    .iter()
                    .flat_map(|v| v.split(','))
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .collect();
                (!options.is_empty()).then_some(ValueFilter::AnyOf(options))
            }
        }
    }

    fn format(&self, attribute: &AttributeDefinition, values: &[String]) -> String {
        match self.parse(attribute, values) {
            Some(ValueFilter::Text { comparison, value }) => {
                format!("{} '{}'", comparison.describe(), value)
            }
            Some(ValueFilter::Number { lower, upper }) => match (lower, upper) {
                (Some(l), Some(u)) if l == u => format!("{}", l),
                (Some(l), Some(u)) => format!("Between {} and {}", l, u),
                (Some(l), None) => format!("At least {}", l),
                (None, Some(u)) => format!("At most {}", u),
                (None, None) => String::new(),
            },
            Some(ValueFilter::Boolean(b)) => if b { "Yes" } else { "No" }.to_string(),
            Some(ValueFilter::Date(range)) => range.summary(),
            Some(ValueFilter::AnyOf(options)) => options.join(" or "),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttributeEntity;

    fn attribute(field_type: AttributeFieldType) -> AttributeDefinition {
        AttributeDefinition {
            id: 1,
            key: "Key".to_string(),
            name: "Key".to_string(),
            field_type,
            entity: AttributeEntity::Registrant,
            qualifier_group_id: None,
            default_value: None,
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_text_filter() {
        let attr = attribute(AttributeFieldType::Text);
        let filter = DefaultAttributeFilter.parse(&attr, &strings(&["arg"])).unwrap();
        assert!(filter.matches("Large"));
        assert!(!filter.matches("Small"));

        let exact = DefaultAttributeFilter
            .parse(&attr, &strings(&["EqualTo", "large"]))
            .unwrap();
        assert!(exact.matches("Large"));
        assert!(!exact.matches("X-Large"));

        assert_eq!(DefaultAttributeFilter.parse(&attr, &strings(&["", ""])), None);
        assert_eq!(DefaultAttributeFilter.parse(&attr, &strings(&["Bogus", "x"])), None);
    }

    #[test]
    fn test_number_filter() {
        let attr = attribute(AttributeFieldType::Integer);
        let range = DefaultAttributeFilter.parse(&attr, &strings(&["3", ""])).unwrap();
        assert!(range.matches("3"));
        assert!(range.matches("10"));
        assert!(!range.matches("2"));
        assert!(!range.matches("n/a"));
        assert_eq!(DefaultAttributeFilter.format(&attr, &strings(&["3", ""])), "At least 3");
    }

    #[test]
    fn test_boolean_and_select_filters() {
        let attr = attribute(AttributeFieldType::Boolean);
        let filter = DefaultAttributeFilter.parse(&attr, &strings(&["True"])).unwrap();
        assert!(filter.matches("yes"));
        assert!(!filter.matches("False"));

        let attr = attribute(AttributeFieldType::SingleSelect);
        let filter = DefaultAttributeFilter.parse(&attr, &strings(&["S,M"])).unwrap();
        assert!(filter.matches("m"));
        assert!(!filter.matches("L"));
        assert_eq!(DefaultAttributeFilter.format(&attr, &strings(&["S,M"])), "S or M");
    }

    #[test]
    fn test_date_filter() {
        let attr = attribute(AttributeFieldType::Date);
        let filter = DefaultAttributeFilter
            .parse(&attr, &strings(&["2024-01-01,2024-12-31"]))
            .unwrap();
        assert!(filter.matches("2024-12-31"));
        assert!(!filter.matches("2025-01-01"));
        // Values stored as timestamps compare by their date
        assert!(filter.matches("2024-03-09T00:00:00"));
        assert!(!filter.matches("2025-01-01T08:30:00"));
    }

    #[test]
    fn test_stored_values() {
        assert_eq!(parse_stored_values(r#"["a","b"]"#), Some(strings(&["a", "b"])));
        assert_eq!(parse_stored_values("not json"), None);
        assert_eq!(to_stored_values(&strings(&["x"])), r#"["x"]"#);
    }
}
