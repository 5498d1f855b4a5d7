use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::utils::format_phone;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Gender {
    #[default]
    Unknown,
    Male,
    Female,
}

impl Gender {
    /// Parse a stored gender value. Accepts the variant name (any case) or
    /// its numeric value (0 = Unknown, 1 = Male, 2 = Female).
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        match value.to_ascii_lowercase().as_str() {
            "unknown" | "0" => Some(Gender::Unknown),
            "male" | "1" => Some(Gender::Male),
            "female" | "2" => Some(Gender::Female),
            _ => None,
        }
    }

    pub fn as_number(&self) -> u8 {
        match self {
            Gender::Unknown => 0,
            Gender::Male => 1,
            Gender::Female => 2,
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Gender::Unknown => write!(f, "Unknown"),
            Gender::Male => write!(f, "Male"),
            Gender::Female => write!(f, "Female"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub id: i64,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "nickName", default)]
    pub nick_name: Option<String>,
    #[serde(rename = "middleName", default)]
    pub middle_name: Option<String>,
    #[serde(rename = "lastName")]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "birthDate", default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(rename = "anniversaryDate", default)]
    pub anniversary_date: Option<NaiveDate>,
    #[serde(rename = "graduationYear", default)]
    pub graduation_year: Option<i32>,
    #[serde(default)]
    pub gender: Gender,
    #[serde(rename = "maritalStatusValueId", default)]
    pub marital_status_value_id: Option<i64>,
}

impl Person {
    /// Preferred name: the nick name when set, otherwise the legal first name.
    pub fn preferred_name(&self) -> &str {
        self.nick_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.first_name)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.preferred_name(), self.last_name)
    }

    pub fn full_name_reversed(&self) -> String {
        format!("{}, {}", self.last_name, self.preferred_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PhoneKind {
    Mobile,
    Home,
    Work,
}

impl std::fmt::Display for PhoneKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhoneKind::Mobile => write!(f, "Mobile"),
            PhoneKind::Home => write!(f, "Home"),
            PhoneKind::Work => write!(f, "Work"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoneNumber {
    #[serde(rename = "personId")]
    pub person_id: i64,
    /// Digits only.
    pub number: String,
    pub kind: PhoneKind,
    #[serde(rename = "isUnlisted", default)]
    pub is_unlisted: bool,
}

impl PhoneNumber {
    pub fn formatted(&self) -> String {
        format_phone(&self.number)
    }

    /// Text shown in a grid cell
    pub fn display(&self) -> String {
        if self.is_unlisted {
            "Unlisted".to_string()
        } else {
            self.formatted()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "personId")]
    pub person_id: i64,
    pub street1: Option<String>,
    #[serde(default)]
    pub street2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    #[serde(rename = "postalCode")]
    pub postal_code: Option<String>,
}

impl Location {
    pub fn formatted(&self) -> Option<String> {
        let street1 = self.street1.as_deref().unwrap_or("").trim();
        let street2 = self.street2.as_deref().unwrap_or("").trim();
        let city = self.city.as_deref().unwrap_or("");
        let state = self.state.as_deref().unwrap_or("");
        let zip = self.postal_code.as_deref().unwrap_or("");

        if street1.is_empty() && city.is_empty() {
            return None;
        }

        let street = if street2.is_empty() {
            street1.to_string()
        } else {
            format!("{} {}", street1, street2)
        };
        Some(format!("{}, {}, {} {}", street, city, state, zip).trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(first: &str, nick: Option<&str>) -> Person {
        Person {
            id: 1,
            first_name: first.to_string(),
            nick_name: nick.map(String::from),
            middle_name: None,
            last_name: "Doe".to_string(),
            email: None,
            birth_date: None,
            anniversary_date: None,
            graduation_year: None,
            gender: Gender::Unknown,
            marital_status_value_id: None,
        }
    }

    #[test]
    fn test_preferred_name() {
        assert_eq!(person("Jonathan", Some("Jon")).preferred_name(), "Jon");
        assert_eq!(person("Jonathan", Some("")).preferred_name(), "Jonathan");
        assert_eq!(person("Jonathan", None).full_name_reversed(), "Doe, Jonathan");
    }

    #[test]
    fn test_gender_parse() {
        assert_eq!(Gender::parse("Female"), Some(Gender::Female));
        assert_eq!(Gender::parse("1"), Some(Gender::Male));
        assert_eq!(Gender::parse(""), None);
    }

    #[test]
    fn test_phone_display() {
        let mut phone = PhoneNumber {
            person_id: 1,
            number: "5551234567".to_string(),
            kind: PhoneKind::Mobile,
            is_unlisted: false,
        };
        assert_eq!(phone.display(), "(555) 123-4567");
        phone.is_unlisted = true;
        assert_eq!(phone.display(), "Unlisted");
    }

    #[test]
    fn test_location_formatted() {
        let loc = Location {
            person_id: 1,
            street1: Some("12 Main St".to_string()),
            street2: Some("Apt 4".to_string()),
            city: Some("Springfield".to_string()),
            state: Some("IL".to_string()),
            postal_code: Some("62701".to_string()),
        };
        assert_eq!(loc.formatted().as_deref(), Some("12 Main St Apt 4, Springfield, IL 62701"));

        let empty = Location {
            person_id: 1,
            street1: None,
            street2: None,
            city: None,
            state: Some("IL".to_string()),
            postal_code: None,
        };
        assert!(empty.formatted().is_none());
    }
}
