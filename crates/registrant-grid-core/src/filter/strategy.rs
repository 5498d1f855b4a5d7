//! Filter strategy table.
//!
//! One record per filterable person field, registered once. The composer,
//! the filter bar and the summary formatter all dispatch through it.

use std::sync::OnceLock;

use super::compose::ComposeContext;
use super::predicate::{DateColumn, RegistrantPredicate, TextColumn, TextMatch};
use super::values::{DateRange, FilterKey, FilterValues, UpperBound};
use crate::models::{Gender, PersonField, PhoneKind};
use crate::store::RegistrationData;
use crate::utils::{digits_only, format_grade};

/// How one person field is filtered, stored and summarized.
pub struct FilterStrategy {
    pub field: PersonField,
    /// Preference key suffix, after `<template>-<view>-`.
    pub preference_key: &'static str,
    /// Label shown in the applied-filter summary.
    pub preference_name: &'static str,
    /// Predicate for a non-blank input. `None` when the input is unusable.
    pub build: fn(&str, &ComposeContext<'_>) -> Option<RegistrantPredicate>,
    /// Normalize an input for storage. Blank means "delete the preference".
    pub save: fn(&str) -> String,
    /// Reset the field's input.
    pub clear: fn(&mut FilterValues, PersonField),
    /// Render a stored value for the applied-filter summary.
    pub display: fn(&str, &dyn RegistrationData) -> String,
}

impl std::fmt::Debug for FilterStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterStrategy")
            .field("field", &self.field)
            .field("preference_key", &self.preference_key)
            .finish()
    }
}

static STRATEGIES: OnceLock<Vec<FilterStrategy>> = OnceLock::new();

/// Every registered strategy.
pub fn strategies() -> &'static [FilterStrategy] {
    STRATEGIES.get_or_init(register)
}

/// Strategy for `field`. Display-only fields (address) have none.
pub fn strategy(field: PersonField) -> Option<&'static FilterStrategy> {
    strategies().iter().find(|s| s.field == field)
}

/// Strategy whose preference key is `key`.
pub fn strategy_for_key(key: &str) -> Option<&'static FilterStrategy> {
    strategies().iter().find(|s| s.preference_key == key)
}

fn register() -> Vec<FilterStrategy> {
    vec![
        FilterStrategy {
            field: PersonField::FirstName,
            preference_key: "First Name",
            preference_name: "First Name",
            build: |v, _| Some(text(TextColumn::FirstOrNickName, TextMatch::StartsWith, v)),
            save: save_text,
            clear: clear_value,
            display: display_text,
        },
        FilterStrategy {
            field: PersonField::LastName,
            preference_key: "Last Name",
            preference_name: "Last Name",
            build: |v, _| Some(text(TextColumn::LastName, TextMatch::StartsWith, v)),
            save: save_text,
            clear: clear_value,
            display: display_text,
        },
        FilterStrategy {
            field: PersonField::Campus,
            preference_key: "Home Campus",
            preference_name: "Home Campus",
            build: build_campus,
            save: save_id,
            clear: clear_value,
            display: display_campus,
        },
        FilterStrategy {
            field: PersonField::Email,
            preference_key: "Email",
            preference_name: "Email",
            build: |v, _| Some(text(TextColumn::Email, TextMatch::Contains, v)),
            save: save_text,
            clear: clear_value,
            display: display_text,
        },
        FilterStrategy {
            field: PersonField::MiddleName,
            preference_key: "MiddleName",
            preference_name: "MiddleName",
            build: |v, _| Some(text(TextColumn::MiddleName, TextMatch::Contains, v)),
            save: save_text,
            clear: clear_value,
            display: display_text,
        },
        FilterStrategy {
            field: PersonField::Birthdate,
            preference_key: "Birthdate Range",
            preference_name: "Birthdate Range",
            build: |v, _| date_range(DateColumn::BirthDate, v),
            save: save_date_range,
            clear: clear_value,
            display: display_date_range,
        },
        FilterStrategy {
            field: PersonField::AnniversaryDate,
            preference_key: "AnniversaryDate Range",
            preference_name: "AnniversaryDate Range",
            build: |v, _| date_range(DateColumn::AnniversaryDate, v),
            save: save_date_range,
            clear: clear_value,
            display: display_date_range,
        },
        FilterStrategy {
            field: PersonField::Grade,
            preference_key: "Grade",
            preference_name: "Grade",
            build: build_grade,
            save: save_grade,
            clear: clear_value,
            display: |v, _| v.trim().parse().ok().and_then(format_grade).unwrap_or_default(),
        },
        FilterStrategy {
            field: PersonField::Gender,
            preference_key: "Gender",
            preference_name: "Gender",
            build: |v, _| Gender::parse(v).map(RegistrantPredicate::Gender),
            save: |v| Gender::parse(v).map(|g| g.as_number().to_string()).unwrap_or_default(),
            clear: clear_value,
            display: |v, _| Gender::parse(v).map(|g| g.to_string()).unwrap_or_default(),
        },
        FilterStrategy {
            field: PersonField::MaritalStatus,
            preference_key: "Marital Status",
            preference_name: "Marital Status",
            build: |v, _| v.trim().parse().ok().map(RegistrantPredicate::MaritalStatus),
            save: save_id,
            clear: clear_value,
            display: display_marital_status,
        },
        FilterStrategy {
            field: PersonField::MobilePhone,
            preference_key: "Phone",
            preference_name: "Cell Phone",
            build: |v, ctx| phone(PhoneKind::Mobile, v, ctx),
            save: save_text,
            clear: clear_value,
            display: display_text,
        },
        FilterStrategy {
            field: PersonField::HomePhone,
            preference_key: "HomePhone",
            preference_name: "Home Phone",
            build: |v, ctx| phone(PhoneKind::Home, v, ctx),
            save: save_text,
            clear: clear_value,
            display: display_text,
        },
    ]
}

// ===== Predicate builders =====

fn text(column: TextColumn, mode: TextMatch, value: &str) -> RegistrantPredicate {
    RegistrantPredicate::Text {
        column,
        mode,
        needle: value.trim().to_string(),
    }
}

/// Person date ranges include both ends in every view.
fn date_range(column: DateColumn, value: &str) -> Option<RegistrantPredicate> {
    let range = DateRange::parse(value);
    if range.is_empty() {
        return None;
    }
    Some(RegistrantPredicate::DateRange {
        column,
        range,
        upper_bound: UpperBound::Inclusive,
    })
}

fn build_campus(value: &str, ctx: &ComposeContext<'_>) -> Option<RegistrantPredicate> {
    let campus_id: i64 = value.trim().parse().ok()?;
    Some(RegistrantPredicate::FamilyCampus {
        campus_id,
        person_ids: ctx.data.person_ids_in_family_campus(campus_id),
    })
}

fn build_grade(value: &str, ctx: &ComposeContext<'_>) -> Option<RegistrantPredicate> {
    let offset: i32 = value.trim().parse().ok()?;
    let year = ctx.graduation.graduation_year_from_offset(offset, ctx.as_of)?;
    Some(RegistrantPredicate::GraduationYear(year))
}

fn phone(kind: PhoneKind, value: &str, ctx: &ComposeContext<'_>) -> Option<RegistrantPredicate> {
    let digits = digits_only(value);
    if digits.is_empty() {
        return None;
    }
    let person_ids = ctx.data.person_ids_with_phone(&digits, kind);
    Some(RegistrantPredicate::Phone {
        kind,
        digits,
        person_ids,
    })
}

// ===== Save formatters =====

fn save_text(value: &str) -> String {
    value.trim().to_string()
}

fn save_id(value: &str) -> String {
    value
        .trim()
        .parse::<i64>()
        .map(|id| id.to_string())
        .unwrap_or_default()
}

/// Only offsets that name a grade are kept.
fn save_grade(value: &str) -> String {
    value
        .trim()
        .parse::<i32>()
        .ok()
        .filter(|offset| format_grade(*offset).is_some())
        .map(|offset| offset.to_string())
        .unwrap_or_default()
}

fn save_date_range(value: &str) -> String {
    DateRange::parse(value).to_delimited()
}

fn clear_value(values: &mut FilterValues, field: PersonField) {
    values.remove(&FilterKey::Builtin(field));
}

// ===== Display formatters =====

fn display_text(value: &str, _: &dyn RegistrationData) -> String {
    value.to_string()
}

fn display_date_range(value: &str, _: &dyn RegistrationData) -> String {
    DateRange::parse(value).summary()
}

fn display_campus(value: &str, data: &dyn RegistrationData) -> String {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|id| data.campus(id))
        .map(|c| c.name.clone())
        .unwrap_or_default()
}

fn display_marital_status(value: &str, data: &dyn RegistrationData) -> String {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|id| data.defined_value(id))
        .map(|dv| dv.value.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Campus;
    use crate::store::Snapshot;

    #[test]
    fn test_every_filterable_field_registered_once() {
        for field in [
            PersonField::FirstName,
            PersonField::LastName,
            PersonField::Campus,
            PersonField::Email,
            PersonField::MiddleName,
            PersonField::Birthdate,
            PersonField::AnniversaryDate,
            PersonField::Grade,
            PersonField::Gender,
            PersonField::MaritalStatus,
            PersonField::MobilePhone,
            PersonField::HomePhone,
        ] {
            assert_eq!(strategies().iter().filter(|s| s.field == field).count(), 1, "{:?}", field);
        }
        assert!(strategy(PersonField::Address).is_none());
    }

    #[test]
    fn test_lookup_by_preference_key() {
        assert_eq!(strategy_for_key("Phone").map(|s| s.field), Some(PersonField::MobilePhone));
        assert_eq!(strategy_for_key("Phone").map(|s| s.preference_name), Some("Cell Phone"));
        assert!(strategy_for_key("Nope").is_none());
    }

    #[test]
    fn test_save_formatters() {
        let gender = strategy(PersonField::Gender).unwrap();
        assert_eq!((gender.save)("Female"), "2");
        assert_eq!((gender.save)("bogus"), "");

        let grade = strategy(PersonField::Grade).unwrap();
        assert_eq!((grade.save)(" 4 "), "4");
        assert_eq!((grade.save)("x"), "");
        assert_eq!((grade.save)("2147483647"), "");
        assert_eq!((grade.save)("13"), "");

        let birth = strategy(PersonField::Birthdate).unwrap();
        assert_eq!((birth.save)("2010-01-01T00:00:00,"), "2010-01-01,");
    }

    #[test]
    fn test_display_formatters() {
        let data = Snapshot {
            campuses: vec![Campus { id: 3, name: "North".to_string() }],
            ..Default::default()
        };
        let campus = strategy(PersonField::Campus).unwrap();
        assert_eq!((campus.display)("3", &data), "North");
        assert_eq!((campus.display)("9", &data), "");

        let grade = strategy(PersonField::Grade).unwrap();
        assert_eq!((grade.display)("0", &data), "12th Grade");

        let gender = strategy(PersonField::Gender).unwrap();
        assert_eq!((gender.display)("1", &data), "Male");
    }

    #[test]
    fn test_clear_removes_input() {
        let mut values = FilterValues::new().with(FilterKey::Builtin(PersonField::Email), "jane@");
        let email = strategy(PersonField::Email).unwrap();
        (email.clear)(&mut values, email.field);
        assert!(values.builtin(PersonField::Email).is_none());
    }
}
