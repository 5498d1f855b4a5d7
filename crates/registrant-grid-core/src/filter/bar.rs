//! Filter bar state: loading, saving and summarizing stored filters.

use anyhow::Result;
use tracing::debug;

use super::attribute::{parse_stored_values, to_stored_values, AttributeFieldFilter};
use super::strategy::{strategy, strategy_for_key};
use super::values::{DateRange, FilterKey, FilterValues};
use crate::catalog::FieldCatalog;
use crate::models::PersonField;
use crate::prefs::PreferenceStore;
use crate::store::RegistrationData;

/// Preference key of the record creation range.
pub const CREATED_RANGE_KEY: &str = "Date Range";

/// Filter preferences of one view of one registration template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterBar {
    template_id: i64,
    view_prefix: &'static str,
}

/// One line of the applied-filter summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSummary {
    pub name: String,
    pub value: String,
}

impl FilterBar {
    pub fn new(template_id: i64, view_prefix: &'static str) -> Self {
        Self {
            template_id,
            view_prefix,
        }
    }

    /// `<template id>-<view>-`
    pub fn scope(&self) -> String {
        format!("{}-{}-", self.template_id, self.view_prefix)
    }

    pub fn preference_key(&self, name: &str) -> String {
        format!("{}{}", self.scope(), name)
    }

    /// Keys this bar reads and writes for `catalog`.
    fn keys(&self, catalog: &FieldCatalog) -> Vec<(FilterKey, String)> {
        let mut keys = vec![(FilterKey::CreatedRange, CREATED_RANGE_KEY.to_string())];
        for field in [PersonField::FirstName, PersonField::LastName] {
            if let Some(s) = strategy(field) {
                keys.push((FilterKey::Builtin(field), s.preference_key.to_string()));
            }
        }
        for form_field in catalog {
            if let Some(field) = form_field.builtin() {
                if let Some(s) = strategy(field) {
                    keys.push((FilterKey::Builtin(field), s.preference_key.to_string()));
                }
            } else if let Some(attribute) = form_field.attribute() {
                keys.push((FilterKey::Attribute(attribute.key.clone()), attribute.key.clone()));
            }
        }
        keys
    }

    /// Stored inputs for the filters `catalog` exposes.
    pub fn load(&self, store: &dyn PreferenceStore, catalog: &FieldCatalog) -> FilterValues {
        let mut values = FilterValues::new();
        for (key, name) in self.keys(catalog) {
            if let Some(stored) = store.get(&self.preference_key(&name)) {
                values.set(key, stored);
            }
        }
        values
    }

    /// Save `values`: each non-blank input through its save formatter, blank
    /// ones deleted.
    pub fn apply(
        &self,
        store: &mut dyn PreferenceStore,
        catalog: &FieldCatalog,
        values: &FilterValues,
    ) -> Result<()> {
        for (key, name) in self.keys(catalog) {
            let raw = values.get(&key).unwrap_or("");
            let normalized = match &key {
                FilterKey::CreatedRange => DateRange::parse(raw).to_delimited(),
                FilterKey::Builtin(field) => strategy(*field)
                    .map(|s| (s.save)(raw))
                    .unwrap_or_default(),
                FilterKey::Attribute(_) => parse_stored_values(raw)
                    .filter(|v| v.iter().any(|s| !s.trim().is_empty()))
                    .map(|v| to_stored_values(&v))
                    .unwrap_or_default(),
            };

            let pref_key = self.preference_key(&name);
            if normalized.is_empty() {
                store.delete(&pref_key)?;
            } else {
                store.set(&pref_key, &normalized)?;
            }
        }
        debug!(scope = %self.scope(), "Applied filters");
        Ok(())
    }

    /// Remove every stored filter for this view and reset `values`.
    pub fn clear(&self, store: &mut dyn PreferenceStore, values: &mut FilterValues) -> Result<()> {
        store.delete_prefix(&self.scope())?;

        let keys: Vec<FilterKey> = values.iter().map(|(k, _)| k.clone()).collect();
        for key in keys {
            match key {
                FilterKey::Builtin(field) => match strategy(field) {
                    Some(s) => (s.clear)(values, field),
                    None => values.remove(&key),
                },
                other => values.remove(&other),
            }
        }
        debug!(scope = %self.scope(), "Cleared filters");
        Ok(())
    }

    /// Applied-filter summary, one entry per stored non-blank filter.
    pub fn summary(
        &self,
        store: &dyn PreferenceStore,
        catalog: &FieldCatalog,
        data: &dyn RegistrationData,
        attribute_filter: &dyn AttributeFieldFilter,
    ) -> Vec<FilterSummary> {
        let scope = self.scope();
        store
            .entries(&scope)
            .into_iter()
            .filter_map(|(key, stored)| {
                let name = key.strip_prefix(&scope)?.to_string();
                let value = format_filter_value(&name, &stored, catalog, data, attribute_filter);
                if value.is_empty() {
                    return None;
                }
                let label = catalog
                    .attribute_by_key(&name)
                    .map(|a| a.name.clone())
                    .or_else(|| strategy_for_key(&name).map(|s| s.preference_name.to_string()))
                    .unwrap_or(name);
                Some(FilterSummary { name: label, value })
            })
            .collect()
    }
}

/// Display text for a stored filter value.
///
/// `name` is the preference key without its scope. Attribute filters are
/// tried first; unknown names render empty.
pub fn format_filter_value(
    name: &str,
    stored: &str,
    catalog: &FieldCatalog,
    data: &dyn RegistrationData,
    attribute_filter: &dyn AttributeFieldFilter,
) -> String {
    if let Some(attribute) = catalog.attribute_by_key(name) {
        if let Some(values) = parse_stored_values(stored) {
            return attribute_filter.format(attribute, &values);
        }
    }

    if name == CREATED_RANGE_KEY {
        return DateRange::parse(stored).summary();
    }

    match strategy_for_key(name) {
        Some(s) => (s.display)(stored, data),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::build_catalog;
    use crate::filter::attribute::DefaultAttributeFilter;
    use crate::models::{
        AttributeDefinition, AttributeEntity, AttributeFieldType, Campus, FieldSource,
        FormFieldDefinition, RegistrationForm, RegistrationTemplate,
    };
    use crate::prefs::MemoryPreferenceStore;
    use crate::store::Snapshot;

    fn data() -> Snapshot {
        Snapshot {
            campuses: vec![Campus { id: 2, name: "Main".into() }],
            attributes: vec![AttributeDefinition {
                id: 40,
                key: "Allergy".into(),
                name: "Allergies".into(),
                field_type: AttributeFieldType::Text,
                entity: AttributeEntity::Person,
                qualifier_group_id: None,
                default_value: None,
            }],
            ..Default::default()
        }
    }

    fn catalog(data: &Snapshot) -> FieldCatalog {
        let def = |id, source, person_field, attribute_id| FormFieldDefinition {
            id,
            source,
            person_field,
            attribute_id,
            order: id as i32,
            show_on_grid: true,
        };
        let template = RegistrationTemplate {
            id: 9,
            name: "Camp".into(),
            forms: vec![RegistrationForm {
                id: 1,
                name: "Main".into(),
                fields: vec![
                    def(1, FieldSource::PersonField, Some(PersonField::Campus), None),
                    def(2, FieldSource::PersonField, Some(PersonField::Gender), None),
                    def(3, FieldSource::PersonAttribute, None, Some(40)),
                ],
            }],
        };
        build_catalog(&template, data)
    }

    #[test]
    fn test_apply_then_load() {
        let data = data();
        let catalog = catalog(&data);
        let bar = FilterBar::new(9, "WL");
        let mut store = MemoryPreferenceStore::new();

        let values = FilterValues::new()
            .with(FilterKey::Builtin(PersonField::Campus), "2")
            .with(FilterKey::Builtin(PersonField::Gender), "Female")
            .with(FilterKey::Builtin(PersonField::LastName), " Doe ")
            .with(FilterKey::Attribute("Allergy".into()), r#"["nuts"]"#)
            // Not in the catalog, never stored
            .with(FilterKey::Builtin(PersonField::Email), "jane@");
        bar.apply(&mut store, &catalog, &values).unwrap();

        assert_eq!(store.get("9-WL-Home Campus").as_deref(), Some("2"));
        assert_eq!(store.get("9-WL-Gender").as_deref(), Some("2"));
        assert_eq!(store.get("9-WL-Last Name").as_deref(), Some("Doe"));
        assert_eq!(store.get("9-WL-Allergy").as_deref(), Some(r#"["nuts"]"#));
        assert_eq!(store.get("9-WL-Email"), None);

        let loaded = bar.load(&store, &catalog);
        assert_eq!(loaded.builtin(PersonField::Gender), Some("2"));
        assert_eq!(loaded.get(&FilterKey::Attribute("Allergy".into())), Some(r#"["nuts"]"#));

        // Blank input deletes the stored value
        let values = FilterValues::new().with(FilterKey::Builtin(PersonField::Campus), "");
        bar.apply(&mut store, &catalog, &values).unwrap();
        assert_eq!(store.get("9-WL-Home Campus"), None);
    }

    #[test]
    fn test_clear_only_touches_own_scope() {
        let data = data();
        let catalog = catalog(&data);
        let mut store = MemoryPreferenceStore::new();
        store.set("9-GroupPlacements-Gender", "1").unwrap();

        let bar = FilterBar::new(9, "WL");
        let mut values = FilterValues::new().with(FilterKey::Builtin(PersonField::Gender), "1");
        bar.apply(&mut store, &catalog, &values).unwrap();
        bar.clear(&mut store, &mut values).unwrap();

        assert!(values.is_empty());
        assert_eq!(store.get("9-WL-Gender"), None);
        assert_eq!(store.get("9-GroupPlacements-Gender").as_deref(), Some("1"));
    }

    #[test]
    fn test_format_filter_value() {
        let data = data();
        let catalog = catalog(&data);
        let f = |name: &str, stored: &str| {
            format_filter_value(name, stored, &catalog, &data, &DefaultAttributeFilter)
        };
        assert_eq!(f("Home Campus", "2"), "Main");
        assert_eq!(f("Gender", "2"), "Female");
        assert_eq!(f("Grade", "12"), "Kindergarten");
        assert_eq!(f("Date Range", "2024-01-01,"), "from 1/1/2024");
        assert_eq!(f("Birthdate Range", ",2010-06-30"), "through 6/30/2010");
        assert_eq!(f("Allergy", r#"["nuts"]"#), "Contains 'nuts'");
        assert_eq!(f("Email", "jane@"), "jane@");
        assert_eq!(f("Signed Document", "1"), "");
    }

    #[test]
    fn test_summary_uses_display_names() {
        let data = data();
        let catalog = catalog(&data);
        let bar = FilterBar::new(9, "GroupPlacements");
        let mut store = MemoryPreferenceStore::new();
        store.set("9-GroupPlacements-Phone", "555").unwrap();
        store.set("9-GroupPlacements-Allergy", r#"["nuts"]"#).unwrap();

        let summary = bar.summary(&store, &catalog, &data, &DefaultAttributeFilter);
        assert_eq!(
            summary,
            vec![
                FilterSummary { name: "Allergies".into(), value: "Contains 'nuts'".into() },
                FilterSummary { name: "Cell Phone".into(), value: "555".into() },
            ]
        );
    }
}
