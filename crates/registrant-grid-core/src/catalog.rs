//! Field catalog: the grid-visible fields of a registration template.
//!
//! The catalog is rebuilt on every bind from the template's form
//! definitions. It drives both the predicate composer (which filters apply)
//! and the enrichment batcher (which lookups to issue).

use tracing::debug;

use crate::models::{
    AttributeDefinition, AttributeEntity, FieldSource, FormFieldDefinition, PersonField,
    RegistrationTemplate,
};
use crate::store::RegistrationData;

/// What a catalog entry points at.
///
/// A builtin entry always has `FieldSource::PersonField`; an attribute entry
/// always has one of the three attribute sources.
#[derive(Debug, Clone)]
pub enum FormFieldKind {
    Builtin(PersonField),
    Attribute(AttributeDefinition),
}

/// One grid-visible field.
#[derive(Debug, Clone)]
pub struct FormField {
    pub id: i64,
    pub source: FieldSource,
    pub kind: FormFieldKind,
    pub order: i32,
}

impl FormField {
    pub fn builtin(&self) -> Option<PersonField> {
        match &self.kind {
            FormFieldKind::Builtin(field) => Some(*field),
            FormFieldKind::Attribute(_) => None,
        }
    }

    pub fn attribute(&self) -> Option<&AttributeDefinition> {
        match &self.kind {
            FormFieldKind::Builtin(_) => None,
            FormFieldKind::Attribute(attribute) => Some(attribute),
        }
    }

    /// Column header text.
    pub fn label(&self) -> &str {
        match &self.kind {
            FormFieldKind::Builtin(field) => field.label(),
            FormFieldKind::Attribute(attribute) => &attribute.name,
        }
    }
}

/// Ordered list of grid-visible fields.
#[derive(Debug, Clone, Default)]
pub struct FieldCatalog {
    fields: Vec<FormField>,
}

impl FieldCatalog {
    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FormField> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn has_builtin(&self, kind: PersonField) -> bool {
        self.fields.iter().any(|f| f.builtin() == Some(kind))
    }

    /// All attribute definitions in the catalog, in catalog order.
    pub fn attributes(&self) -> impl Iterator<Item = &AttributeDefinition> {
        self.fields.iter().filter_map(FormField::attribute)
    }

    /// Ids of catalog attributes stored on `entity`.
    pub fn attribute_ids(&self, entity: AttributeEntity) -> Vec<i64> {
        self.fields
            .iter()
            .filter(|f| f.source.attribute_entity() == Some(entity))
            .filter_map(|f| f.attribute().map(|a| a.id))
            .collect()
    }

    /// Catalog attribute with the given key, if any.
    pub fn attribute_by_key(&self, key: &str) -> Option<&AttributeDefinition> {
        self.attributes().find(|a| a.key == key)
    }
}

impl<'a> IntoIterator for &'a FieldCatalog {
    type Item = &'a FormField;
    type IntoIter = std::slice::Iter<'a, FormField>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// Build the catalog for `template`.
///
/// Fields not shown on the grid are dropped, as are first and last name
/// (the caller always renders those). Attribute fields whose definition
/// cannot be found are skipped.
pub fn build_catalog(template: &RegistrationTemplate, data: &dyn RegistrationData) -> FieldCatalog {
    let mut fields: Vec<FormField> = template
        .forms
        .iter()
        .flat_map(|form| form.fields.iter())
        .filter(|def| def.show_on_grid)
        .filter_map(|def| resolve_field(def, data))
        .collect();

    // Vec::sort_by_key is stable, so ties keep declaration order
    fields.sort_by_key(|f| f.order);

    debug!(template_id = template.id, fields = fields.len(), "Built field catalog");
    FieldCatalog { fields }
}

fn resolve_field(def: &FormFieldDefinition, data: &dyn RegistrationData) -> Option<FormField> {
    let kind = match def.source {
        FieldSource::PersonField => match def.person_field {
            Some(PersonField::FirstName) | Some(PersonField::LastName) => return None,
            Some(field) => FormFieldKind::Builtin(field),
            None => {
                debug!(field_id = def.id, "Person field without a field kind, skipping");
                return None;
            }
        },
        source => {
            let Some(attribute_id) = def.attribute_id else {
                debug!(field_id = def.id, "Attribute field without an attribute id, skipping");
                return None;
            };
            let Some(attribute) = data.attribute(attribute_id) else {
                debug!(field_id = def.id, attribute_id, "Attribute not found, skipping field");
                return None;
            };
            if source.attribute_entity() != Some(attribute.entity) {
                debug!(
                    field_id = def.id,
                    attribute_id,
                    "Attribute entity does not match field source, skipping"
                );
                return None;
            }
            FormFieldKind::Attribute(attribute.clone())
        }
    };

    Some(FormField {
        id: def.id,
        source: def.source,
        kind,
        order: def.order,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttributeFieldType, RegistrationForm};
    use crate::store::Snapshot;

    fn person_field(id: i64, field: PersonField, order: i32, show: bool) -> FormFieldDefinition {
        FormFieldDefinition {
            id,
            source: FieldSource::PersonField,
            person_field: Some(field),
            attribute_id: None,
            order,
            show_on_grid: show,
        }
    }

    fn attribute_field(id: i64, source: FieldSource, attribute_id: i64, order: i32) -> FormFieldDefinition {
        FormFieldDefinition {
            id,
            source,
            person_field: None,
            attribute_id: Some(attribute_id),
            order,
            show_on_grid: true,
        }
    }

    fn attribute(id: i64, key: &str, entity: AttributeEntity) -> AttributeDefinition {
        AttributeDefinition {
            id,
            key: key.to_string(),
            name: key.to_string(),
            field_type: AttributeFieldType::Text,
            entity,
            qualifier_group_id: None,
            default_value: None,
        }
    }

    fn template(forms: Vec<Vec<FormFieldDefinition>>) -> RegistrationTemplate {
        RegistrationTemplate {
            id: 1,
            name: "Camp".to_string(),
            forms: forms
                .into_iter()
                .enumerate()
                .map(|(i, fields)| RegistrationForm {
                    id: i as i64 + 1,
                    name: format!("Form {}", i + 1),
                    fields,
                })
                .collect(),
        }
    }

    #[test]
    fn test_excludes_hidden_and_name_fields() {
        let data = Snapshot::default();
        let tpl = template(vec![vec![
            person_field(1, PersonField::FirstName, 0, true),
            person_field(2, PersonField::LastName, 1, true),
            person_field(3, PersonField::Email, 2, true),
            person_field(4, PersonField::Gender, 3, false),
        ]]);
        let catalog = build_catalog(&tpl, &data);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.fields()[0].builtin(), Some(PersonField::Email));
    }

    #[test]
    fn test_orders_by_display_order_and_keeps_ties_stable() {
        let data = Snapshot::default();
        let tpl = template(vec![
            vec![
                person_field(1, PersonField::Grade, 5, true),
                person_field(2, PersonField::Email, 1, true),
            ],
            vec![
                person_field(3, PersonField::Campus, 1, true),
                person_field(4, PersonField::Gender, 0, true),
            ],
        ]);
        let ids: Vec<i64> = build_catalog(&tpl, &data).iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![4, 2, 3, 1]);
    }

    #[test]
    fn test_unresolved_attribute_is_skipped() {
        let data = Snapshot {
            attributes: vec![attribute(10, "ShirtSize", AttributeEntity::Registrant)],
            ..Default::default()
        };
        let tpl = template(vec![vec![
            attribute_field(1, FieldSource::RegistrantAttribute, 10, 0),
            attribute_field(2, FieldSource::PersonAttribute, 99, 1),
            // Wrong entity for the source
            attribute_field(3, FieldSource::PersonAttribute, 10, 2),
        ]]);
        let catalog = build_catalog(&tpl, &data);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.attribute_ids(AttributeEntity::Registrant), vec![10]);
        assert!(catalog.attribute_ids(AttributeEntity::Person).is_empty());
        assert_eq!(catalog.attribute_by_key("ShirtSize").map(|a| a.id), Some(10));
    }

    #[test]
    fn test_has_builtin() {
        let data = Snapshot::default();
        let tpl = template(vec![vec![person_field(1, PersonField::Address, 0, true)]]);
        let catalog = build_catalog(&tpl, &data);
        assert!(catalog.has_builtin(PersonField::Address));
        assert!(!catalog.has_builtin(PersonField::Campus));
        assert_eq!(catalog.fields()[0].label(), "Address");
    }
}
