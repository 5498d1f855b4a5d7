//! Row enrichment batcher.
//!
//! Attaches per-row display data to a page of registrants. Every category
//! of data is fetched with one bulk call for the whole page, then indexed by
//! registrant id. Registrants themselves are never modified.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use tracing::debug;

use crate::catalog::FieldCatalog;
use crate::models::{
    AttributeEntity, AttributeValueKey, Gender, Person, PersonField, PhoneKind, Registrant,
};
use crate::store::{AttributeScope, AttributeValueRequest, RegistrationData};
use crate::utils::{format_date, format_grade, GraduationDate};

/// Placeholder replaced by the group id in a group detail URL template.
pub const GROUP_ID_PLACEHOLDER: &str = "{group_id}";

#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// Exports always get addresses and plain-text group names.
    pub exporting: bool,
    /// e.g. `/page/113?GroupId={group_id}`. Empty renders plain names.
    pub group_url_template: String,
    pub wait_list_positions: bool,
    pub as_of: NaiveDate,
    pub graduation: GraduationDate,
}

/// Display data for one registrant row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentRow {
    pub registrant_id: i64,
    /// "Last, Nick", blank without a person.
    pub person_name: String,
    pub values: BTreeMap<PersonField, String>,
    pub attributes: BTreeMap<AttributeValueKey, String>,
    /// Group label or link for the registrant's group membership.
    pub group: Option<String>,
    /// 1-based position among the instance's wait-listed registrants.
    pub wait_list_position: Option<usize>,
}

impl EnrichmentRow {
    fn blank(registrant_id: i64) -> Self {
        Self {
            registrant_id,
            ..Default::default()
        }
    }

    pub fn value(&self, field: PersonField) -> &str {
        self.values.get(&field).map(String::as_str).unwrap_or("")
    }

    pub fn attribute(&self, key: &AttributeValueKey) -> &str {
        self.attributes.get(key).map(String::as_str).unwrap_or("")
    }
}

/// Enrichment for one page, keyed by registrant id.
#[derive(Debug, Clone, Default)]
pub struct Enrichment {
    rows: HashMap<i64, EnrichmentRow>,
}

impl Enrichment {
    pub fn get(&self, registrant_id: i64) -> Option<&EnrichmentRow> {
        self.rows.get(&registrant_id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Distinct ids referenced by a page, collected once.
struct PageIds {
    registrants: Vec<i64>,
    people: Vec<i64>,
    group_members: Vec<i64>,
    instances: Vec<i64>,
}

impl PageIds {
    fn collect(rows: &[&Registrant]) -> Self {
        let distinct = |ids: BTreeSet<i64>| ids.into_iter().collect::<Vec<_>>();
        Self {
            registrants: distinct(rows.iter().map(|r| r.id).collect()),
            people: distinct(rows.iter().filter_map(|r| r.person_id).collect()),
            group_members: distinct(rows.iter().filter_map(|r| r.group_member_id).collect()),
            instances: distinct(rows.iter().map(|r| r.instance_id).collect()),
        }
    }
}

pub fn enrich(
    data: &dyn RegistrationData,
    rows: &[&Registrant],
    catalog: &FieldCatalog,
    options: &EnrichOptions,
) -> Enrichment {
    let ids = PageIds::collect(rows);

    // ===== Bulk lookups =====

    let addresses = if options.exporting || catalog.has_builtin(PersonField::Address) {
        data.home_addresses(&ids.people)
    } else {
        HashMap::new()
    };
    let mobile_phones = if catalog.has_builtin(PersonField::MobilePhone) {
        data.phone_numbers(&ids.people, PhoneKind::Mobile)
    } else {
        HashMap::new()
    };
    let home_phones = if catalog.has_builtin(PersonField::HomePhone) {
        data.phone_numbers(&ids.people, PhoneKind::Home)
    } else {
        HashMap::new()
    };
    let campuses = if catalog.has_builtin(PersonField::Campus) {
        data.family_campus_ids(&ids.people)
    } else {
        HashMap::new()
    };

    let request = AttributeValueRequest {
        person: AttributeScope {
            attribute_ids: catalog.attribute_ids(AttributeEntity::Person),
            entity_ids: ids.people.clone(),
        },
        registrant: AttributeScope {
            attribute_ids: catalog.attribute_ids(AttributeEntity::Registrant),
            entity_ids: ids.registrants.clone(),
        },
        group_member: AttributeScope {
            attribute_ids: catalog.attribute_ids(AttributeEntity::GroupMember),
            entity_ids: ids.group_members.clone(),
        },
    };
    let attribute_values: HashMap<(i64, i64), &str> = if request.is_empty() {
        HashMap::new()
    } else {
        data.attribute_values(&request)
            .into_iter()
            .map(|v| ((v.attribute_id, v.entity_id), v.value.as_str()))
            .collect()
    };

    let group_links = group_links(data, &ids.group_members, options);
    let positions = if options.wait_list_positions {
        wait_list_positions(data, &ids.instances)
    } else {
        HashMap::new()
    };

    debug!(
        rows = rows.len(),
        people = ids.people.len(),
        addresses = addresses.len(),
        attribute_values = attribute_values.len(),
        groups = group_links.len(),
        "Enriching page"
    );

    // ===== Rows =====

    let mut enriched = HashMap::with_capacity(rows.len());
    for registrant in rows {
        let mut row = EnrichmentRow::blank(registrant.id);
        let person = registrant.person_id.and_then(|id| data.person(id));

        if let Some(person) = person {
            row.person_name = person.full_name_reversed();
            for form_field in catalog {
                let Some(field) = form_field.builtin() else {
                    continue;
                };
                let value = match field {
                    PersonField::Address => addresses
                        .get(&person.id)
                        .and_then(|l| l.formatted())
                        .unwrap_or_default(),
                    PersonField::MobilePhone => mobile_phones
                        .get(&person.id)
                        .map(|p| p.display())
                        .unwrap_or_default(),
                    PersonField::HomePhone => home_phones
                        .get(&person.id)
                        .map(|p| p.display())
                        .unwrap_or_default(),
                    PersonField::Campus => campuses
                        .get(&person.id)
                        .map(|ids| {
                            ids.iter()
                                .filter_map(|id| data.campus(*id))
                                .map(|c| c.name.as_str())
                                .collect::<Vec<_>>()
                                .join(", ")
                        })
                        .unwrap_or_default(),
                    PersonField::MaritalStatus => person
                        .marital_status_value_id
                        .and_then(|id| data.defined_value(id))
                        .map(|dv| dv.value.clone())
                        .unwrap_or_default(),
                    other => person_value(person, other, options),
                };
                row.values.insert(field, value);
            }
            // Exports always carry the home address
            if options.exporting && !row.values.contains_key(&PersonField::Address) {
                let address = addresses
                    .get(&person.id)
                    .and_then(|l| l.formatted())
                    .unwrap_or_default();
                row.values.insert(PersonField::Address, address);
            }
        }

        for form_field in catalog {
            let (Some(attribute), Some(entity)) =
                (form_field.attribute(), form_field.source.attribute_entity())
            else {
                continue;
            };
            let entity_id = match entity {
                AttributeEntity::Registrant => Some(registrant.id),
                AttributeEntity::Person => person.map(|p| p.id),
                AttributeEntity::GroupMember => registrant.group_member_id,
            };
            let Some(entity_id) = entity_id else {
                continue;
            };
            let raw = attribute_values
                .get(&(attribute.id, entity_id))
                .copied()
                .or(attribute.default_value.as_deref());
            if let Some(raw) = raw {
                row.attributes
                    .insert(AttributeValueKey::new(attribute), attribute.field_type.format_value(raw));
            }
        }

        row.group = registrant
            .group_member_id
            .and_then(|id| group_links.get(&id).cloned());
        if registrant.on_wait_list {
            row.wait_list_position = positions.get(&registrant.id).copied();
        }

        enriched.insert(registrant.id, row);
    }

    Enrichment { rows: enriched }
}

/// Builtin values read straight off the person.
fn person_value(person: &Person, field: PersonField, options: &EnrichOptions) -> String {
    match field {
        PersonField::FirstName => person.first_name.clone(),
        PersonField::LastName => person.last_name.clone(),
        PersonField::MiddleName => person.middle_name.clone().unwrap_or_default(),
        PersonField::Email => person.email.clone().unwrap_or_default(),
        PersonField::Birthdate => person.birth_date.map(format_date).unwrap_or_default(),
        PersonField::AnniversaryDate => person.anniversary_date.map(format_date).unwrap_or_default(),
        PersonField::Grade => person
            .graduation_year
            .and_then(|year| options.graduation.offset_from_graduation_year(year, options.as_of))
            .and_then(format_grade)
            .unwrap_or_default(),
        PersonField::Gender => match person.gender {
            Gender::Unknown => String::new(),
            known => known.to_string(),
        },
        // Resolved through bulk lookups
        PersonField::Campus
        | PersonField::Address
        | PersonField::MaritalStatus
        | PersonField::MobilePhone
        | PersonField::HomePhone => String::new(),
    }
}

/// Group label or anchor per group member id.
fn group_links(
    data: &dyn RegistrationData,
    group_member_ids: &[i64],
    options: &EnrichOptions,
) -> HashMap<i64, String> {
    if group_member_ids.is_empty() {
        return HashMap::new();
    }
    let members = data.group_members(group_member_ids);

    let mut labels: HashMap<i64, String> = HashMap::new();
    members
        .iter()
        .filter_map(|(member_id, member)| {
            let link = labels.entry(member.group_id).or_insert_with(|| {
                data.group(member.group_id)
                    .map(|group| {
                        if options.exporting || options.group_url_template.is_empty() {
                            group.name.clone()
                        } else {
                            let url = options
                                .group_url_template
                                .replace(GROUP_ID_PLACEHOLDER, &group.id.to_string());
                            format!("<a href='{}'>{}</a>", url, group.name)
                        }
                    })
                    .unwrap_or_default()
            });
            (!link.is_empty()).then(|| (*member_id, link.clone()))
        })
        .collect()
}

/// Wait-list position by registrant id, ordered by creation time.
/// Registrants with no person take no place in line.
fn wait_list_positions(data: &dyn RegistrationData, instance_ids: &[i64]) -> HashMap<i64, usize> {
    let mut positions = HashMap::new();
    for &instance_id in instance_ids {
        let mut waiting: Vec<&Registrant> = data
            .registrants(instance_id)
            .into_iter()
            .filter(|r| r.on_wait_list && r.person_id.is_some())
            .collect();
        waiting.sort_by_key(|r| (r.created_at, r.id));
        positions.extend(waiting.iter().enumerate().map(|(i, r)| (r.id, i + 1)));
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::build_catalog;
    use crate::models::{
        AttributeDefinition, AttributeFieldType, AttributeValue, Campus, DefinedValue,
        FieldSource, FormFieldDefinition, Group, GroupMember, GroupType, Location, MemberStatus,
        PhoneNumber, RegistrationForm, RegistrationTemplate,
    };
    use crate::store::Snapshot;

    fn options() -> EnrichOptions {
        EnrichOptions {
            exporting: false,
            group_url_template: "/group/{group_id}".to_string(),
            wait_list_positions: true,
            as_of: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            graduation: GraduationDate::default(),
        }
    }

    fn registrant(id: i64, person_id: Option<i64>, group_member_id: Option<i64>) -> Registrant {
        Registrant {
            id,
            registration_id: 1,
            instance_id: 1,
            person_id,
            group_member_id,
            on_wait_list: false,
            created_at: None,
            fees: vec![],
        }
    }

    fn builtin(id: i64, field: PersonField) -> FormFieldDefinition {
        FormFieldDefinition {
            id,
            source: FieldSource::PersonField,
            person_field: Some(field),
            attribute_id: None,
            order: id as i32,
            show_on_grid: true,
        }
    }

    fn attribute_field(id: i64, source: FieldSource, attribute_id: i64) -> FormFieldDefinition {
        FormFieldDefinition {
            id,
            source,
            person_field: None,
            attribute_id: Some(attribute_id),
            order: id as i32,
            show_on_grid: true,
        }
    }

    fn attribute(id: i64, key: &str, entity: AttributeEntity, field_type: AttributeFieldType) -> AttributeDefinition {
        AttributeDefinition {
            id,
            key: key.to_string(),
            name: key.to_string(),
            field_type,
            entity,
            qualifier_group_id: None,
            default_value: None,
        }
    }

    fn snapshot() -> Snapshot {
        Snapshot {
            people: vec![Person {
                id: 1,
                first_name: "Jonathan".into(),
                nick_name: Some("Jon".into()),
                middle_name: Some("Q".into()),
                last_name: "Smith".into(),
                email: Some("jon@x.com".into()),
                birth_date: NaiveDate::from_ymd_opt(2010, 4, 2),
                anniversary_date: None,
                graduation_year: Some(2028),
                gender: Gender::Male,
                marital_status_value_id: Some(7),
            }],
            phone_numbers: vec![
                PhoneNumber { person_id: 1, number: "5551234567".into(), kind: PhoneKind::Mobile, is_unlisted: false },
                PhoneNumber { person_id: 1, number: "5559999999".into(), kind: PhoneKind::Home, is_unlisted: true },
            ],
            home_locations: vec![Location {
                person_id: 1,
                street1: Some("1 Main St".into()),
                street2: None,
                city: Some("Town".into()),
                state: Some("AZ".into()),
                postal_code: Some("85001".into()),
            }],
            campuses: vec![Campus { id: 3, name: "North".into() }],
            defined_values: vec![DefinedValue { id: 7, value: "Single".into() }],
            group_types: vec![
                GroupType { id: 1, name: "Family".into(), is_family: true, default_role_id: None, roles: vec![] },
                GroupType { id: 2, name: "Cabin".into(), is_family: false, default_role_id: None, roles: vec![] },
            ],
            groups: vec![
                Group { id: 50, name: "Smith Family".into(), group_type_id: 1, parent_group_id: None, campus_id: Some(3), is_active: true, capacity: None },
                Group { id: 60, name: "Cabin 4".into(), group_type_id: 2, parent_group_id: None, campus_id: None, is_active: true, capacity: None },
            ],
            group_members: vec![
                GroupMember { id: 500, person_id: 1, group_id: 50, role_id: 1, status: MemberStatus::Active },
                GroupMember { id: 600, person_id: 1, group_id: 60, role_id: 1, status: MemberStatus::Active },
            ],
            attributes: vec![
                attribute(20, "ShirtSize", AttributeEntity::Registrant, AttributeFieldType::Text),
                attribute(21, "Allergy", AttributeEntity::Person, AttributeFieldType::Text),
                attribute(22, "Paid", AttributeEntity::GroupMember, AttributeFieldType::Boolean),
            ],
            attribute_values: vec![
                AttributeValue { attribute_id: 20, entity_id: 10, value: "L".into() },
                AttributeValue { attribute_id: 21, entity_id: 1, value: "Nuts".into() },
                AttributeValue { attribute_id: 22, entity_id: 600, value: "true".into() },
            ],
            registrants: vec![registrant(10, Some(1), Some(600)), registrant(11, None, None)],
            ..Default::default()
        }
    }

    fn full_catalog(data: &Snapshot) -> FieldCatalog {
        let template = RegistrationTemplate {
            id: 1,
            name: "Camp".into(),
            forms: vec![RegistrationForm {
                id: 1,
                name: "Main".into(),
                fields: vec![
                    builtin(1, PersonField::Address),
                    builtin(2, PersonField::MobilePhone),
                    builtin(3, PersonField::HomePhone),
                    builtin(4, PersonField::Campus),
                    builtin(5, PersonField::Grade),
                    builtin(6, PersonField::Birthdate),
                    builtin(7, PersonField::MaritalStatus),
                    builtin(8, PersonField::Gender),
                    attribute_field(9, FieldSource::RegistrantAttribute, 20),
                    attribute_field(10, FieldSource::PersonAttribute, 21),
                    attribute_field(11, FieldSource::GroupMemberAttribute, 22),
                ],
            }],
        };
        build_catalog(&template, data)
    }

    #[test]
    fn test_enrich_full_row() {
        let data = snapshot();
        let catalog = full_catalog(&data);
        let rows = data.registrants(1);
        let enrichment = enrich(&data, &rows, &catalog, &options());

        let row = enrichment.get(10).unwrap();
        assert_eq!(row.person_name, "Smith, Jon");
        assert_eq!(row.value(PersonField::Address), "1 Main St, Town, AZ 85001");
        assert_eq!(row.value(PersonField::MobilePhone), "(555) 123-4567");
        assert_eq!(row.value(PersonField::HomePhone), "Unlisted");
        assert_eq!(row.value(PersonField::Campus), "North");
        assert_eq!(row.value(PersonField::Grade), "8th Grade");
        assert_eq!(row.value(PersonField::Birthdate), "4/2/2010");
        assert_eq!(row.value(PersonField::MaritalStatus), "Single");
        assert_eq!(row.value(PersonField::Gender), "Male");
        assert_eq!(row.group.as_deref(), Some("<a href='/group/60'>Cabin 4</a>"));

        let key = |id, k: &str| AttributeValueKey { attribute_id: id, key: k.to_string() };
        assert_eq!(row.attribute(&key(20, "ShirtSize")), "L");
        assert_eq!(row.attribute(&key(21, "Allergy")), "Nuts");
        assert_eq!(row.attribute(&key(22, "Paid")), "Yes");
    }

    #[test]
    fn test_registrant_without_person_is_blank() {
        let data = snapshot();
        let catalog = full_catalog(&data);
        let rows = data.registrants(1);
        let enrichment = enrich(&data, &rows, &catalog, &options());

        let row = enrichment.get(11).unwrap();
        assert_eq!(row.person_name, "");
        assert_eq!(row.value(PersonField::Address), "");
        assert_eq!(row.value(PersonField::Campus), "");
        assert!(row.attributes.is_empty());
        assert_eq!(row.group, None);
        assert_eq!(enrichment.len(), 2);
    }

    #[test]
    fn test_exporting_loads_addresses_and_plain_group_names() {
        let data = snapshot();
        // Catalog without an address column
        let catalog = FieldCatalog::default();
        let rows = data.registrants(1);
        let mut opts = options();
        opts.exporting = true;
        let enrichment = enrich(&data, &rows, &catalog, &opts);
        let row = enrichment.get(10).unwrap();
        assert_eq!(row.group.as_deref(), Some("Cabin 4"));
        assert_eq!(row.value(PersonField::Address), "1 Main St, Town, AZ 85001");
        assert_eq!(row.values.len(), 1);
    }

    #[test]
    fn test_wait_list_positions_follow_creation_order() {
        let mut data = snapshot();
        let at = |d: u32| NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(8, 0, 0);
        data.registrants = vec![
            Registrant { on_wait_list: true, created_at: at(5), ..registrant(1, Some(101), None) },
            Registrant { on_wait_list: true, created_at: at(2), ..registrant(2, Some(102), None) },
            Registrant { on_wait_list: false, created_at: at(1), ..registrant(3, Some(103), None) },
            Registrant { on_wait_list: true, created_at: at(9), ..registrant(4, Some(104), None) },
        ];
        // Page holds only two of the wait-listed rows
        let page: Vec<&Registrant> = data.registrants.iter().filter(|r| r.id == 1 || r.id == 3).collect();
        let enrichment = enrich(&data, &page, &FieldCatalog::default(), &options());
        assert_eq!(enrichment.get(1).unwrap().wait_list_position, Some(2));
        assert_eq!(enrichment.get(3).unwrap().wait_list_position, None);
    }

    #[test]
    fn test_wait_list_skips_registrants_without_person() {
        let mut data = snapshot();
        let at = |d: u32| NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(8, 0, 0);
        data.registrants = vec![
            Registrant { on_wait_list: true, created_at: at(1), ..registrant(1, None, None) },
            Registrant { on_wait_list: true, created_at: at(2), ..registrant(2, Some(102), None) },
            Registrant { on_wait_list: true, created_at: at(3), ..registrant(3, Some(103), None) },
        ];
        let page: Vec<&Registrant> = data.registrants.iter().collect();
        let enrichment = enrich(&data, &page, &FieldCatalog::default(), &options());
        assert_eq!(enrichment.get(2).unwrap().wait_list_position, Some(1));
        assert_eq!(enrichment.get(3).unwrap().wait_list_position, Some(2));
        assert_eq!(enrichment.get(1).map(|r| r.wait_list_position), Some(None));
    }
}
