use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::attribute::ValueFilter;
use super::values::{DateRange, UpperBound};
use crate::models::{AttributeEntity, Gender, Person, PhoneKind, Registrant};
use crate::store::RegistrationData;
use crate::utils::{cmp_ignore_case, contains_ignore_case, starts_with_ignore_case};

/// Person text column a text predicate reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextColumn {
    /// Matches if either the nick name or the legal first name matches.
    FirstOrNickName,
    LastName,
    MiddleName,
    Email,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextMatch {
    StartsWith,
    Contains,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateColumn {
    BirthDate,
    AnniversaryDate,
}

/// Existential attribute test: the registrant's related entity has a value
/// for the attribute that passes the filter.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeMatch {
    pub entity: AttributeEntity,
    pub attribute_id: i64,
    pub filter: ValueFilter,
}

/// One conjunct of a [`RegistrantQuery`].
///
/// Predicates that correspond to a sub-query carry the id set it produced,
/// so evaluation is a membership test.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrantPredicate {
    WaitList(bool),
    Text {
        column: TextColumn,
        mode: TextMatch,
        needle: String,
    },
    DateRange {
        column: DateColumn,
        range: DateRange,
        upper_bound: UpperBound,
    },
    CreatedWithin {
        range: DateRange,
        upper_bound: UpperBound,
    },
    GraduationYear(i32),
    Gender(Gender),
    MaritalStatus(i64),
    FamilyCampus {
        campus_id: i64,
        person_ids: HashSet<i64>,
    },
    Phone {
        kind: PhoneKind,
        digits: String,
        person_ids: HashSet<i64>,
    },
    /// Person has no active membership in any group under `parent_group_id`.
    NotPlacedUnder {
        parent_group_id: i64,
        person_ids: HashSet<i64>,
    },
    Attribute(AttributeMatch),
}

impl RegistrantPredicate {
    pub fn matches(
        &self,
        registrant: &Registrant,
        person: Option<&Person>,
        data: &dyn RegistrationData,
    ) -> bool {
        match self {
            RegistrantPredicate::WaitList(on) => registrant.on_wait_list == *on,
            RegistrantPredicate::CreatedWithin { range, upper_bound } => registrant
                .created_at
                .map_or(false, |at| range.contains_datetime(at, *upper_bound)),
            RegistrantPredicate::NotPlacedUnder { person_ids, .. } => {
                person.map_or(true, |p| !person_ids.contains(&p.id))
            }
            RegistrantPredicate::Attribute(m) => attribute_matches(m, registrant, person, data),
            _ => match person {
                Some(person) => self.matches_person(person),
                None => false,
            },
        }
    }

    fn matches_person(&self, person: &Person) -> bool {
        match self {
            RegistrantPredicate::Text { column, mode, needle } => {
                let test = |value: &str| match mode {
                    TextMatch::StartsWith => starts_with_ignore_case(value, needle),
                    TextMatch::Contains => contains_ignore_case(value, needle),
                };
                match column {
                    TextColumn::FirstOrNickName => {
                        person.nick_name.as_deref().map_or(false, test) || test(&person.first_name)
                    }
                    TextColumn::LastName => test(&person.last_name),
                    TextColumn::MiddleName => person.middle_name.as_deref().map_or(false, test),
                    TextColumn::Email => person.email.as_deref().map_or(false, test),
                }
            }
            RegistrantPredicate::DateRange { column, range, upper_bound } => {
                let date = match column {
                    DateColumn::BirthDate => person.birth_date,
                    DateColumn::AnniversaryDate => person.anniversary_date,
                };
                date.map_or(false, |d| range.contains(d, *upper_bound))
            }
            RegistrantPredicate::GraduationYear(year) => person.graduation_year == Some(*year),
            RegistrantPredicate::Gender(gender) => person.gender == *gender,
            RegistrantPredicate::MaritalStatus(id) => person.marital_status_value_id == Some(*id),
            RegistrantPredicate::FamilyCampus { person_ids, .. }
            | RegistrantPredicate::Phone { person_ids, .. } => person_ids.contains(&person.id),
            _ => true,
        }
    }
}

fn attribute_matches(
    m: &AttributeMatch,
    registrant: &Registrant,
    person: Option<&Person>,
    data: &dyn RegistrationData,
) -> bool {
    let entity_id = match m.entity {
        AttributeEntity::Registrant => Some(registrant.id),
        AttributeEntity::Person => person.map(|p| p.id),
        AttributeEntity::GroupMember => registrant.group_member_id,
    };
    let Some(entity_id) = entity_id else {
        return false;
    };

    match data.attribute_value(m.attribute_id, entity_id) {
        Some(value) => m.filter.matches(&value.value),
        None => data
            .attribute(m.attribute_id)
            .and_then(|a| a.default_value.as_deref())
            .map_or(false, |default| m.filter.matches(default)),
    }
}

// ============================================================================
// Sorting
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortColumn {
    Id,
    LastName,
    NickName,
    FirstName,
    Email,
    BirthDate,
    CreatedDate,
    Cost,
}

impl SortColumn {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "id" => Some(SortColumn::Id),
            "lastname" | "last" => Some(SortColumn::LastName),
            "nickname" | "nick" => Some(SortColumn::NickName),
            "firstname" | "first" => Some(SortColumn::FirstName),
            "email" => Some(SortColumn::Email),
            "birthdate" => Some(SortColumn::BirthDate),
            "createddate" | "created" | "createddatetime" => Some(SortColumn::CreatedDate),
            "cost" => Some(SortColumn::Cost),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// One sort key, as requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn ascending(column: SortColumn) -> Self {
        Self {
            column,
            direction: SortDirection::Ascending,
        }
    }

    /// Parse `"<column> [asc|desc]"`.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split_whitespace();
        let column = SortColumn::parse(parts.next()?)?;
        let direction = match parts.next().map(|d| d.to_ascii_lowercase()) {
            None => SortDirection::Ascending,
            Some(d) if d == "asc" => SortDirection::Ascending,
            Some(d) if d == "desc" => SortDirection::Descending,
            Some(_) => return None,
        };
        Some(Self { column, direction })
    }
}

/// Ordered list of sort keys applied with a stable sort.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegistrantOrdering {
    pub keys: Vec<SortSpec>,
}

impl RegistrantOrdering {
    pub fn new(keys: Vec<SortSpec>) -> Self {
        Self { keys }
    }

    pub fn sort(&self, rows: &mut [&Registrant], data: &dyn RegistrationData) {
        if self.keys.is_empty() {
            return;
        }
        rows.sort_by(|a, b| {
            let pa = a.person_id.and_then(|id| data.person(id));
            let pb = b.person_id.and_then(|id| data.person(id));
            self.keys
                .iter()
                .map(|key| {
                    let ord = compare(key.column, a, pa, b, pb);
                    match key.direction {
                        SortDirection::Ascending => ord,
                        SortDirection::Descending => ord.reverse(),
                    }
                })
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
    }
}

fn compare(
    column: SortColumn,
    a: &Registrant,
    pa: Option<&Person>,
    b: &Registrant,
    pb: Option<&Person>,
) -> Ordering {
    let text = |f: fn(&Person) -> Option<&str>| {
        let va = pa.and_then(f).unwrap_or("");
        let vb = pb.and_then(f).unwrap_or("");
        cmp_ignore_case(va, vb)
    };
    match column {
        SortColumn::Id => a.id.cmp(&b.id),
        SortColumn::LastName => text(|p| Some(p.last_name.as_str())),
        SortColumn::NickName => text(|p| Some(p.preferred_name())),
        SortColumn::FirstName => text(|p| Some(p.first_name.as_str())),
        SortColumn::Email => text(|p| p.email.as_deref()),
        SortColumn::BirthDate => pa
            .and_then(|p| p.birth_date)
            .cmp(&pb.and_then(|p| p.birth_date)),
        SortColumn::CreatedDate => a.created_at.cmp(&b.created_at),
        SortColumn::Cost => a
            .total_cost()
            .partial_cmp(&b.total_cost())
            .unwrap_or(Ordering::Equal),
    }
}

// ============================================================================
// Query
// ============================================================================

/// Conjunction of predicates over the registrants of one instance.
///
/// Adding a predicate only narrows the row set; row shape never changes.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrantQuery {
    pub instance_id: i64,
    predicates: Vec<RegistrantPredicate>,
}

impl RegistrantQuery {
    pub fn for_instance(instance_id: i64) -> Self {
        Self {
            instance_id,
            predicates: Vec::new(),
        }
    }

    pub fn and(mut self, predicate: RegistrantPredicate) -> Self {
        self.push(predicate);
        self
    }

    pub fn push(&mut self, predicate: RegistrantPredicate) {
        self.predicates.push(predicate);
    }

    pub fn predicates(&self) -> &[RegistrantPredicate] {
        &self.predicates
    }

    pub fn matches(&self, registrant: &Registrant, data: &dyn RegistrationData) -> bool {
        let person = registrant.person_id.and_then(|id| data.person(id));
        self.predicates
            .iter()
            .all(|p| p.matches(registrant, person, data))
    }

    /// Matching registrants in storage order.
    pub fn execute<'a>(&self, data: &'a dyn RegistrationData) -> Vec<&'a Registrant> {
        data.registrants(self.instance_id)
            .into_iter()
            .filter(|r| self.matches(r, data))
            .collect()
    }
}
