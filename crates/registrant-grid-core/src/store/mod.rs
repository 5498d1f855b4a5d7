//! Data access seams for the grid engine.
//!
//! The engine never talks to a database directly. Everything it reads goes
//! through [`RegistrationData`]; the one write path (group placement) goes
//! through [`MembershipStore`], which adds a transaction boundary.
//!
//! [`Snapshot`] is an in-memory implementation loaded from JSON, used by the
//! command-line front end and the tests.

pub mod snapshot;

use std::collections::{HashMap, HashSet};

use crate::error::PlacementError;
use crate::models::{
    AttributeDefinition, AttributeEntity, AttributeValue, Campus, DefinedValue, Group,
    GroupMember, GroupType, Location, Person, PhoneKind, PhoneNumber, Registrant,
    RegistrationInstance, RegistrationTemplate,
};

pub use snapshot::Snapshot;

/// One slice of a combined attribute value lookup: these attributes, for
/// these entities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeScope {
    pub attribute_ids: Vec<i64>,
    pub entity_ids: Vec<i64>,
}

impl AttributeScope {
    pub fn is_empty(&self) -> bool {
        self.attribute_ids.is_empty() || self.entity_ids.is_empty()
    }

    pub fn matches(&self, value: &AttributeValue) -> bool {
        self.attribute_ids.contains(&value.attribute_id) && self.entity_ids.contains(&value.entity_id)
    }
}

/// A single bulk attribute value request spanning all three entity kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeValueRequest {
    pub person: AttributeScope,
    pub registrant: AttributeScope,
    pub group_member: AttributeScope,
}

impl AttributeValueRequest {
    pub fn is_empty(&self) -> bool {
        self.person.is_empty() && self.registrant.is_empty() && self.group_member.is_empty()
    }

    pub fn scope(&self, entity: AttributeEntity) -> &AttributeScope {
        match entity {
            AttributeEntity::Person => &self.person,
            AttributeEntity::Registrant => &self.registrant,
            AttributeEntity::GroupMember => &self.group_member,
        }
    }
}

/// Read access to registrations, people, groups and the lookup caches.
///
/// Bulk methods take the full id list for a page so callers issue one call
/// per category instead of one per row.
pub trait RegistrationData {
    fn instance(&self, id: i64) -> Option<&RegistrationInstance>;
    fn template(&self, id: i64) -> Option<&RegistrationTemplate>;

    /// All registrants of an instance, in storage order.
    fn registrants(&self, instance_id: i64) -> Vec<&Registrant>;
    fn registrant(&self, id: i64) -> Option<&Registrant>;
    fn person(&self, id: i64) -> Option<&Person>;

    // ===== Caches =====

    fn attribute(&self, id: i64) -> Option<&AttributeDefinition>;
    fn attributes_for(&self, entity: AttributeEntity) -> Vec<&AttributeDefinition>;
    fn campus(&self, id: i64) -> Option<&Campus>;
    fn defined_value(&self, id: i64) -> Option<&DefinedValue>;

    // ===== Attribute values =====

    fn attribute_value(&self, attribute_id: i64, entity_id: i64) -> Option<&AttributeValue>;
    fn attribute_values(&self, request: &AttributeValueRequest) -> Vec<&AttributeValue>;

    // ===== Contact info =====

    fn phone_numbers(&self, person_ids: &[i64], kind: PhoneKind) -> HashMap<i64, &PhoneNumber>;
    /// People owning a phone of `kind` whose digits contain `digits`.
    fn person_ids_with_phone(&self, digits: &str, kind: PhoneKind) -> HashSet<i64>;
    fn home_addresses(&self, person_ids: &[i64]) -> HashMap<i64, &Location>;

    // ===== Groups =====

    fn group(&self, id: i64) -> Option<&Group>;
    fn group_type(&self, id: i64) -> Option<&GroupType>;
    fn group_members(&self, ids: &[i64]) -> HashMap<i64, &GroupMember>;
    fn members_of_group(&self, group_id: i64) -> Vec<&GroupMember>;
    /// Campus ids of each person's family groups.
    fn family_campus_ids(&self, person_ids: &[i64]) -> HashMap<i64, Vec<i64>>;
    /// People belonging to a family group on `campus_id`.
    fn person_ids_in_family_campus(&self, campus_id: i64) -> HashSet<i64>;
    /// All groups below `parent_id`, at any depth. Does not include the parent.
    fn descendant_group_ids(&self, parent_id: i64) -> HashSet<i64>;
    /// People with an active membership in any of `group_ids` whose group is active.
    fn active_member_person_ids(&self, group_ids: &HashSet<i64>) -> HashSet<i64>;
}

/// Fields for a membership about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGroupMember {
    pub person_id: i64,
    pub group_id: i64,
    pub role_id: i64,
}

/// Write access used by group placement.
pub trait MembershipStore: RegistrationData {
    fn add_group_member(&mut self, member: NewGroupMember) -> Result<i64, PlacementError>;

    fn set_attribute_value(
        &mut self,
        attribute_id: i64,
        entity_id: i64,
        value: String,
    ) -> Result<(), PlacementError>;

    /// Run `f` atomically: if it returns `Err`, none of its writes are kept.
    fn transaction<T, F>(&mut self, f: F) -> Result<T, PlacementError>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<T, PlacementError>;
}
