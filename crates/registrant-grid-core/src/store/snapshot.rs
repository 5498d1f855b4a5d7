use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AttributeValueRequest, MembershipStore, NewGroupMember, RegistrationData};
use crate::error::PlacementError;
use crate::models::{
    AttributeDefinition, AttributeEntity, AttributeValue, Campus, DefinedValue, Group,
    GroupMember, GroupType, Location, MemberStatus, Person, PhoneKind, PhoneNumber, Registrant,
    RegistrationInstance, RegistrationTemplate,
};

/// In-memory copy of everything the grid engine reads.
///
/// Loaded from a JSON export; lookups are linear scans, which is fine for
/// the size of a single registration instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub templates: Vec<RegistrationTemplate>,
    #[serde(default)]
    pub instances: Vec<RegistrationInstance>,
    #[serde(default)]
    pub registrants: Vec<Registrant>,
    #[serde(default)]
    pub people: Vec<Person>,
    #[serde(rename = "phoneNumbers", default)]
    pub phone_numbers: Vec<PhoneNumber>,
    #[serde(rename = "homeLocations", default)]
    pub home_locations: Vec<Location>,
    #[serde(default)]
    pub campuses: Vec<Campus>,
    #[serde(rename = "definedValues", default)]
    pub defined_values: Vec<DefinedValue>,
    #[serde(rename = "groupTypes", default)]
    pub group_types: Vec<GroupType>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(rename = "groupMembers", default)]
    pub group_members: Vec<GroupMember>,
    #[serde(default)]
    pub attributes: Vec<AttributeDefinition>,
    #[serde(rename = "attributeValues", default)]
    pub attribute_values: Vec<AttributeValue>,
}

impl Snapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
        let snapshot: Snapshot = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse snapshot: {}", path.display()))?;
        debug!(
            path = %path.display(),
            registrants = snapshot.registrants.len(),
            people = snapshot.people.len(),
            groups = snapshot.groups.len(),
            "Loaded snapshot"
        );
        Ok(snapshot)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write snapshot: {}", path.display()))?;
        Ok(())
    }

    fn next_group_member_id(&self) -> i64 {
        self.group_members.iter().map(|m| m.id).max().unwrap_or(0) + 1
    }

    fn family_groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter().filter(move |g| {
            self.group_type(g.group_type_id)
                .map(|gt| gt.is_family)
                .unwrap_or(false)
        })
    }
}

impl RegistrationData for Snapshot {
    fn instance(&self, id: i64) -> Option<&RegistrationInstance> {
        self.instances.iter().find(|i| i.id == id)
    }

    fn template(&self, id: i64) -> Option<&RegistrationTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    fn registrants(&self, instance_id: i64) -> Vec<&Registrant> {
        self.registrants
            .iter()
            .filter(|r| r.instance_id == instance_id)
            .collect()
    }

    fn registrant(&self, id: i64) -> Option<&Registrant> {
        self.registrants.iter().find(|r| r.id == id)
    }

    fn person(&self, id: i64) -> Option<&Person> {
        self.people.iter().find(|p| p.id == id)
    }

    fn attribute(&self, id: i64) -> Option<&AttributeDefinition> {
        self.attributes.iter().find(|a| a.id == id)
    }

    fn attributes_for(&self, entity: AttributeEntity) -> Vec<&AttributeDefinition> {
        self.attributes.iter().filter(|a| a.entity == entity).collect()
    }

    fn campus(&self, id: i64) -> Option<&Campus> {
        self.campuses.iter().find(|c| c.id == id)
    }

    fn defined_value(&self, id: i64) -> Option<&DefinedValue> {
        self.defined_values.iter().find(|d| d.id == id)
    }

    fn attribute_value(&self, attribute_id: i64, entity_id: i64) -> Option<&AttributeValue> {
        self.attribute_values
            .iter()
            .find(|v| v.attribute_id == attribute_id && v.entity_id == entity_id)
    }

    fn attribute_values(&self, request: &AttributeValueRequest) -> Vec<&AttributeValue> {
        self.attribute_values
            .iter()
            .filter(|v| {
                request.person.matches(v)
                    || request.registrant.matches(v)
                    || request.group_member.matches(v)
            })
            .collect()
    }

    fn phone_numbers(&self, person_ids: &[i64], kind: PhoneKind) -> HashMap<i64, &PhoneNumber> {
        let mut result = HashMap::new();
        for phone in self
            .phone_numbers
            .iter()
            .filter(|p| p.kind == kind && person_ids.contains(&p.person_id))
        {
            // First number of a kind wins
            result.entry(phone.person_id).or_insert(phone);
        }
        result
    }

    fn person_ids_with_phone(&self, digits: &str, kind: PhoneKind) -> HashSet<i64> {
        self.phone_numbers
            .iter()
            .filter(|p| p.kind == kind && p.number.contains(digits))
            .map(|p| p.person_id)
            .collect()
    }

    fn home_addresses(&self, person_ids: &[i64]) -> HashMap<i64, &Location> {
        let mut result = HashMap::new();
        for loc in self
            .home_locations
            .iter()
            .filter(|l| person_ids.contains(&l.person_id))
        {
            result.entry(loc.person_id).or_insert(loc);
        }
        result
    }

    fn group(&self, id: i64) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    fn group_type(&self, id: i64) -> Option<&GroupType> {
        self.group_types.iter().find(|gt| gt.id == id)
    }

    fn group_members(&self, ids: &[i64]) -> HashMap<i64, &GroupMember> {
        self.group_members
            .iter()
            .filter(|m| ids.contains(&m.id))
            .map(|m| (m.id, m))
            .collect()
    }

    fn members_of_group(&self, group_id: i64) -> Vec<&GroupMember> {
        self.group_members
            .iter()
            .filter(|m| m.group_id == group_id)
            .collect()
    }

    fn family_campus_ids(&self, person_ids: &[i64]) -> HashMap<i64, Vec<i64>> {
        let family_campuses: HashMap<i64, Option<i64>> = self
            .family_groups()
            .map(|g| (g.id, g.campus_id))
            .collect();

        let mut result: HashMap<i64, Vec<i64>> = HashMap::new();
        for member in self
            .group_members
            .iter()
            .filter(|m| person_ids.contains(&m.person_id))
        {
            if let Some(campus) = family_campuses.get(&member.group_id) {
                let entry = result.entry(member.person_id).or_default();
                if let Some(campus_id) = campus {
                    if !entry.contains(campus_id) {
                        entry.push(*campus_id);
                    }
                }
            }
        }
        result
    }

    fn person_ids_in_family_campus(&self, campus_id: i64) -> HashSet<i64> {
        let groups: HashSet<i64> = self
            .family_groups()
            .filter(|g| g.campus_id == Some(campus_id))
            .map(|g| g.id)
            .collect();
        self.group_members
            .iter()
            .filter(|m| groups.contains(&m.group_id))
            .map(|m| m.person_id)
            .collect()
    }

    fn descendant_group_ids(&self, parent_id: i64) -> HashSet<i64> {
        let mut found = HashSet::new();
        let mut frontier = vec![parent_id];
        while let Some(current) = frontier.pop() {
            for child in self
                .groups
                .iter()
                .filter(|g| g.parent_group_id == Some(current))
            {
                // Guard against cycles in bad data
                if child.id != parent_id && found.insert(child.id) {
                    frontier.push(child.id);
                }
            }
        }
        found
    }

    fn active_member_person_ids(&self, group_ids: &HashSet<i64>) -> HashSet<i64> {
        let active_groups: HashSet<i64> = self
            .groups
            .iter()
            .filter(|g| g.is_active && group_ids.contains(&g.id))
            .map(|g| g.id)
            .collect();
        self.group_members
            .iter()
            .filter(|m| m.is_active() && active_groups.contains(&m.group_id))
            .map(|m| m.person_id)
            .collect()
    }
}

impl MembershipStore for Snapshot {
    fn add_group_member(&mut self, member: NewGroupMember) -> Result<i64, PlacementError> {
        let id = self.next_group_member_id();
        self.group_members.push(GroupMember {
            id,
            person_id: member.person_id,
            group_id: member.group_id,
            role_id: member.role_id,
            status: MemberStatus::Active,
        });
        Ok(id)
    }

    fn set_attribute_value(
        &mut self,
        attribute_id: i64,
        entity_id: i64,
        value: String,
    ) -> Result<(), PlacementError> {
        if let Some(existing) = self
            .attribute_values
            .iter_mut()
            .find(|v| v.attribute_id == attribute_id && v.entity_id == entity_id)
        {
            existing.value = value;
        } else {
            self.attribute_values.push(AttributeValue {
                attribute_id,
                entity_id,
                value,
            });
        }
        Ok(())
    }

    fn transaction<T, F>(&mut self, f: F) -> Result<T, PlacementError>
    where
        F: FnOnce(&mut Self) -> Result<T, PlacementError>,
    {
        let mut working = self.clone();
        let result = f(&mut working)?;
        *self = working;
        Ok(result)
    }
}
