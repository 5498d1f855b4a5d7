//! Group placement: add selected registrants to groups as members.
//!
//! The whole batch runs in one store transaction. Any validation failure
//! aborts it and nothing is written; the caller gets a message to show
//! either way.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::PlacementError;
use crate::models::{AttributeEntity, Group, GroupType};
use crate::store::{MembershipStore, NewGroupMember};

pub const SUCCESS_MESSAGE: &str = "Registrants were successfully placed in the selected groups.";

/// Target group id -> selected registrant ids.
pub type PlacementSelections = BTreeMap<i64, BTreeSet<i64>>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlacementOptions {
    /// Copy registrant attribute values onto the new membership's
    /// attributes with the same key.
    pub copy_attributes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeKind {
    Success,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementOutcome {
    pub kind: OutcomeKind,
    pub message: String,
    /// Memberships created. Zero on failure.
    pub placed: usize,
}

impl PlacementOutcome {
    pub fn is_success(&self) -> bool {
        self.kind == OutcomeKind::Success
    }
}

/// Place every selected registrant in its group.
///
/// Never returns an error: failures become a `Danger` outcome and the store
/// is left as it was.
pub fn place_in_groups<S: MembershipStore>(
    store: &mut S,
    selections: &PlacementSelections,
    options: &PlacementOptions,
) -> PlacementOutcome {
    match store.transaction(|tx| place_all(tx, selections, options)) {
        Ok(placed) => {
            info!(groups = selections.len(), placed, "Placed registrants in groups");
            PlacementOutcome {
                kind: OutcomeKind::Success,
                message: SUCCESS_MESSAGE.to_string(),
                placed,
            }
        }
        Err(e) => {
            warn!(error = %e, "Group placement rolled back");
            PlacementOutcome {
                kind: OutcomeKind::Danger,
                message: e.to_string(),
                placed: 0,
            }
        }
    }
}

fn place_all<S: MembershipStore>(
    tx: &mut S,
    selections: &PlacementSelections,
    options: &PlacementOptions,
) -> Result<usize, PlacementError> {
    let mut placed = 0;

    for (&group_id, registrant_ids) in selections {
        let Some(group) = tx.group(group_id).cloned() else {
            debug!(group_id, "Selected group not found, skipping");
            continue;
        };
        let Some(group_type) = tx.group_type(group.group_type_id).cloned() else {
            debug!(group_id, group_type_id = group.group_type_id, "Group type not found, skipping");
            continue;
        };
        let Some(role_id) = group_type.placement_role_id() else {
            debug!(group_id, "Group type has no roles, skipping");
            continue;
        };

        for &registrant_id in registrant_ids {
            let Some(person_id) = tx.registrant(registrant_id).and_then(|r| r.person_id) else {
                debug!(registrant_id, "Registrant has no person, skipping");
                continue;
            };

            let already_member = tx
                .members_of_group(group_id)
                .iter()
                .any(|m| m.person_id == person_id && m.role_id == role_id && m.is_active());
            if already_member {
                continue;
            }

            let member_id = tx.add_group_member(NewGroupMember {
                person_id,
                group_id,
                role_id,
            })?;

            let reasons = validate_member(tx, &group, &group_type, role_id, person_id, member_id);
            if !reasons.is_empty() {
                let person = tx
                    .person(person_id)
                    .map(|p| p.full_name())
                    .unwrap_or_default();
                return Err(PlacementError::Invalid {
                    person,
                    group: group.name.clone(),
                    reasons,
                });
            }

            if options.copy_attributes {
                copy_attributes(tx, registrant_id, group_id, member_id)?;
            }
            placed += 1;
        }
    }

    Ok(placed)
}

/// Membership rules for a freshly added member. Empty means valid.
fn validate_member<S: MembershipStore>(
    store: &S,
    group: &Group,
    group_type: &GroupType,
    role_id: i64,
    person_id: i64,
    member_id: i64,
) -> Vec<String> {
    let mut reasons = Vec::new();

    if !group.is_active {
        reasons.push(format!("The '{}' group is inactive.", group.name));
    }

    let Some(role) = group_type.role(role_id) else {
        reasons.push(format!(
            "Role {} is not a valid role for the '{}' group type.",
            role_id, group_type.name
        ));
        return reasons;
    };

    let members = store.members_of_group(group.id);
    let duplicate = members
        .iter()
        .any(|m| m.id != member_id && m.person_id == person_id && m.role_id == role_id);
    if duplicate {
        reasons.push(format!(
            "This person already belongs to the '{}' role for this group.",
            role.name
        ));
    }

    if let Some(max) = role.max_count {
        let in_role = members
            .iter()
            .filter(|m| m.role_id == role_id && m.is_active())
            .count();
        if in_role > max as usize {
            reasons.push(format!(
                "The '{}' role is limited to {} members.",
                role.name, max
            ));
        }
    }

    if let Some(capacity) = group.capacity {
        let active = members.iter().filter(|m| m.is_active()).count();
        if active > capacity as usize {
            reasons.push(format!(
                "The '{}' group is at its capacity of {} members.",
                group.name, capacity
            ));
        }
    }

    reasons
}

/// Copy registrant attribute values to same-keyed member attributes.
fn copy_attributes<S: MembershipStore>(
    tx: &mut S,
    registrant_id: i64,
    group_id: i64,
    member_id: i64,
) -> Result<(), PlacementError> {
    let registrant_values: HashMap<String, String> = tx
        .attributes_for(AttributeEntity::Registrant)
        .into_iter()
        .filter_map(|attr| {
            tx.attribute_value(attr.id, registrant_id)
                .map(|v| (attr.key.clone(), v.value.clone()))
        })
        .collect();
    if registrant_values.is_empty() {
        return Ok(());
    }

    let copies: Vec<(i64, String)> = tx
        .attributes_for(AttributeEntity::GroupMember)
        .into_iter()
        .filter(|attr| attr.applies_to_group(group_id))
        .filter_map(|attr| {
            registrant_values
                .get(&attr.key)
                .map(|value| (attr.id, value.clone()))
        })
        .collect();

    debug!(registrant_id, member_id, copied = copies.len(), "Copying attribute values");
    for (attribute_id, value) in copies {
        tx.set_attribute_value(attribute_id, member_id, value)?;
    }
    Ok(())
}
