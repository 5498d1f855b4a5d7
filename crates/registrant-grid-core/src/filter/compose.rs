use chrono::NaiveDate;
use tracing::debug;

use super::attribute::{parse_stored_values, AttributeFieldFilter};
use super::predicate::{
    AttributeMatch, RegistrantOrdering, RegistrantPredicate, RegistrantQuery, SortColumn,
    SortSpec,
};
use super::strategy::strategy;
use super::values::{DateRange, FilterKey, FilterValues, UpperBound};
use crate::catalog::{FieldCatalog, FormFieldKind};
use crate::models::PersonField;
use crate::store::RegistrationData;
use crate::utils::GraduationDate;

/// Everything a predicate builder may need besides the input itself.
pub struct ComposeContext<'a> {
    pub data: &'a dyn RegistrationData,
    pub attribute_filter: &'a dyn AttributeFieldFilter,
    /// Date used for grade math.
    pub as_of: NaiveDate,
    pub graduation: GraduationDate,
    /// Upper-bound policy for the record creation range.
    pub upper_bound: UpperBound,
}

/// Filters that do not come from the field catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuralFilters {
    /// Drop registrants already actively placed in a group under this parent.
    pub exclude_placed_under: Option<i64>,
    /// Record creation range from the surrounding page.
    pub created_range: Option<DateRange>,
}

/// Default ordering when the caller gives no sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultSort {
    LastNameThenNickName,
    RegistrantId,
}

/// Refine `base` with the filters for every catalog field that has input.
///
/// First and last name are filter-bar inputs and apply whether or not the
/// catalog lists them.
pub fn compose_filter(
    catalog: &FieldCatalog,
    inputs: &FilterValues,
    base: RegistrantQuery,
    ctx: &ComposeContext<'_>,
) -> RegistrantQuery {
    let mut query = base;

    for field in [PersonField::FirstName, PersonField::LastName] {
        apply_builtin(&mut query, field, inputs, ctx);
    }

    for form_field in catalog {
        match &form_field.kind {
            FormFieldKind::Builtin(field) => apply_builtin(&mut query, *field, inputs, ctx),
            FormFieldKind::Attribute(attribute) => {
                let Some(stored) = inputs.get(&FilterKey::Attribute(attribute.key.clone())) else {
                    continue;
                };
                let Some(entity) = form_field.source.attribute_entity() else {
                    continue;
                };
                let Some(values) = parse_stored_values(stored) else {
                    debug!(attribute = %attribute.key, "Unreadable attribute filter value, ignoring");
                    continue;
                };
                match ctx.attribute_filter.parse(attribute, &values) {
                    Some(filter) => query.push(RegistrantPredicate::Attribute(AttributeMatch {
                        entity,
                        attribute_id: attribute.id,
                        filter,
                    })),
                    None => debug!(attribute = %attribute.key, "Empty attribute filter, ignoring"),
                }
            }
        }
    }

    debug!(
        instance_id = query.instance_id,
        predicates = query.predicates().len(),
        "Composed registrant filter"
    );
    query
}

fn apply_builtin(
    query: &mut RegistrantQuery,
    field: PersonField,
    inputs: &FilterValues,
    ctx: &ComposeContext<'_>,
) {
    let Some(value) = inputs.builtin(field) else {
        return;
    };
    let Some(strategy) = strategy(field) else {
        return;
    };
    match (strategy.build)(value, ctx) {
        Some(predicate) => query.push(predicate),
        None => debug!(field = ?field, value, "Filter input not usable, ignoring"),
    }
}

/// Add the structural filters: placed-person exclusion and creation range.
pub fn compose_structural(
    base: RegistrantQuery,
    structural: &StructuralFilters,
    ctx: &ComposeContext<'_>,
) -> RegistrantQuery {
    let mut query = base;

    if let Some(parent_group_id) = structural.exclude_placed_under {
        let group_ids = ctx.data.descendant_group_ids(parent_group_id);
        let person_ids = ctx.data.active_member_person_ids(&group_ids);
        debug!(
            parent_group_id,
            groups = group_ids.len(),
            placed = person_ids.len(),
            "Excluding registrants already placed"
        );
        query.push(RegistrantPredicate::NotPlacedUnder {
            parent_group_id,
            person_ids,
        });
    }

    if let Some(range) = structural.created_range.filter(|r| !r.is_empty()) {
        query.push(RegistrantPredicate::CreatedWithin {
            range,
            upper_bound: ctx.upper_bound,
        });
    }

    query
}

/// The caller's sort verbatim, else the view default.
pub fn compose_sort(sort: Option<SortSpec>, default: DefaultSort) -> RegistrantOrdering {
    match sort {
        Some(spec) => RegistrantOrdering::new(vec![spec]),
        None => match default {
            DefaultSort::LastNameThenNickName => RegistrantOrdering::new(vec![
                SortSpec::ascending(SortColumn::LastName),
                SortSpec::ascending(SortColumn::NickName),
            ]),
            DefaultSort::RegistrantId => {
                RegistrantOrdering::new(vec![SortSpec::ascending(SortColumn::Id)])
            }
        },
    }
}
