//! Predicate composer and filter bar.
//!
//! Filter inputs flow from the [`FilterBar`] (stored preferences) through
//! [`compose_filter`], which dispatches each catalog field through the
//! strategy table and returns a [`RegistrantQuery`].

pub mod attribute;
pub mod bar;
pub mod compose;
pub mod predicate;
pub mod strategy;
pub mod values;

pub use attribute::{AttributeFieldFilter, DefaultAttributeFilter, ValueFilter};
pub use bar::{format_filter_value, FilterBar, FilterSummary};
pub use compose::{
    compose_filter, compose_sort, compose_structural, ComposeContext, DefaultSort,
    StructuralFilters,
};
pub use predicate::{
    RegistrantOrdering, RegistrantPredicate, RegistrantQuery, SortColumn, SortDirection, SortSpec,
};
pub use strategy::{strategies, strategy, FilterStrategy};
pub use values::{DateRange, FilterKey, FilterValues, UpperBound};
