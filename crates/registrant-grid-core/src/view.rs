//! The two registrant listings and the bind pipeline they share.
//!
//! Group placement and wait list run the same catalog -> filter -> sort ->
//! page -> enrich pipeline; a [`ViewProfile`] holds the few settings where
//! they differ.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::{build_catalog, FieldCatalog};
use crate::enrich::{enrich, EnrichOptions, Enrichment};
use crate::error::GridError;
use crate::filter::{
    compose_filter, compose_sort, compose_structural, AttributeFieldFilter, ComposeContext,
    DateRange, DefaultAttributeFilter, DefaultSort, FilterBar, FilterValues, RegistrantPredicate,
    RegistrantQuery, SortSpec, StructuralFilters, UpperBound,
};
use crate::models::Registrant;
use crate::store::RegistrationData;
use crate::utils::GraduationDate;

/// Rows per page when the caller does not say.
pub const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewKind {
    GroupPlacement,
    WaitList,
}

/// Per-view configuration of the shared pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewProfile {
    pub kind: ViewKind,
    /// Base rows: registrants whose wait-list flag equals this.
    pub on_wait_list: bool,
    /// Honor the request's parent group exclusion.
    pub excludes_placed: bool,
    pub default_sort: DefaultSort,
    /// Applies to the created range only.
    pub upper_bound: UpperBound,
    pub preference_prefix: &'static str,
    pub wait_list_positions: bool,
}

impl ViewProfile {
    pub fn group_placement() -> Self {
        Self {
            kind: ViewKind::GroupPlacement,
            on_wait_list: false,
            excludes_placed: true,
            default_sort: DefaultSort::LastNameThenNickName,
            upper_bound: UpperBound::Exclusive,
            preference_prefix: "GroupPlacements",
            wait_list_positions: false,
        }
    }

    pub fn wait_list() -> Self {
        Self {
            kind: ViewKind::WaitList,
            on_wait_list: true,
            excludes_placed: false,
            default_sort: DefaultSort::RegistrantId,
            upper_bound: UpperBound::Inclusive,
            preference_prefix: "WL",
            wait_list_positions: true,
        }
    }

    pub fn for_kind(kind: ViewKind) -> Self {
        match kind {
            ViewKind::GroupPlacement => Self::group_placement(),
            ViewKind::WaitList => Self::wait_list(),
        }
    }

    pub fn filter_bar(&self, template_id: i64) -> FilterBar {
        FilterBar::new(template_id, self.preference_prefix)
    }
}

/// One bind request.
#[derive(Debug, Clone)]
pub struct GridRequest {
    pub instance_id: i64,
    pub filters: FilterValues,
    /// Only used by views that exclude already-placed registrants.
    pub parent_group_id: Option<i64>,
    pub created_range: Option<DateRange>,
    pub sort: Option<SortSpec>,
    /// Zero-based.
    pub page: usize,
    /// Zero means everything on one page.
    pub page_size: usize,
    /// Exports return every row on one page.
    pub exporting: bool,
    pub as_of: NaiveDate,
}

impl GridRequest {
    pub fn new(instance_id: i64, as_of: NaiveDate) -> Self {
        Self {
            instance_id,
            filters: FilterValues::new(),
            parent_group_id: None,
            created_range: None,
            sort: None,
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
            exporting: false,
            as_of,
        }
    }
}

/// Result of a bind: one page of rows plus their enrichment.
#[derive(Debug)]
pub struct GridPage<'a> {
    pub catalog: FieldCatalog,
    pub rows: Vec<&'a Registrant>,
    /// Matching rows across all pages.
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub enrichment: Enrichment,
}

impl GridPage<'_> {
    pub fn page_count(&self) -> usize {
        if self.page_size == 0 {
            return 1;
        }
        self.total.div_ceil(self.page_size).max(1)
    }
}

/// Binds pages of one view over a data source.
pub struct RegistrantGrid<'a> {
    data: &'a dyn RegistrationData,
    profile: ViewProfile,
    attribute_filter: &'a dyn AttributeFieldFilter,
    graduation: GraduationDate,
    group_url_template: String,
}

impl<'a> RegistrantGrid<'a> {
    pub fn new(data: &'a dyn RegistrationData, profile: ViewProfile) -> Self {
        Self {
            data,
            profile,
            attribute_filter: &DefaultAttributeFilter,
            graduation: GraduationDate::default(),
            group_url_template: String::new(),
        }
    }

    pub fn with_attribute_filter(mut self, filter: &'a dyn AttributeFieldFilter) -> Self {
        self.attribute_filter = filter;
        self
    }

    pub fn with_graduation(mut self, graduation: GraduationDate) -> Self {
        self.graduation = graduation;
        self
    }

    pub fn with_group_url_template(mut self, template: impl Into<String>) -> Self {
        self.group_url_template = template.into();
        self
    }

    pub fn profile(&self) -> &ViewProfile {
        &self.profile
    }

    /// Field catalog of an instance's template.
    pub fn catalog(&self, instance_id: i64) -> Result<FieldCatalog, GridError> {
        let instance = self
            .data
            .instance(instance_id)
            .ok_or(GridError::InstanceNotFound(instance_id))?;
        let template = self
            .data
            .template(instance.template_id)
            .ok_or(GridError::TemplateNotFound(instance.template_id))?;
        Ok(build_catalog(template, self.data))
    }

    pub fn bind(&self, request: &GridRequest) -> Result<GridPage<'a>, GridError> {
        let catalog = self.catalog(request.instance_id)?;

        let ctx = ComposeContext {
            data: self.data,
            attribute_filter: self.attribute_filter,
            as_of: request.as_of,
            graduation: self.graduation,
            upper_bound: self.profile.upper_bound,
        };
        let base = RegistrantQuery::for_instance(request.instance_id)
            .and(RegistrantPredicate::WaitList(self.profile.on_wait_list));
        let query = compose_filter(&catalog, &request.filters, base, &ctx);
        let structural = StructuralFilters {
            exclude_placed_under: request
                .parent_group_id
                .filter(|_| self.profile.excludes_placed),
            created_range: request.created_range,
        };
        let query = compose_structural(query, &structural, &ctx);

        let mut rows = query.execute(self.data);
        compose_sort(request.sort, self.profile.default_sort).sort(&mut rows, self.data);

        let total = rows.len();
        let page_size = if request.exporting { 0 } else { request.page_size };
        let page = if page_size == 0 { 0 } else { request.page };
        let rows: Vec<&'a Registrant> = if page_size == 0 {
            rows
        } else {
            rows.into_iter().skip(page.saturating_mul(page_size)).take(page_size).collect()
        };

        let options = EnrichOptions {
            exporting: request.exporting,
            group_url_template: self.group_url_template.clone(),
            wait_list_positions: self.profile.wait_list_positions,
            as_of: request.as_of,
            graduation: self.graduation,
        };
        let enrichment = enrich(self.data, &rows, &catalog, &options);

        info!(
            view = ?self.profile.kind,
            instance_id = request.instance_id,
            total,
            page,
            rows = rows.len(),
            "Bound registrant grid"
        );

        Ok(GridPage {
            catalog,
            rows,
            total,
            page,
            page_size,
            enrichment,
        })
    }
}
