//! Registrant grid core library.
//!
//! Filter-and-project engine behind the group placement and wait list
//! listings of an event registration system:
//!
//! - [`catalog`]: grid-visible fields of a registration template
//! - [`filter`]: predicate composer, filter strategy table, filter bar
//! - [`enrich`]: bulk per-page display data
//! - [`placement`]: transactional group placement
//! - [`view`]: the two views and their shared bind pipeline
//! - [`store`]: data access traits and the in-memory snapshot
//! - [`prefs`]: filter preference storage

pub mod catalog;
pub mod enrich;
pub mod error;
pub mod filter;
pub mod models;
pub mod placement;
pub mod prefs;
pub mod store;
pub mod utils;
pub mod view;

pub use catalog::{build_catalog, FieldCatalog, FormField, FormFieldKind};
pub use enrich::{enrich, EnrichOptions, Enrichment, EnrichmentRow};
pub use error::{GridError, PlacementError};
pub use placement::{
    place_in_groups, OutcomeKind, PlacementOptions, PlacementOutcome, PlacementSelections,
};
pub use prefs::{JsonPreferenceStore, MemoryPreferenceStore, PreferenceStore};
pub use store::{MembershipStore, RegistrationData, Snapshot};
pub use view::{GridPage, GridRequest, RegistrantGrid, ViewKind, ViewProfile};
