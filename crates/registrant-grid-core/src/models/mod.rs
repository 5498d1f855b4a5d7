//! Data models for registration entities.
//!
//! This module contains the data structures the grid engine reads:
//!
//! - `Person`, `PhoneNumber`, `Location`: people and their contact info
//! - `Group`, `GroupType`, `GroupMember`: groups registrants are placed into
//! - `AttributeDefinition`, `AttributeValue`: dynamically defined fields
//! - `RegistrationTemplate`, `Registrant`: registration forms and entries

pub mod attribute;
pub mod group;
pub mod person;
pub mod registration;

pub use attribute::{
    AttributeDefinition, AttributeEntity, AttributeFieldType, AttributeValue, AttributeValueKey,
    Campus, DefinedValue,
};
pub use group::{Group, GroupMember, GroupRole, GroupType, MemberStatus};
pub use person::{Gender, Location, Person, PhoneKind, PhoneNumber};
pub use registration::{
    FieldSource, FormFieldDefinition, PersonField, Registrant, RegistrantFee, RegistrationForm,
    RegistrationInstance, RegistrationTemplate,
};
