use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::AttributeEntity;

/// Where a registration form field's data lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldSource {
    PersonField,
    PersonAttribute,
    GroupMemberAttribute,
    RegistrantAttribute,
}

impl FieldSource {
    /// Entity that stores values for an attribute-sourced field
    pub fn attribute_entity(&self) -> Option<AttributeEntity> {
        match self {
            FieldSource::PersonField => None,
            FieldSource::PersonAttribute => Some(AttributeEntity::Person),
            FieldSource::GroupMemberAttribute => Some(AttributeEntity::GroupMember),
            FieldSource::RegistrantAttribute => Some(AttributeEntity::Registrant),
        }
    }
}

/// Built-in person fields a registration form can collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PersonField {
    FirstName,
    LastName,
    MiddleName,
    Campus,
    Address,
    Email,
    Birthdate,
    AnniversaryDate,
    Grade,
    Gender,
    MaritalStatus,
    MobilePhone,
    HomePhone,
}

impl PersonField {
    pub fn label(&self) -> &'static str {
        match self {
            PersonField::FirstName => "First Name",
            PersonField::LastName => "Last Name",
            PersonField::MiddleName => "Middle Name",
            PersonField::Campus => "Campus",
            PersonField::Address => "Address",
            PersonField::Email => "Email",
            PersonField::Birthdate => "Birthdate",
            PersonField::AnniversaryDate => "Anniversary Date",
            PersonField::Grade => "Grade",
            PersonField::Gender => "Gender",
            PersonField::MaritalStatus => "Marital Status",
            PersonField::MobilePhone => "Cell Phone",
            PersonField::HomePhone => "Home Phone",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormFieldDefinition {
    pub id: i64,
    pub source: FieldSource,
    #[serde(rename = "personField", default)]
    pub person_field: Option<PersonField>,
    #[serde(rename = "attributeId", default)]
    pub attribute_id: Option<i64>,
    #[serde(default)]
    pub order: i32,
    #[serde(rename = "showOnGrid", default)]
    pub show_on_grid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationForm {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FormFieldDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationTemplate {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub forms: Vec<RegistrationForm>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationInstance {
    pub id: i64,
    #[serde(rename = "templateId")]
    pub template_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrantFee {
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    pub cost: f64,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registrant {
    pub id: i64,
    #[serde(rename = "registrationId")]
    pub registration_id: i64,
    #[serde(rename = "instanceId")]
    pub instance_id: i64,
    #[serde(rename = "personId", default)]
    pub person_id: Option<i64>,
    #[serde(rename = "groupMemberId", default)]
    pub group_member_id: Option<i64>,
    #[serde(rename = "onWaitList", default)]
    pub on_wait_list: bool,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub fees: Vec<RegistrantFee>,
}

impl Registrant {
    pub fn total_cost(&self) -> f64 {
        self.fees.iter().map(|f| f.cost * f64::from(f.quantity)).sum()
    }
}
