use serde::{Deserialize, Serialize};

use crate::utils::{format_date, parse_date};

/// Entity an attribute hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttributeEntity {
    Registrant,
    Person,
    GroupMember,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttributeFieldType {
    #[default]
    Text,
    Integer,
    Decimal,
    Boolean,
    Date,
    SingleSelect,
}

impl AttributeFieldType {
    /// Render a raw stored value for display in a grid cell.
    pub fn format_value(&self, raw: &str) -> String {
        match self {
            AttributeFieldType::Boolean => match parse_bool(raw) {
                Some(true) => "Yes".to_string(),
                Some(false) => "No".to_string(),
                None => String::new(),
            },
            AttributeFieldType::Date => match parse_date(raw) {
                Some(date) => format_date(date),
                None => raw.to_string(),
            },
            _ => raw.to_string(),
        }
    }
}

/// Lenient boolean parsing for stored attribute values
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub id: i64,
    pub key: String,
    pub name: String,
    #[serde(rename = "fieldType", default)]
    pub field_type: AttributeFieldType,
    pub entity: AttributeEntity,
    /// Group member attributes may be scoped to a single group.
    #[serde(rename = "qualifierGroupId", default)]
    pub qualifier_group_id: Option<i64>,
    #[serde(rename = "defaultValue", default)]
    pub default_value: Option<String>,
}

impl AttributeDefinition {
    /// Whether this group member attribute applies to members of `group_id`
    pub fn applies_to_group(&self, group_id: i64) -> bool {
        self.entity == AttributeEntity::GroupMember
            && self.qualifier_group_id.map_or(true, |g| g == group_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeValue {
    #[serde(rename = "attributeId")]
    pub attribute_id: i64,
    #[serde(rename = "entityId")]
    pub entity_id: i64,
    pub value: String,
}

/// Composite key for a row's attribute value: attribute id plus attribute key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttributeValueKey {
    pub attribute_id: i64,
    pub key: String,
}

impl AttributeValueKey {
    pub fn new(attribute: &AttributeDefinition) -> Self {
        Self {
            attribute_id: attribute.id,
            key: attribute.key.clone(),
        }
    }
}

impl std::fmt::Display for AttributeValueKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.attribute_id, self.key)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campus {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinedValue {
    pub id: i64,
    pub value: String,
}
