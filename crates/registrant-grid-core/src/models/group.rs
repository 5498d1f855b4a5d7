use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRole {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub order: i32,
    #[serde(rename = "maxCount", default)]
    pub max_count: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupType {
    pub id: i64,
    pub name: String,
    #[serde(rename = "isFamily", default)]
    pub is_family: bool,
    #[serde(rename = "defaultRoleId", default)]
    pub default_role_id: Option<i64>,
    #[serde(default)]
    pub roles: Vec<GroupRole>,
}

impl GroupType {
    /// Role used when placing someone in a group of this type: the configured
    /// default, else the lowest-ordered role.
    pub fn placement_role_id(&self) -> Option<i64> {
        self.default_role_id.or_else(|| {
            self.roles
                .iter()
                .min_by_key(|r| r.order)
                .map(|r| r.id)
        })
    }

    pub fn role(&self, role_id: i64) -> Option<&GroupRole> {
        self.roles.iter().find(|r| r.id == role_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    #[serde(rename = "groupTypeId")]
    pub group_type_id: i64,
    #[serde(rename = "parentGroupId", default)]
    pub parent_group_id: Option<i64>,
    #[serde(rename = "campusId", default)]
    pub campus_id: Option<i64>,
    #[serde(rename = "isActive", default = "default_true")]
    pub is_active: bool,
    /// Hard member limit; placement fails once reached.
    #[serde(default)]
    pub capacity: Option<u32>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MemberStatus {
    #[default]
    Active,
    Inactive,
    Pending,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMember {
    pub id: i64,
    #[serde(rename = "personId")]
    pub person_id: i64,
    #[serde(rename = "groupId")]
    pub group_id: i64,
    #[serde(rename = "roleId")]
    pub role_id: i64,
    #[serde(default)]
    pub status: MemberStatus,
}

impl GroupMember {
    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }
}
