use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Role;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct RoleCreate {
    #[validate(length(min = 1, message = "slug must not be empty"))]
    pub(crate) slug: String,
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: String,
    #[validate(range(min = 0, message = "permission must be non-negative"))]
    pub(crate) permission: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct RoleUpdate {
    #[serde(default)]
    #[validate(length(min = 1, message = "slug must not be empty"))]
    pub(crate) slug: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0, message = "permission must be non-negative"))]
    pub(crate) permission: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RoleResponse {
    pub(crate) id: String,
    pub(crate) slug: String,
    pub(crate) name: String,
    pub(crate) permission: i32,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl RoleResponse {
    pub(crate) fn from_db(role: Role) -> Self {
        Self {
            id: role.id,
            slug: role.slug,
            name: role.name,
            permission: role.permission,
            created_at: format_primitive(role.created_at),
            updated_at: format_primitive(role.updated_at),
        }
    }
}
