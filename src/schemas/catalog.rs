//! Payloads shared by the slug + name entities: groups, labels and
//! question specifications.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Group, Label, Specification};
use crate::schemas::user::UserResponse;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CatalogCreate {
    #[validate(length(min = 1, max = 128, message = "slug must be 1-128 characters"))]
    pub(crate) slug: String,
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CatalogUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 128, message = "slug must be 1-128 characters"))]
    pub(crate) slug: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CatalogResponse {
    pub(crate) id: String,
    pub(crate) slug: String,
    pub(crate) name: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl From<Group> for CatalogResponse {
    fn from(group: Group) -> Self {
        Self {
            id: group.id,
            slug: group.slug,
            name: group.name,
            created_at: format_primitive(group.created_at),
            updated_at: format_primitive(group.updated_at),
        }
    }
}

impl From<Label> for CatalogResponse {
    fn from(label: Label) -> Self {
        Self {
            id: label.id,
            slug: label.slug,
            name: label.name,
            created_at: format_primitive(label.created_at),
            updated_at: format_primitive(label.updated_at),
        }
    }
}

impl From<Specification> for CatalogResponse {
    fn from(specification: Specification) -> Self {
        Self {
            id: specification.id,
            slug: specification.slug,
            name: specification.name,
            created_at: format_primitive(specification.created_at),
            updated_at: format_primitive(specification.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct GroupDetailResponse {
    #[serde(flatten)]
    pub(crate) group: CatalogResponse,
    pub(crate) users: Vec<UserResponse>,
    pub(crate) labels: Vec<CatalogResponse>,
}
