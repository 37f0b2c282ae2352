//! CMS pages, menus and content blocks.

use abroadly_core::serde::{deserialize_optional_bool, deserialize_optional_string};
use abroadly_core::{PaginationMeta, PaginationParams};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::ids::{ContentBlockId, MenuId, MenuItemId, PageId};
use crate::value_types::Slug;

// ============================================================================
// Pages
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Page {
    pub id: PageId,
    pub slug: Slug,
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub is_published: bool,
    /// Set the first time the page is published and kept afterwards
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const PAGE_COLUMNS: &str = "id, slug, title, content, excerpt, meta_title, \
     meta_description, is_published, published_at, created_at, updated_at";

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreatePageDto {
    pub slug: Slug,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[validate(length(max = 500))]
    pub excerpt: Option<String>,
    #[validate(length(max = 200))]
    pub meta_title: Option<String>,
    #[validate(length(max = 500))]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdatePageDto {
    pub slug: Option<Slug>,
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub content: Option<String>,
    #[validate(length(max = 500))]
    pub excerpt: Option<String>,
    #[validate(length(max = 200))]
    pub meta_title: Option<String>,
    #[validate(length(max = 500))]
    pub meta_description: Option<String>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct PageFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub search: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_bool")]
    pub is_published: Option<bool>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedPagesResponse {
    pub data: Vec<Page>,
    pub meta: PaginationMeta,
}

// ============================================================================
// Menus
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Menu {
    pub id: MenuId,
    pub name: String,
    /// Unique placement key such as `header` or `footer`
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub menu_id: MenuId,
    pub parent_id: Option<MenuItemId>,
    pub label: String,
    pub url: String,
    pub position: i32,
}

/// Menu item with its children, ordered by position.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MenuNode {
    pub id: MenuItemId,
    pub label: String,
    pub url: String,
    pub position: i32,
    #[schema(no_recursion)]
    pub children: Vec<MenuNode>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MenuTree {
    #[serde(flatten)]
    pub menu: Menu,
    pub items: Vec<MenuNode>,
}

fn validate_location(location: &str) -> Result<(), validator::ValidationError> {
    if !location.is_empty()
        && location
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        Ok(())
    } else {
        Err(validator::ValidationError::new("location_format"))
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateMenuDto {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(
        length(max = 50),
        custom(function = "validate_location", message = "use lowercase letters, digits, - or _")
    )]
    #[schema(example = "header")]
    pub location: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateMenuDto {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(
        length(max = 50),
        custom(function = "validate_location", message = "use lowercase letters, digits, - or _")
    )]
    pub location: Option<String>,
}

/// One submitted menu item. `id` and `parent_id` are client-chosen keys that
/// only need to be unique within the submitted list.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct MenuItemInput {
    pub id: MenuItemId,
    pub parent_id: Option<MenuItemId>,
    #[validate(length(min = 1, max = 100))]
    pub label: String,
    #[validate(length(min = 1, max = 500))]
    pub url: String,
    #[serde(default)]
    pub position: i32,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ReplaceMenuItemsDto {
    #[validate(length(max = 200), nested)]
    pub items: Vec<MenuItemInput>,
}

// ============================================================================
// Content blocks
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ContentBlock {
    pub id: ContentBlockId,
    pub key: String,
    #[schema(value_type = Object)]
    pub content: Json<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpsertContentBlockDto {
    #[schema(value_type = Object)]
    pub content: serde_json::Value,
}
