use std::collections::{HashMap, HashSet};

use abroadly_core::{AppError, PaginationMeta};
use abroadly_models::{MenuId, MenuItemId, PageId};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument};

use crate::modules::cms::menu_tree;
use crate::modules::cms::model::{
    ContentBlock, CreateMenuDto, CreatePageDto, Menu, MenuItem, MenuTree, PAGE_COLUMNS, Page,
    PageFilterParams, PaginatedPagesResponse, ReplaceMenuItemsDto, UpdateMenuDto, UpdatePageDto,
    UpsertContentBlockDto,
};

const MENU_COLUMNS: &str = "id, name, location, created_at, updated_at";
const MENU_ITEM_COLUMNS: &str = "id, menu_id, parent_id, label, url, position";
const BLOCK_COLUMNS: &str = "id, key, content, created_at, updated_at";

fn map_unique(e: sqlx::Error, message: &'static str) -> AppError {
    if let sqlx::Error::Database(db_err) = &e
        && db_err.is_unique_violation()
    {
        return AppError::conflict(anyhow::anyhow!(message));
    }
    AppError::from(e)
}

fn page_not_found() -> AppError {
    AppError::not_found(anyhow::anyhow!("Page not found"))
}

fn menu_not_found() -> AppError {
    AppError::not_found(anyhow::anyhow!("Menu not found"))
}

fn block_not_found() -> AppError {
    AppError::not_found(anyhow::anyhow!("Content block not found"))
}

pub struct CmsService;

impl CmsService {
    // ------------------------------------------------------------------
    // Pages
    // ------------------------------------------------------------------

    #[instrument(skip(db))]
    pub async fn get_published_page(db: &PgPool, slug: &str) -> Result<Page, AppError> {
        sqlx::query_as::<_, Page>(&format!(
            "SELECT {PAGE_COLUMNS} FROM cms_pages WHERE slug = $1 AND is_published = TRUE"
        ))
        .bind(slug)
        .fetch_optional(db)
        .await?
        .ok_or_else(page_not_found)
    }

    #[instrument(skip(db))]
    pub async fn list_pages(
        db: &PgPool,
        filters: PageFilterParams,
    ) -> Result<PaginatedPagesResponse, AppError> {
        let search = filters.search.as_ref().map(|s| format!("%{s}%"));
        let where_clause = r#"
            WHERE ($1::text IS NULL OR title ILIKE $1 OR slug ILIKE $1)
              AND ($2::boolean IS NULL OR is_published = $2)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM cms_pages {where_clause}"
        ))
        .bind(&search)
        .bind(filters.is_published)
        .fetch_one(db)
        .await?;

        let pages = sqlx::query_as::<_, Page>(&format!(
            "SELECT {PAGE_COLUMNS} FROM cms_pages {where_clause}
             ORDER BY updated_at DESC
             LIMIT $3 OFFSET $4"
        ))
        .bind(&search)
        .bind(filters.is_published)
        .bind(filters.pagination.limit())
        .bind(filters.pagination.offset())
        .fetch_all(db)
        .await?;

        Ok(PaginatedPagesResponse {
            data: pages,
            meta: PaginationMeta::new(total, &filters.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_page(db: &PgPool, id: PageId) -> Result<Page, AppError> {
        sqlx::query_as::<_, Page>(&format!("SELECT {PAGE_COLUMNS} FROM cms_pages WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(page_not_found)
    }

    #[instrument(skip(db, dto), fields(slug = %dto.slug))]
    pub async fn create_page(db: &PgPool, dto: CreatePageDto) -> Result<Page, AppError> {
        let page = sqlx::query_as::<_, Page>(&format!(
            "INSERT INTO cms_pages
                 (slug, title, content, excerpt, meta_title, meta_description, is_published,
                  published_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, CASE WHEN $7 THEN NOW() END)
             RETURNING {PAGE_COLUMNS}"
        ))
        .bind(&dto.slug)
        .bind(&dto.title)
        .bind(&dto.content)
        .bind(&dto.excerpt)
        .bind(&dto.meta_title)
        .bind(&dto.meta_description)
        .bind(dto.is_published)
        .fetch_one(db)
        .await
        .map_err(|e| map_unique(e, "A page with this slug already exists"))?;

        info!(page_id = %page.id, "Page created");
        Ok(page)
    }

    /// `published_at` is stamped on the first publish and never cleared.
    #[instrument(skip(db, dto))]
    pub async fn update_page(
        db: &PgPool,
        id: PageId,
        dto: UpdatePageDto,
    ) -> Result<Page, AppError> {
        sqlx::query_as::<_, Page>(&format!(
            "UPDATE cms_pages
             SET slug = COALESCE($2, slug),
                 title = COALESCE($3, title),
                 content = COALESCE($4, content),
                 excerpt = COALESCE($5, excerpt),
                 meta_title = COALESCE($6, meta_title),
                 meta_description = COALESCE($7, meta_description),
                 is_published = COALESCE($8, is_published),
                 published_at = CASE
                     WHEN published_at IS NULL AND COALESCE($8, is_published) THEN NOW()
                     ELSE published_at
                 END,
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {PAGE_COLUMNS}"
        ))
        .bind(id)
        .bind(&dto.slug)
        .bind(&dto.title)
        .bind(&dto.content)
        .bind(&dto.excerpt)
        .bind(&dto.meta_title)
        .bind(&dto.meta_description)
        .bind(dto.is_published)
        .fetch_optional(db)
        .await
        .map_err(|e| map_unique(e, "A page with this slug already exists"))?
        .ok_or_else(page_not_found)
    }

    #[instrument(skip(db))]
    pub async fn delete_page(db: &PgPool, id: PageId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM cms_pages WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(page_not_found());
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Menus
    // ------------------------------------------------------------------

    async fn tree_for(conn: &mut PgConnection, menu: Menu) -> Result<MenuTree, AppError> {
        let items = sqlx::query_as::<_, MenuItem>(&format!(
            "SELECT {MENU_ITEM_COLUMNS} FROM cms_menu_items WHERE menu_id = $1"
        ))
        .bind(menu.id)
        .fetch_all(conn)
        .await?;

        Ok(MenuTree {
            menu,
            items: menu_tree::build_tree(items),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_menu_by_location(db: &PgPool, location: &str) -> Result<MenuTree, AppError> {
        let mut conn = db.acquire().await?;
        let menu = sqlx::query_as::<_, Menu>(&format!(
            "SELECT {MENU_COLUMNS} FROM cms_menus WHERE location = $1"
        ))
        .bind(location)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(menu_not_found)?;

        Self::tree_for(&mut conn, menu).await
    }

    #[instrument(skip(db))]
    pub async fn get_menu(db: &PgPool, id: MenuId) -> Result<MenuTree, AppError> {
        let mut conn = db.acquire().await?;
        let menu = sqlx::query_as::<_, Menu>(&format!(
            "SELECT {MENU_COLUMNS} FROM cms_menus WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(menu_not_found)?;

        Self::tree_for(&mut conn, menu).await
    }

    #[instrument(skip(db))]
    pub async fn list_menus(db: &PgPool) -> Result<Vec<Menu>, AppError> {
        let menus = sqlx::query_as::<_, Menu>(&format!(
            "SELECT {MENU_COLUMNS} FROM cms_menus ORDER BY location"
        ))
        .fetch_all(db)
        .await?;

        Ok(menus)
    }

    #[instrument(skip(db, dto), fields(location = %dto.location))]
    pub async fn create_menu(db: &PgPool, dto: CreateMenuDto) -> Result<Menu, AppError> {
        sqlx::query_as::<_, Menu>(&format!(
            "INSERT INTO cms_menus (name, location) VALUES ($1, $2) RETURNING {MENU_COLUMNS}"
        ))
        .bind(&dto.name)
        .bind(&dto.location)
        .fetch_one(db)
        .await
        .map_err(|e| map_unique(e, "A menu already exists at this location"))
    }

    #[instrument(skip(db, dto))]
    pub async fn update_menu(
        db: &PgPool,
        id: MenuId,
        dto: UpdateMenuDto,
    ) -> Result<Menu, AppError> {
        sqlx::query_as::<_, Menu>(&format!(
            "UPDATE cms_menus
             SET name = COALESCE($2, name),
                 location = COALESCE($3, location),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {MENU_COLUMNS}"
        ))
        .bind(id)
        .bind(&dto.name)
        .bind(&dto.location)
        .fetch_optional(db)
        .await
        .map_err(|e| map_unique(e, "A menu already exists at this location"))?
        .ok_or_else(menu_not_found)
    }

    #[instrument(skip(db))]
    pub async fn delete_menu(db: &PgPool, id: MenuId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM cms_menus WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(menu_not_found());
        }
        Ok(())
    }

    /// Swaps the whole item list in one transaction. Submitted ids are keys
    /// within the request only; stored items get fresh ids.
    #[instrument(skip(db, dto), fields(items = dto.items.len()))]
    pub async fn replace_items(
        db: &PgPool,
        id: MenuId,
        dto: ReplaceMenuItemsDto,
    ) -> Result<MenuTree, AppError> {
        menu_tree::validate_items(&dto.items)
            .map_err(|msg| AppError::bad_request(anyhow::anyhow!(msg)))?;

        let mut tx = db.begin().await?;

        let menu = sqlx::query_as::<_, Menu>(&format!(
            "UPDATE cms_menus SET updated_at = NOW() WHERE id = $1 RETURNING {MENU_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(menu_not_found)?;

        sqlx::query("DELETE FROM cms_menu_items WHERE menu_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let stored: HashMap<MenuItemId, MenuItemId> = dto
            .items
            .iter()
            .map(|item| (item.id, MenuItemId::new()))
            .collect();

        // Parents first so the self-referencing foreign key is satisfied.
        let mut pending: Vec<_> = dto.items.iter().collect();
        let mut inserted = HashSet::new();
        while !pending.is_empty() {
            let (ready, rest): (Vec<_>, Vec<_>) = pending
                .into_iter()
                .partition(|item| item.parent_id.is_none_or(|p| inserted.contains(&p)));

            for item in &ready {
                sqlx::query(
                    "INSERT INTO cms_menu_items (id, menu_id, parent_id, label, url, position)
                     VALUES ($1, $2, $3, $4, $5, $6)",
                )
                .bind(stored[&item.id])
                .bind(id)
                .bind(item.parent_id.map(|p| stored[&p]))
                .bind(&item.label)
                .bind(&item.url)
                .bind(item.position)
                .execute(&mut *tx)
                .await?;
                inserted.insert(item.id);
            }

            if ready.is_empty() {
                // Unreachable after validation; guards against an endless loop.
                return Err(AppError::bad_request(anyhow::anyhow!(
                    "Menu items contain a cycle"
                )));
            }
            pending = rest;
        }

        let tree = Self::tree_for(&mut tx, menu).await?;
        tx.commit().await?;

        info!(menu_id = %id, "Menu items replaced");
        Ok(tree)
    }

    // ------------------------------------------------------------------
    // Content blocks
    // ------------------------------------------------------------------

    #[instrument(skip(db))]
    pub async fn get_block(db: &PgPool, key: &str) -> Result<ContentBlock, AppError> {
        sqlx::query_as::<_, ContentBlock>(&format!(
            "SELECT {BLOCK_COLUMNS} FROM cms_content_blocks WHERE key = $1"
        ))
        .bind(key)
        .fetch_optional(db)
        .await?
        .ok_or_else(block_not_found)
    }

    #[instrument(skip(db))]
    pub async fn list_blocks(db: &PgPool) -> Result<Vec<ContentBlock>, AppError> {
        let blocks = sqlx::query_as::<_, ContentBlock>(&format!(
            "SELECT {BLOCK_COLUMNS} FROM cms_content_blocks ORDER BY key"
        ))
        .fetch_all(db)
        .await?;

        Ok(blocks)
    }

    #[instrument(skip(db, dto))]
    pub async fn upsert_block(
        db: &PgPool,
        key: &str,
        dto: UpsertContentBlockDto,
    ) -> Result<ContentBlock, AppError> {
        if key.is_empty() || key.len() > 100 {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Block key must be 1 to 100 characters"
            )));
        }

        let block = sqlx::query_as::<_, ContentBlock>(&format!(
            "INSERT INTO cms_content_blocks (key, content)
             VALUES ($1, $2)
             ON CONFLICT (key) DO UPDATE SET content = EXCLUDED.content, updated_at = NOW()
             RETURNING {BLOCK_COLUMNS}"
        ))
        .bind(key)
        .bind(Json(&dto.content))
        .fetch_one(db)
        .await?;

        Ok(block)
    }

    #[instrument(skip(db))]
    pub async fn delete_block(db: &PgPool, key: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM cms_content_blocks WHERE key = $1")
            .bind(key)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(block_not_found());
        }
        Ok(())
    }
}
