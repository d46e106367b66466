//! Price list queries.
//!
//! Every item query joins the category so rows carry its name, slug and
//! icon, and only returns active items in active categories.

use sqlx::PgPool;
use tracing::instrument;

use quick_laundry_core::{CategoryId, GarmentService, GenderCategory, PricingItemId};

use super::RepositoryError;
use crate::models::{Category, CategorySeed, ItemSeed, PricingItem, PricingSummary};

const CATEGORY_COLUMNS: &str =
    "id, category_name, category_slug, description, icon, display_order, is_active, created_at";

const ITEM_SELECT: &str = r"
    SELECT p.id, p.category_id, c.category_name, c.category_slug, c.icon,
           p.item_name, p.item_slug, p.service_type, p.price, p.gender_category,
           p.description, p.is_popular, p.display_order
    FROM laundry.pricing_item p
    JOIN laundry.service_category c ON c.id = p.category_id
    WHERE p.is_active = TRUE AND c.is_active = TRUE
";

const CATALOG_ORDER: &str = "ORDER BY c.display_order ASC, p.display_order ASC, p.id ASC";

/// Repository for categories and pricing items.
pub struct PricingRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PricingRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Active categories in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM laundry.service_category
             WHERE is_active = TRUE ORDER BY display_order ASC, id ASC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(categories)
    }

    /// An active category by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM laundry.service_category
             WHERE id = $1 AND is_active = TRUE"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(category)
    }

    /// Number of active categories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_categories(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM laundry.service_category WHERE is_active = TRUE",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }

    /// The full active catalog, by category then item display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list_items(&self) -> Result<Vec<PricingItem>, RepositoryError> {
        let items = sqlx::query_as::<_, PricingItem>(&format!("{ITEM_SELECT} {CATALOG_ORDER}"))
            .fetch_all(self.pool)
            .await?;

        Ok(items)
    }

    /// Items in one category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items_by_category(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<PricingItem>, RepositoryError> {
        let items = sqlx::query_as::<_, PricingItem>(&format!(
            "{ITEM_SELECT} AND p.category_id = $1 {CATALOG_ORDER}"
        ))
        .bind(category_id)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// Items quoted for one service.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items_by_service(
        &self,
        service: GarmentService,
    ) -> Result<Vec<PricingItem>, RepositoryError> {
        let items = sqlx::query_as::<_, PricingItem>(&format!(
            "{ITEM_SELECT} AND p.service_type = $1 {CATALOG_ORDER}"
        ))
        .bind(service)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// Items listed for one audience.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items_by_gender(
        &self,
        gender: GenderCategory,
    ) -> Result<Vec<PricingItem>, RepositoryError> {
        let items = sqlx::query_as::<_, PricingItem>(&format!(
            "{ITEM_SELECT} AND p.gender_category = $1 {CATALOG_ORDER}"
        ))
        .bind(gender)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// Popular items, cheapest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn popular_items(&self) -> Result<Vec<PricingItem>, RepositoryError> {
        let items = sqlx::query_as::<_, PricingItem>(&format!(
            "{ITEM_SELECT} AND p.is_popular = TRUE ORDER BY p.price ASC, p.id ASC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// An active item by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_item(&self, id: PricingItemId) -> Result<Option<PricingItem>, RepositoryError> {
        let item = sqlx::query_as::<_, PricingItem>(&format!("{ITEM_SELECT} AND p.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(item)
    }

    /// Active items among the given IDs. Unknown IDs are simply absent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items_by_ids(
        &self,
        ids: &[PricingItemId],
    ) -> Result<Vec<PricingItem>, RepositoryError> {
        let items = sqlx::query_as::<_, PricingItem>(&format!("{ITEM_SELECT} AND p.id = ANY($1)"))
            .bind(ids)
            .fetch_all(self.pool)
            .await?;

        Ok(items)
    }

    /// Case-insensitive substring match on item name or description.
    /// Popular items come first, then cheapest.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn search(&self, term: &str) -> Result<Vec<PricingItem>, RepositoryError> {
        let pattern = format!("%{}%", escape_like(term));
        let items = sqlx::query_as::<_, PricingItem>(&format!(
            r"{ITEM_SELECT}
              AND (p.item_name ILIKE $1 ESCAPE '\' OR p.description ILIKE $1 ESCAPE '\')
              ORDER BY p.is_popular DESC, p.price ASC, p.id ASC"
        ))
        .bind(pattern)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// Aggregate figures over active items in active categories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn summary(&self) -> Result<PricingSummary, RepositoryError> {
        let summary = sqlx::query_as::<_, PricingSummary>(
            r"
            SELECT COUNT(*) AS total_items,
                   COUNT(DISTINCT p.category_id) AS total_categories,
                   MIN(p.price) AS min_price,
                   MAX(p.price) AS max_price,
                   ROUND(AVG(p.price), 2) AS avg_price,
                   COUNT(*) FILTER (WHERE p.is_popular) AS popular_items_count
            FROM laundry.pricing_item p
            JOIN laundry.service_category c ON c.id = p.category_id
            WHERE p.is_active = TRUE AND c.is_active = TRUE
            ",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(summary)
    }

    /// Insert or update a category keyed by slug. Returns its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn upsert_category(&self, seed: &CategorySeed) -> Result<CategoryId, RepositoryError> {
        let id: CategoryId = sqlx::query_scalar(
            r"
            INSERT INTO laundry.service_category
                (category_name, category_slug, description, icon, display_order)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (category_slug) DO UPDATE SET
                category_name = EXCLUDED.category_name,
                description = EXCLUDED.description,
                icon = EXCLUDED.icon,
                display_order = EXCLUDED.display_order,
                is_active = TRUE
            RETURNING id
            ",
        )
        .bind(&seed.name)
        .bind(&seed.slug)
        .bind(seed.description.as_deref())
        .bind(seed.icon.as_deref())
        .bind(seed.display_order)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    /// Insert or update an item keyed by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn upsert_item(
        &self,
        category_id: CategoryId,
        seed: &ItemSeed,
    ) -> Result<PricingItemId, RepositoryError> {
        let id: PricingItemId = sqlx::query_scalar(
            r"
            INSERT INTO laundry.pricing_item
                (category_id, item_name, item_slug, service_type, price,
                 gender_category, description, is_popular, display_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (item_slug) DO UPDATE SET
                category_id = EXCLUDED.category_id,
                item_name = EXCLUDED.item_name,
                service_type = EXCLUDED.service_type,
                price = EXCLUDED.price,
                gender_category = EXCLUDED.gender_category,
                description = EXCLUDED.description,
                is_popular = EXCLUDED.is_popular,
                display_order = EXCLUDED.display_order,
                is_active = TRUE
            RETURNING id
            ",
        )
        .bind(category_id)
        .bind(&seed.name)
        .bind(&seed.slug)
        .bind(seed.service_type)
        .bind(seed.price)
        .bind(seed.gender)
        .bind(seed.description.as_deref())
        .bind(seed.popular)
        .bind(seed.display_order)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }
}

/// Escape `LIKE` wildcards so user input matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
