//! Price list lookups, grouping and quotes.
//!
//! The category list and the full item list are cached for 5 minutes; they
//! only change when the CLI reseeds the catalog.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use moka::future::Cache;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, instrument};

use quick_laundry_core::{PricingItemId, line_total};

use crate::db::{PricingRepository, RepositoryError};
use crate::models::{Category, CategoryGroup, PricingItem};

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("Item with ID {0} not found")]
    ItemNotFound(PricingItemId),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl PricingError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::ItemNotFound(_) => StatusCode::BAD_REQUEST,
            Self::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
enum CacheKey {
    Categories,
    Items,
}

#[derive(Debug, Clone)]
enum CacheValue {
    Categories(Arc<Vec<Category>>),
    Items(Arc<Vec<PricingItem>>),
}

/// One line of a quote request.
#[derive(Debug, Clone, Copy)]
pub struct QuoteLine {
    pub item_id: PricingItemId,
    pub quantity: i32,
}

/// Cached view of the price list.
#[derive(Clone)]
pub struct PricingCatalog {
    cache: Cache<CacheKey, CacheValue>,
}

impl Default for PricingCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl PricingCatalog {
    #[must_use]
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();
        Self { cache }
    }

    /// Active categories in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    #[instrument(skip_all)]
    pub async fn categories(&self, pool: &PgPool) -> Result<Arc<Vec<Category>>, RepositoryError> {
        if let Some(CacheValue::Categories(categories)) = self.cache.get(&CacheKey::Categories).await
        {
            debug!("Categories cache hit");
            return Ok(categories);
        }

        let categories = Arc::new(PricingRepository::new(pool).list_categories().await?);
        self.cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(Arc::clone(&categories)),
            )
            .await;
        Ok(categories)
    }

    /// Every active item in catalog order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    #[instrument(skip_all)]
    pub async fn items(&self, pool: &PgPool) -> Result<Arc<Vec<PricingItem>>, RepositoryError> {
        if let Some(CacheValue::Items(items)) = self.cache.get(&CacheKey::Items).await {
            debug!("Items cache hit");
            return Ok(items);
        }

        let items = Arc::new(PricingRepository::new(pool).list_items().await?);
        self.cache
            .insert(CacheKey::Items, CacheValue::Items(Arc::clone(&items)))
            .await;
        Ok(items)
    }

    /// Price a basket of items at current list prices.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` for the first unknown or inactive item.
    #[instrument(skip(self, pool, lines), fields(lines = lines.len()))]
    pub async fn quote(&self, pool: &PgPool, lines: &[QuoteLine]) -> Result<Decimal, PricingError> {
        let ids: Vec<PricingItemId> = lines.iter().map(|line| line.item_id).collect();
        let prices: HashMap<PricingItemId, Decimal> = PricingRepository::new(pool)
            .items_by_ids(&ids)
            .await?
            .into_iter()
            .map(|item| (item.id, item.price))
            .collect();

        price_lines(lines, &prices)
    }
}

/// Sum `price * quantity` over the lines.
///
/// # Errors
///
/// Returns `ItemNotFound` for the first line without a price.
pub fn price_lines(
    lines: &[QuoteLine],
    prices: &HashMap<PricingItemId, Decimal>,
) -> Result<Decimal, PricingError> {
    lines.iter().try_fold(Decimal::ZERO, |total, line| {
        let price = prices
            .get(&line.item_id)
            .ok_or(PricingError::ItemNotFound(line.item_id))?;
        Ok(total + line_total(*price, line.quantity))
    })
}

/// Items grouped under their category slug. Categories without items are
/// kept so the frontend can render an empty section.
#[must_use]
pub fn group_by_category(
    categories: &[Category],
    items: &[PricingItem],
) -> BTreeMap<String, CategoryGroup> {
    let mut groups: BTreeMap<String, CategoryGroup> = categories
        .iter()
        .map(|category| {
            (
                category.category_slug.clone(),
                CategoryGroup {
                    category: category.clone(),
                    items: Vec::new(),
                },
            )
        })
        .collect();

    for item in items {
        if let Some(group) = groups.get_mut(&item.category_slug) {
            group.items.push(item.clone());
        }
    }
    groups
}

/// Items grouped by service type. Services with no items are omitted.
#[must_use]
pub fn group_by_service(items: &[PricingItem]) -> BTreeMap<&'static str, Vec<PricingItem>> {
    let mut groups: BTreeMap<&'static str, Vec<PricingItem>> = BTreeMap::new();
    for item in items {
        groups
            .entry(item.service_type.as_str())
            .or_default()
            .push(item.clone());
    }
    groups
}

/// Response body for a quote.
#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub total_price: Decimal,
    pub items_count: usize,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use quick_laundry_core::{CategoryId, GarmentService, GenderCategory};

    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn category(id: i32, slug: &str) -> Category {
        Category {
            id: CategoryId::new(id),
            category_name: slug.to_uppercase(),
            category_slug: slug.to_string(),
            description: None,
            icon: None,
            display_order: id,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn item(id: i32, category_slug: &str, service: GarmentService, price: &str) -> PricingItem {
        PricingItem {
            id: PricingItemId::new(id),
            category_id: CategoryId::new(1),
            category_name: category_slug.to_uppercase(),
            category_slug: category_slug.to_string(),
            icon: None,
            item_name: format!("Item {id}"),
            item_slug: format!("item-{id}"),
            service_type: service,
            price: dec(price),
            gender_category: GenderCategory::Common,
            description: None,
            is_popular: false,
            display_order: id,
        }
    }

    #[test]
    fn test_price_lines() {
        let prices = HashMap::from([
            (PricingItemId::new(1), dec("15.00")),
            (PricingItemId::new(2), dec("40.50")),
        ]);
        let lines = [
            QuoteLine {
                item_id: PricingItemId::new(1),
                quantity: 3,
            },
            QuoteLine {
                item_id: PricingItemId::new(2),
                quantity: 2,
            },
        ];
        assert_eq!(price_lines(&lines, &prices).unwrap(), dec("126.00"));
    }

    #[test]
    fn test_price_lines_unknown_item() {
        let lines = [QuoteLine {
            item_id: PricingItemId::new(99),
            quantity: 1,
        }];
        let err = price_lines(&lines, &HashMap::new()).unwrap_err();
        assert_eq!(err.to_string(), "Item with ID 99 not found");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_group_by_category_keeps_empty_categories() {
        let categories = [category(1, "mens-wear"), category(2, "household")];
        let items = [
            item(1, "mens-wear", GarmentService::Iron, "10"),
            item(2, "mens-wear", GarmentService::DryClean, "80"),
        ];

        let groups = group_by_category(&categories, &items);
        assert_eq!(groups["mens-wear"].items.len(), 2);
        assert!(groups["household"].items.is_empty());
    }

    #[test]
    fn test_group_by_service_omits_empty() {
        let items = [
            item(1, "mens-wear", GarmentService::Iron, "10"),
            item(2, "mens-wear", GarmentService::Iron, "12"),
            item(3, "household", GarmentService::WashIron, "30"),
        ];

        let groups = group_by_service(&items);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["iron"].len(), 2);
        assert_eq!(groups["wash_iron"].len(), 1);
        assert!(!groups.contains_key("dry_clean"));
    }
}
