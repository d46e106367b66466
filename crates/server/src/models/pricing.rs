//! Price list types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use quick_laundry_core::{CategoryId, GarmentService, GenderCategory, PricingItemId};

/// A price list section, e.g. "Men Wear".
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub category_name: String,
    pub category_slug: String,
    pub description: Option<String>,
    /// Font Awesome class name, e.g. `fas fa-user-tie`.
    pub icon: Option<String>,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A priced garment with its category denormalized for display.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PricingItem {
    pub id: PricingItemId,
    pub category_id: CategoryId,
    pub category_name: String,
    pub category_slug: String,
    pub icon: Option<String>,
    pub item_name: String,
    pub item_slug: String,
    pub service_type: GarmentService,
    pub price: Decimal,
    pub gender_category: GenderCategory,
    pub description: Option<String>,
    pub is_popular: bool,
    pub display_order: i32,
}

/// A category and its items, for the grouped view.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryGroup {
    pub category: Category,
    pub items: Vec<PricingItem>,
}

/// Aggregate figures over the active price list.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PricingSummary {
    pub total_items: i64,
    pub total_categories: i64,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub avg_price: Option<Decimal>,
    pub popular_items_count: i64,
}

/// Price list file read by the seeding command.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceList {
    pub categories: Vec<CategorySeed>,
    pub items: Vec<ItemSeed>,
}

/// A category entry in a [`PriceList`].
#[derive(Debug, Clone, Deserialize)]
pub struct CategorySeed {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub display_order: i32,
}

/// An item entry in a [`PriceList`], linked to its category by slug.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemSeed {
    pub category: String,
    pub name: String,
    pub slug: String,
    pub service_type: GarmentService,
    pub price: Decimal,
    #[serde(default)]
    pub gender: GenderCategory,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub popular: bool,
    #[serde(default)]
    pub display_order: i32,
}
