//! Price list route handlers.
//!
//! Public; lists only hold active items in active categories.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use quick_laundry_core::{CategoryId, GarmentService, GenderCategory, PricingItemId};

use super::{MaybeJson, success};
use crate::db::PricingRepository;
use crate::error::{AppError, Result};
use crate::services::pricing::{Quote, QuoteLine, group_by_category, group_by_service};
use crate::state::AppState;

/// Shortest accepted search term, in characters.
const MIN_SEARCH_LEN: usize = 2;

/// GET /api/pricing/categories
pub async fn categories(State(state): State<AppState>) -> Result<Response> {
    let categories = state.pricing().categories(state.pool()).await?;
    Ok(success(
        StatusCode::OK,
        json!({"count": categories.len(), "categories": categories}),
    ))
}

/// GET /api/pricing/categories/{id}
pub async fn category(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Response> {
    let category = PricingRepository::new(state.pool())
        .get_category(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;
    Ok(success(StatusCode::OK, json!({"category": category})))
}

/// GET /api/pricing/items
pub async fn items(State(state): State<AppState>) -> Result<Response> {
    let items = state.pricing().items(state.pool()).await?;
    Ok(success(
        StatusCode::OK,
        json!({"count": items.len(), "items": items}),
    ))
}

/// GET /api/pricing/items/category/{id}
pub async fn items_by_category(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Response> {
    let items = PricingRepository::new(state.pool())
        .items_by_category(id)
        .await?;
    Ok(success(
        StatusCode::OK,
        json!({"category_id": id, "count": items.len(), "items": items}),
    ))
}

/// GET /api/pricing/items/service/{service_type}
pub async fn items_by_service(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Response> {
    let service: GarmentService = raw.parse().map_err(|_| {
        AppError::BadRequest(format!(
            "Invalid service type. Must be one of: {}",
            GarmentService::choices()
        ))
    })?;

    let items = PricingRepository::new(state.pool())
        .items_by_service(service)
        .await?;
    Ok(success(
        StatusCode::OK,
        json!({"service_type": service, "count": items.len(), "items": items}),
    ))
}

/// GET /api/pricing/items/gender/{gender}
pub async fn items_by_gender(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Response> {
    let gender: GenderCategory = raw.parse().map_err(|_| {
        AppError::BadRequest(format!(
            "Invalid gender category. Must be one of: {}",
            GenderCategory::choices()
        ))
    })?;

    let items = PricingRepository::new(state.pool())
        .items_by_gender(gender)
        .await?;
    Ok(success(
        StatusCode::OK,
        json!({"gender_category": gender, "count": items.len(), "items": items}),
    ))
}

/// Popular items, cheapest first.
///
/// GET /api/pricing/items/popular
pub async fn popular(State(state): State<AppState>) -> Result<Response> {
    let items = PricingRepository::new(state.pool()).popular_items().await?;
    Ok(success(
        StatusCode::OK,
        json!({"count": items.len(), "items": items}),
    ))
}

/// GET /api/pricing/items/{id}
pub async fn item(
    State(state): State<AppState>,
    Path(id): Path<PricingItemId>,
) -> Result<Response> {
    let item = PricingRepository::new(state.pool())
        .get_item(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Item not found".to_string()))?;
    Ok(success(StatusCode::OK, json!({"item": item})))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// Validate a search term.
fn search_term(query: &SearchQuery) -> Result<&str> {
    let term = query.q.as_deref().map(str::trim).unwrap_or_default();
    if term.is_empty() {
        return Err(AppError::BadRequest("Search term is required".to_string()));
    }
    if term.chars().count() < MIN_SEARCH_LEN {
        return Err(AppError::BadRequest(
            "Search term must be at least 2 characters".to_string(),
        ));
    }
    Ok(term)
}

/// Search item names and descriptions.
///
/// GET /api/pricing/search?q=
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Response> {
    let term = search_term(&query)?;
    let items = PricingRepository::new(state.pool()).search(term).await?;
    Ok(success(
        StatusCode::OK,
        json!({"search_term": term, "count": items.len(), "items": items}),
    ))
}

/// GET /api/pricing/grouped/category
pub async fn grouped_by_category(State(state): State<AppState>) -> Result<Response> {
    let catalog = state.pricing();
    let categories = catalog.categories(state.pool()).await?;
    let items = catalog.items(state.pool()).await?;

    let groups = group_by_category(&categories, &items);
    Ok(success(
        StatusCode::OK,
        json!({"count": groups.len(), "data": groups}),
    ))
}

/// GET /api/pricing/grouped/service
pub async fn grouped_by_service(State(state): State<AppState>) -> Result<Response> {
    let items = state.pricing().items(state.pool()).await?;
    let groups = group_by_service(&items);
    Ok(success(
        StatusCode::OK,
        json!({"count": groups.len(), "data": groups}),
    ))
}

/// GET /api/pricing/summary
pub async fn summary(State(state): State<AppState>) -> Result<Response> {
    let summary = PricingRepository::new(state.pool()).summary().await?;
    Ok(success(StatusCode::OK, json!({"summary": summary})))
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
struct QuoteItemRequest {
    item_id: PricingItemId,
    #[serde(default = "default_quantity")]
    quantity: i32,
}

/// The `item_id` of an unparseable entry as the client sent it.
fn raw_item_id(entry: &serde_json::Value) -> String {
    match entry.get("item_id") {
        Some(serde_json::Value::String(id)) => id.clone(),
        Some(id) => id.to_string(),
        None => "null".to_string(),
    }
}

/// Parse the `items` array of a quote request.
fn quote_lines(body: Option<serde_json::Value>) -> Result<Vec<QuoteLine>> {
    let items = body
        .as_ref()
        .and_then(|b| b.get("items"))
        .filter(|items| !items.is_null())
        .ok_or_else(|| AppError::BadRequest("Items list is required".to_string()))?;
    let entries = items
        .as_array()
        .ok_or_else(|| AppError::BadRequest("Items must be a list".to_string()))?;

    entries
        .iter()
        .map(|entry| {
            let item = QuoteItemRequest::deserialize(entry).map_err(|_| {
                AppError::BadRequest(format!("Item with ID {} not found", raw_item_id(entry)))
            })?;
            Ok(QuoteLine {
                item_id: item.item_id,
                quantity: item.quantity,
            })
        })
        .collect()
}

/// Price a basket at list prices.
///
/// POST /api/pricing/calculate
pub async fn calculate(
    State(state): State<AppState>,
    MaybeJson(body): MaybeJson<serde_json::Value>,
) -> Result<Response> {
    let lines = quote_lines(body)?;
    let total_price = state.pricing().quote(state.pool(), &lines).await?;

    let quote = Quote {
        total_price,
        items_count: lines.len(),
    };
    Ok(success(StatusCode::OK, json!(quote)))
}

/// GET /api/pricing/health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match PricingRepository::new(state.pool()).count_categories().await {
        Ok(count) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "message": "Pricing API is operational",
                "categories_count": count,
            })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Pricing health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "unhealthy", "message": "Database unavailable"})),
            )
        }
    }
}
