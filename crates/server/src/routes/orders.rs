//! Iron/wash order route handlers. Every route requires a signed-in
//! customer and only ever touches that customer's orders.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use quick_laundry_core::{OrderId, OrderStatus};

use super::{MaybeJson, required, success};
use crate::db::{OrderRepository, RepositoryError};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::services::orders::{OrderDraft, OrderService};
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 50;

/// POST /api/orders
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    MaybeJson(draft): MaybeJson<OrderDraft>,
) -> Result<Response> {
    let draft = draft.ok_or_else(|| AppError::BadRequest("No data provided".to_string()))?;

    let placed = OrderService::new(state.pool()).place(user.id, draft).await?;
    let order_id = placed.order.id.to_string();
    add_breadcrumb("orders", "Order placed", Some(&[("order_id", order_id.as_str())]));

    Ok(success(
        StatusCode::CREATED,
        json!({
            "message": "Order placed successfully",
            "order_id": placed.order.id,
            "order": placed,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct MyOrdersQuery {
    pub limit: Option<i64>,
    pub status: Option<String>,
}

fn parse_status(raw: &str) -> Result<OrderStatus> {
    raw.parse().map_err(|_| {
        AppError::BadRequest(format!(
            "Invalid status. Must be one of: {}",
            OrderStatus::choices()
        ))
    })
}

/// GET /api/orders/my-orders
pub async fn my_orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<MyOrdersQuery>,
) -> Result<Response> {
    let status = query
        .status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_status)
        .transpose()?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).max(1);

    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id, limit, status)
        .await?;
    Ok(success(
        StatusCode::OK,
        json!({"count": orders.len(), "orders": orders}),
    ))
}

/// GET /api/orders/statistics
pub async fn statistics(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Response> {
    let statistics = OrderRepository::new(state.pool()).statistics(user.id).await?;
    Ok(success(StatusCode::OK, json!({"statistics": statistics})))
}

/// GET /api/orders/{id}
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Response> {
    let order = OrderRepository::new(state.pool())
        .get_detail(id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
    Ok(success(StatusCode::OK, json!({"order": order})))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: Option<String>,
}

/// PUT /api/orders/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
    MaybeJson(body): MaybeJson<StatusRequest>,
) -> Result<Response> {
    let raw = required(body.as_ref().and_then(|b| b.status.as_deref()), "Status")?;
    let status = parse_status(raw)?;

    match OrderRepository::new(state.pool())
        .update_status(id, user.id, status)
        .await
    {
        Ok(()) => {}
        Err(RepositoryError::NotFound) => {
            return Err(AppError::BadRequest(
                "Order not found or unauthorized".to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(order_id = %id, status = %status, "Order status updated");
    Ok(success(
        StatusCode::OK,
        json!({"message": format!("Order status updated to {status}")}),
    ))
}

/// POST /api/orders/{id}/cancel
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Response> {
    OrderService::new(state.pool()).cancel(id, user.id).await?;
    Ok(success(
        StatusCode::OK,
        json!({"message": "Order cancelled successfully"}),
    ))
}

/// DELETE /api/orders/{id}
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Response> {
    let deleted = OrderRepository::new(state.pool()).delete(id, user.id).await?;
    if !deleted {
        return Err(AppError::BadRequest("Order not found".to_string()));
    }

    tracing::info!(order_id = %id, "Order deleted");
    Ok(success(
        StatusCode::OK,
        json!({"message": "Order deleted successfully"}),
    ))
}

/// GET /api/orders/health
pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok", "service": "orders"}))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("Ready").unwrap(), OrderStatus::Ready);

        let err = parse_status("shipped").unwrap_err();
        match err {
            AppError::BadRequest(msg) => assert_eq!(
                msg,
                "Invalid status. Must be one of: pending, confirmed, processing, ready, delivered, cancelled"
            ),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_status_request_tolerates_missing_field() {
        let body: StatusRequest = serde_json::from_value(json!({})).unwrap();
        assert!(body.status.is_none());
    }
}
