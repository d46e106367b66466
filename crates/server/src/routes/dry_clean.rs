//! Dry-clean pickup and contact form route handlers.
//!
//! Pickups can be booked without an account; a valid bearer token links the
//! pickup to the customer.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Value, json};

use quick_laundry_core::{DryCleanOrderId, DryCleanStatus, Email, UserId};

use super::{MaybeJson, required, success};
use crate::db::{DryCleanFilter, DryCleanRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::models::{NewContact, NewDryCleanOrder};
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 100;

/// Collects the names of blank required fields.
#[derive(Debug, Default)]
struct MissingFields(Vec<&'static str>);

impl MissingFields {
    fn text<'a>(&mut self, name: &'static str, value: Option<&'a str>) -> &'a str {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => v,
            None => {
                self.0.push(name);
                ""
            }
        }
    }

    fn finish(self) -> Result<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(AppError::BadRequest(format!(
                "Missing required fields: {}",
                self.0.join(", ")
            )))
        }
    }
}

/// Pickup booking as sent by the website form.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PickupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub service: Option<String>,
    /// Free text, or any JSON the form chose to send.
    pub items: Option<Value>,
    pub pickup_date: Option<String>,
    pub pickup_time: Option<String>,
    pub special_instructions: Option<String>,
}

/// Items are stored as text; structured values keep their JSON form.
fn items_text(items: Option<&Value>) -> Option<String> {
    match items? {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}

impl PickupRequest {
    fn validate(self, user_id: Option<UserId>) -> Result<NewDryCleanOrder> {
        let items = items_text(self.items.as_ref());

        let mut missing = MissingFields::default();
        let name = missing.text("name", self.name.as_deref());
        let email = missing.text("email", self.email.as_deref());
        let phone = missing.text("phone", self.phone.as_deref());
        let address = missing.text("address", self.address.as_deref());
        let service = missing.text("service", self.service.as_deref());
        let items = missing.text("items", items.as_deref());
        let pickup_date = missing.text("pickupDate", self.pickup_date.as_deref());
        let pickup_time = missing.text("pickupTime", self.pickup_time.as_deref());
        missing.finish()?;

        let pickup_date = NaiveDate::parse_from_str(pickup_date, "%Y-%m-%d").map_err(|_| {
            AppError::BadRequest("Invalid pickup date. Use YYYY-MM-DD".to_string())
        })?;

        Ok(NewDryCleanOrder {
            user_id,
            name: name.to_string(),
            email: Email::parse(email)?,
            phone: phone.to_string(),
            address: address.to_string(),
            service: service.to_string(),
            items: items.to_string(),
            pickup_date,
            pickup_time: pickup_time.to_string(),
            special_instructions: self
                .special_instructions
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
        })
    }
}

/// POST /api/dry-clean/orders
pub async fn create_order(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    MaybeJson(body): MaybeJson<PickupRequest>,
) -> Result<Response> {
    let body = body.ok_or_else(|| AppError::BadRequest("Request body is required".to_string()))?;
    let new_order = body.validate(user.map(|u| u.id))?;

    let order = DryCleanRepository::new(state.pool())
        .create_order(&new_order)
        .await?;
    tracing::info!(order_id = %order.id, pickup = %order.pickup_date, "Dry clean pickup booked");

    Ok(success(
        StatusCode::CREATED,
        json!({"message": "Order placed successfully!", "order": order}),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub email: Option<String>,
}

fn parse_status(raw: &str) -> Result<DryCleanStatus> {
    raw.parse().map_err(|_| {
        AppError::BadRequest(format!(
            "Invalid status. Must be one of: {}",
            DryCleanStatus::choices()
        ))
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl ListQuery {
    fn filter(&self) -> Result<DryCleanFilter> {
        Ok(DryCleanFilter {
            status: non_blank(self.status.as_deref())
                .map(parse_status)
                .transpose()?,
            email: non_blank(self.email.as_deref()).map(str::to_lowercase),
            limit: self.limit.unwrap_or(DEFAULT_LIMIT).max(1),
        })
    }
}

/// GET /api/dry-clean/orders
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Response> {
    let orders = DryCleanRepository::new(state.pool())
        .list_orders(&query.filter()?)
        .await?;
    Ok(success(
        StatusCode::OK,
        json!({"count": orders.len(), "orders": orders}),
    ))
}

/// GET /api/dry-clean/orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<DryCleanOrderId>,
) -> Result<Response> {
    let order = DryCleanRepository::new(state.pool())
        .get_order(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
    Ok(success(StatusCode::OK, json!({"order": order})))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: Option<String>,
}

/// PUT /api/dry-clean/orders/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<DryCleanOrderId>,
    MaybeJson(body): MaybeJson<StatusRequest>,
) -> Result<Response> {
    let raw = required(body.as_ref().and_then(|b| b.status.as_deref()), "Status")?;
    let status = parse_status(raw)?;

    let order = match DryCleanRepository::new(state.pool())
        .update_status(id, status)
        .await
    {
        Ok(order) => order,
        Err(RepositoryError::NotFound) => {
            return Err(AppError::BadRequest("Order not found".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(order_id = %id, status = %status, "Dry clean status updated");
    Ok(success(
        StatusCode::OK,
        json!({"message": format!("Order status updated to {status}"), "order": order}),
    ))
}

/// DELETE /api/dry-clean/orders/{id}
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<DryCleanOrderId>,
) -> Result<Response> {
    if !DryCleanRepository::new(state.pool()).delete_order(id).await? {
        return Err(AppError::NotFound("Order not found".to_string()));
    }
    Ok(success(
        StatusCode::OK,
        json!({"message": "Order deleted successfully"}),
    ))
}

/// GET /api/dry-clean/statistics
pub async fn statistics(State(state): State<AppState>) -> Result<Response> {
    let statistics = DryCleanRepository::new(state.pool()).statistics().await?;
    Ok(success(StatusCode::OK, json!({"statistics": statistics})))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

impl ContactRequest {
    fn validate(&self) -> Result<NewContact> {
        let mut missing = MissingFields::default();
        let name = missing.text("name", self.name.as_deref());
        let email = missing.text("email", self.email.as_deref());
        let subject = missing.text("subject", self.subject.as_deref());
        let message = missing.text("message", self.message.as_deref());
        missing.finish()?;

        Ok(NewContact {
            name: name.to_string(),
            email: Email::parse(email)?,
            phone: non_blank(self.phone.as_deref()).map(str::to_string),
            subject: subject.to_string(),
            message: message.to_string(),
        })
    }
}

/// POST /api/dry-clean/contact
pub async fn contact(
    State(state): State<AppState>,
    MaybeJson(body): MaybeJson<ContactRequest>,
) -> Result<Response> {
    let new_contact = body.unwrap_or_default().validate()?;
    let contact = DryCleanRepository::new(state.pool())
        .create_contact(&new_contact)
        .await?;
    tracing::info!(contact_id = %contact.id, "Contact form received");

    Ok(success(
        StatusCode::CREATED,
        json!({
            "message": "Thank you for contacting us! We will get back to you soon.",
            "contact_id": contact.id,
        }),
    ))
}

/// GET /api/dry-clean/health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match DryCleanRepository::new(state.pool()).count_orders().await {
        Ok(total) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "message": "Dry Clean API is operational",
                "total_orders": total,
            })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Dry clean health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "unhealthy", "message": "Database unavailable"})),
            )
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn bad_request(err: AppError) -> String {
        match err {
            AppError::BadRequest(msg) => msg,
            other => panic!("unexpected {other:?}"),
        }
    }

    fn pickup() -> PickupRequest {
        serde_json::from_value(json!({
            "name": "Meera",
            "email": "meera@example.com",
            "phone": "9876543210",
            "address": "4 Park Street",
            "service": "Dry Clean",
            "items": "2 sarees",
            "pickupDate": "2026-03-14",
            "pickupTime": "10:00-12:00",
        }))
        .unwrap()
    }

    #[test]
    fn test_pickup_validates() {
        let order = pickup().validate(None).unwrap();
        assert_eq!(order.pickup_date, NaiveDate::from_ymd_opt(2026, 3, 14).unwrap());
        assert_eq!(order.items, "2 sarees");
        assert_eq!(order.special_instructions, "");
    }

    #[test]
    fn test_pickup_lists_missing_fields() {
        let mut request = pickup();
        request.phone = Some("  ".to_string());
        request.pickup_time = None;
        assert_eq!(
            bad_request(request.validate(None).unwrap_err()),
            "Missing required fields: phone, pickupTime"
        );
    }

    #[test]
    fn test_pickup_rejects_bad_date() {
        let mut request = pickup();
        request.pickup_date = Some("14/03/2026".to_string());
        assert_eq!(
            bad_request(request.validate(None).unwrap_err()),
            "Invalid pickup date. Use YYYY-MM-DD"
        );
    }

    #[test]
    fn test_structured_items_become_json_text() {
        assert_eq!(
            items_text(Some(&json!([{"type": "suit", "qty": 1}]))).unwrap(),
            r#"[{"qty":1,"type":"suit"}]"#
        );
        assert_eq!(items_text(Some(&Value::Null)), None);
    }

    #[test]
    fn test_contact_requires_fields() {
        let request = ContactRequest {
            name: Some("Meera".to_string()),
            ..ContactRequest::default()
        };
        assert_eq!(
            bad_request(request.validate().unwrap_err()),
            "Missing required fields: email, subject, message"
        );
    }

    #[test]
    fn test_list_query_filter() {
        let query = ListQuery {
            status: Some("Completed".to_string()),
            limit: None,
            email: Some(" ".to_string()),
        };
        let filter = query.filter().unwrap();
        assert_eq!(filter.status, Some(DryCleanStatus::Completed));
        assert!(filter.email.is_none());
        assert_eq!(filter.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn test_malformed_email_filter_matches_nothing_instead_of_failing() {
        let query = ListQuery {
            status: None,
            limit: Some(5),
            email: Some("  Not-An@Address ".to_string()),
        };
        let filter = query.filter().unwrap();
        assert_eq!(filter.email.as_deref(), Some("not-an@address"));
        assert_eq!(filter.limit, 5);
    }
}
