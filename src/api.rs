//! HTTP surface of the storefront cart service.

use std::sync::Arc;

use axum::{extract::{Path, Query, State}, http::StatusCode, response::{IntoResponse, Response}, routing::{get, post}, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::checkout::{Checkout, CheckoutForm};
use crate::domain::aggregates::{Cart, ProductSnapshot};
use crate::domain::events::{CheckoutEvent, DomainEvent};
use crate::domain::value_objects::ShippingSelection;
use crate::pricing::{AppliedCoupon, OrderTotals, PricingEngine};
use crate::publisher::EventPublisher;
use crate::remote::OrderGateway;
use crate::service::CartService;
use crate::StorefrontError;

#[derive(Clone)]
pub struct AppState {
    pub carts: CartService,
    pub pricing: PricingEngine,
    pub orders: Arc<dyn OrderGateway>,
    pub publisher: Arc<dyn EventPublisher>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront-cart"})) }))
        .route("/api/v1/sessions/:session/cart", get(get_cart))
        .route("/api/v1/sessions/:session/cart/items", post(add_item).put(set_quantity).delete(remove_item))
        .route("/api/v1/sessions/:session/cart/merge", post(merge_cart))
        .route("/api/v1/sessions/:session/quote", post(quote))
        .route("/api/v1/sessions/:session/checkout", post(checkout))
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> { pub success: bool, pub data: T }

fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> { Json(ApiResponse { success: true, data }) }

/// Maps [`StorefrontError`] onto a status code and a `{success: false, message}` body.
pub struct ApiError(StorefrontError);

impl<E: Into<StorefrontError>> From<E> for ApiError {
    fn from(e: E) -> Self { Self(e.into()) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            StorefrontError::InvalidQuantity => (StatusCode::BAD_REQUEST, self.0.to_string()),
            StorefrontError::MutationInFlight(_) => (StatusCode::CONFLICT, "This item is still being updated.".to_string()),
            StorefrontError::Checkout(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            StorefrontError::MergeInterrupted { .. } | StorefrontError::Remote(_) => {
                tracing::error!(error = %self.0, "remote call failed");
                (StatusCode::BAD_GATEWAY, "Something went wrong, please try again.".to_string())
            }
            StorefrontError::Storage(_) => {
                tracing::error!(error = %self.0, "storage failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong, please try again.".to_string())
            }
        };
        (status, Json(serde_json::json!({"success": false, "message": message}))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerQuery { pub owner_id: Option<String> }

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub owner_id: Option<String>,
    pub product_id: String,
    #[serde(default)]
    pub size: Option<String>,
    pub quantity: u32,
    #[serde(default)]
    pub snapshot: ProductSnapshot,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetQuantityRequest {
    pub owner_id: Option<String>,
    pub product_id: String,
    #[serde(default)]
    pub size: Option<String>,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveItemQuery {
    pub owner_id: Option<String>,
    pub product_id: String,
    pub size: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest { pub user_id: String }

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub owner_id: Option<String>,
    #[serde(default)]
    pub shipping: Option<ShippingSelection>,
    #[serde(default)]
    pub coupon: Option<AppliedCoupon>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub form: CheckoutForm,
    #[serde(default)]
    pub coupon: Option<AppliedCoupon>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub order_ref: uuid::Uuid,
    pub order_id: Option<String>,
    #[serde(rename = "approvalURL")]
    pub approval_url: Option<String>,
    pub totals: OrderTotals,
}

async fn get_cart(State(s): State<AppState>, Path(session): Path<String>, Query(q): Query<OwnerQuery>) -> ApiResult<Cart> {
    Ok(ok(s.carts.session(&session).fetch(q.owner_id.as_deref()).await?))
}

async fn add_item(State(s): State<AppState>, Path(session): Path<String>, Json(r): Json<AddItemRequest>) -> ApiResult<Cart> {
    let cart = s.carts.session(&session)
        .add_item(r.owner_id.as_deref(), &r.product_id, r.size.as_deref(), r.quantity, &r.snapshot)
        .await?;
    Ok(ok(cart))
}

async fn set_quantity(State(s): State<AppState>, Path(session): Path<String>, Json(r): Json<SetQuantityRequest>) -> ApiResult<Cart> {
    let cart = s.carts.session(&session)
        .set_quantity(r.owner_id.as_deref(), &r.product_id, r.size.as_deref(), r.quantity)
        .await?;
    Ok(ok(cart))
}

async fn remove_item(State(s): State<AppState>, Path(session): Path<String>, Query(q): Query<RemoveItemQuery>) -> ApiResult<Cart> {
    let cart = s.carts.session(&session).remove_item(q.owner_id.as_deref(), &q.product_id, q.size.as_deref()).await?;
    Ok(ok(cart))
}

async fn merge_cart(State(s): State<AppState>, Path(session): Path<String>, Json(r): Json<MergeRequest>) -> ApiResult<Cart> {
    Ok(ok(s.carts.session(&session).merge_on_login(&r.user_id).await?))
}

async fn quote(State(s): State<AppState>, Path(session): Path<String>, Json(r): Json<QuoteRequest>) -> ApiResult<OrderTotals> {
    let cart = s.carts.session(&session).fetch(r.owner_id.as_deref()).await?;
    Ok(ok(s.pricing.quote(cart.items(), r.shipping.as_ref(), r.coupon.as_ref())))
}

async fn checkout(State(s): State<AppState>, Path(session): Path<String>, Json(r): Json<CheckoutRequest>) -> ApiResult<CheckoutResponse> {
    let mut checkout = Checkout::new(r.form, s.pricing.clone());
    checkout.validate()?;
    let cart = s.carts.session(&session).fetch(checkout.form().owner_id.as_deref()).await?;
    let payload = checkout.build_order_payload(&cart, r.coupon.as_ref())?;
    match checkout.submit(s.orders.as_ref(), &payload).await {
        Ok(initiation) => {
            s.publisher.publish(DomainEvent::Checkout(CheckoutEvent::Submitted {
                order_ref: payload.order_ref, owner_id: payload.owner_id.clone(), total: payload.totals.total, at: Utc::now(),
            })).await;
            Ok(ok(CheckoutResponse {
                order_ref: payload.order_ref, order_id: initiation.order_id,
                approval_url: initiation.approval_url, totals: payload.totals,
            }))
        }
        Err(e) => {
            s.publisher.publish(DomainEvent::Checkout(CheckoutEvent::Failed {
                order_ref: payload.order_ref, reason: e.to_string(), at: Utc::now(),
            })).await;
            Err(e.into())
        }
    }
}
