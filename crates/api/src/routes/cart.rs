//! Cart read and mutation endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use cart::{CartItem, CartItemDraft, CartStorage, ItemId, normalize_item};
use serde::Serialize;

use crate::error::ApiError;

use super::AppState;

// -- Response types --

#[derive(Serialize)]
pub struct CartItemResponse {
    pub id: String,
    pub title: String,
    pub slug: Option<String>,
    pub unit_price_cents: Option<i64>,
    pub currency: String,
    pub brand: Option<String>,
    pub cover_image: Option<String>,
    pub quantity: u32,
    pub kind: String,
    pub line_total_cents: i64,
}

impl From<&CartItem> for CartItemResponse {
    fn from(item: &CartItem) -> Self {
        Self {
            id: item.id.as_str().to_string(),
            title: item.title.clone(),
            slug: item.slug.clone(),
            unit_price_cents: item.unit_price.map(|p| p.cents()),
            currency: item.currency.as_str().to_string(),
            brand: item.brand.clone(),
            cover_image: item.cover_image.clone(),
            quantity: item.quantity,
            kind: item.kind.as_str().to_string(),
            line_total_cents: item.line_total().cents(),
        }
    }
}

#[derive(Serialize)]
pub struct FreeShippingResponse {
    pub remaining_cents: i64,
    pub percent: u8,
    pub unlocked: bool,
}

#[derive(Serialize)]
pub struct CartResponse {
    pub items: Vec<CartItemResponse>,
    pub subtotal_cents: i64,
    pub item_count: u32,
    /// True when any line books a service appointment; drives whether the
    /// checkout surface asks for scheduling preferences.
    pub has_services: bool,
    pub free_shipping: Option<FreeShippingResponse>,
}

async fn cart_response<S: CartStorage>(
    state: &AppState<S>,
    items: &[CartItem],
) -> Result<CartResponse, ApiError> {
    let free_shipping = state
        .flow
        .free_shipping()
        .await?
        .map(|progress| FreeShippingResponse {
            remaining_cents: progress.remaining.cents(),
            percent: progress.percent,
            unlocked: progress.unlocked(),
        });

    Ok(CartResponse {
        items: items.iter().map(CartItemResponse::from).collect(),
        subtotal_cents: cart::subtotal(items).cents(),
        item_count: cart::item_count(items),
        has_services: cart::has_service_items(items),
        free_shipping,
    })
}

// -- Handlers --

/// GET /cart — current cart contents with derived totals.
#[tracing::instrument(skip(state))]
pub async fn get_cart<S: CartStorage>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<CartResponse>, ApiError> {
    let items = state.flow.cart().read().await?;
    Ok(Json(cart_response(&state, &items).await?))
}

/// POST /cart/items — add (or merge) a line item.
#[tracing::instrument(skip(state, draft))]
pub async fn add_item<S: CartStorage>(
    State(state): State<Arc<AppState<S>>>,
    Json(draft): Json<CartItemDraft>,
) -> Result<(StatusCode, Json<CartResponse>), ApiError> {
    if normalize_item(draft.clone()).is_none() {
        return Err(ApiError::BadRequest(
            "item identifier and title are required".to_string(),
        ));
    }

    let items = state.flow.cart().add(draft).await?;
    Ok((StatusCode::CREATED, Json(cart_response(&state, &items).await?)))
}

/// POST /cart/items/:id/increment — bump a line's quantity.
#[tracing::instrument(skip(state))]
pub async fn increment<S: CartStorage>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let id = require_line(&state, &id).await?;
    let items = state.flow.cart().increment(&id).await?;
    Ok(Json(cart_response(&state, &items).await?))
}

/// POST /cart/items/:id/decrement — lower a line's quantity, removing at zero.
#[tracing::instrument(skip(state))]
pub async fn decrement<S: CartStorage>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let id = require_line(&state, &id).await?;
    let items = state.flow.cart().decrement(&id).await?;
    Ok(Json(cart_response(&state, &items).await?))
}

/// DELETE /cart/items/:id — remove a line entirely.
#[tracing::instrument(skip(state))]
pub async fn remove_item<S: CartStorage>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let id = require_line(&state, &id).await?;
    let items = state.flow.cart().remove(&id).await?;
    Ok(Json(cart_response(&state, &items).await?))
}

/// DELETE /cart — empty the cart.
#[tracing::instrument(skip(state))]
pub async fn clear<S: CartStorage>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<StatusCode, ApiError> {
    state.flow.cart().clear().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /cart/open — ask presentation surfaces to open the cart view.
#[tracing::instrument(skip(state))]
pub async fn open<S: CartStorage>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<StatusCode, ApiError> {
    state.flow.cart().request_open();
    Ok(StatusCode::ACCEPTED)
}

async fn require_line<S: CartStorage>(
    state: &AppState<S>,
    raw_id: &str,
) -> Result<ItemId, ApiError> {
    let id = ItemId::new(raw_id);
    let items = state.flow.cart().read().await?;
    if items.iter().any(|item| item.id == id) {
        Ok(id)
    } else {
        Err(ApiError::NotFound(format!("no cart line with id {raw_id}")))
    }
}
