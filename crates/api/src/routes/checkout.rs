//! Checkout step, session, and quote endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use cart::CartStorage;
use checkout::{
    AppointmentPreference, CheckoutMessage, CheckoutStep, CustomerSnapshot, FulfillmentMode,
    StepIntent,
};
use orchestrator::{PaymentSession, QuoteSnapshot, ShippingOptionId, Suggestion};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

use super::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct FulfillmentRequest {
    pub mode: FulfillmentMode,
}

#[derive(Deserialize)]
pub struct AdvanceRequest {
    pub intent: StepIntent,
}

#[derive(Deserialize)]
pub struct ShippingSelectionRequest {
    pub id: String,
}

#[derive(Deserialize)]
pub struct CompleteRequest {
    pub payment_intent_id: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct MessageResponse {
    pub key: &'static str,
    pub message: String,
}

impl From<CheckoutMessage> for MessageResponse {
    fn from(message: CheckoutMessage) -> Self {
        Self {
            key: message.key(),
            message: message.to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub client_secret: String,
    pub publishable_key: String,
    pub order_id: Option<String>,
    pub order_number: Option<String>,
}

impl From<PaymentSession> for SessionResponse {
    fn from(session: PaymentSession) -> Self {
        Self {
            client_secret: session.client_secret,
            publishable_key: session.publishable_key,
            order_id: session.order_id,
            order_number: session.order_number,
        }
    }
}

#[derive(Serialize)]
pub struct QuoteOptionResponse {
    pub id: String,
    pub name: String,
    pub amount_cents: i64,
    pub currency: String,
    pub delivery_estimate: String,
}

#[derive(Serialize)]
pub struct QuoteResponse {
    pub amount_cents: Option<i64>,
    pub currency: Option<String>,
    pub options: Vec<QuoteOptionResponse>,
    pub selected: Option<String>,
}

impl From<QuoteSnapshot> for QuoteResponse {
    fn from(snapshot: QuoteSnapshot) -> Self {
        Self {
            amount_cents: snapshot.amount.map(|a| a.cents()),
            currency: snapshot.currency.map(|c| c.as_str().to_string()),
            options: snapshot
                .options
                .iter()
                .map(|option| QuoteOptionResponse {
                    id: option.id.as_str().to_string(),
                    name: option.name.clone(),
                    amount_cents: option.amount.cents(),
                    currency: option.currency.as_str().to_string(),
                    delivery_estimate: option.delivery_estimate.clone(),
                })
                .collect(),
            selected: snapshot.selected.map(|id| id.as_str().to_string()),
        }
    }
}

#[derive(Serialize)]
pub struct SuggestionResponse {
    pub id: String,
    pub title: String,
    pub slug: Option<String>,
    pub unit_price_cents: Option<i64>,
    pub currency: String,
    pub cover_image: Option<String>,
}

impl From<Suggestion> for SuggestionResponse {
    fn from(suggestion: Suggestion) -> Self {
        Self {
            id: suggestion.id.as_str().to_string(),
            title: suggestion.title,
            slug: suggestion.slug,
            unit_price_cents: suggestion.unit_price.map(|p| p.cents()),
            currency: suggestion.currency.as_str().to_string(),
            cover_image: suggestion.cover_image,
        }
    }
}

#[derive(Serialize)]
pub struct CheckoutStateResponse {
    pub step: String,
    pub express_ready: bool,
    pub session: Option<SessionResponse>,
    pub session_error: Option<MessageResponse>,
    pub prefetch_error: Option<MessageResponse>,
    pub quote: QuoteResponse,
    pub suggestion: Option<SuggestionResponse>,
}

#[derive(Serialize)]
pub struct AdvanceResponse {
    pub step: String,
    pub session_error: Option<MessageResponse>,
}

#[derive(Serialize)]
pub struct CompleteResponse {
    pub status: &'static str,
}

// -- Handlers --

/// GET /checkout — the full checkout state for rendering.
#[tracing::instrument(skip(state))]
pub async fn get_state<S: CartStorage>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<CheckoutStateResponse>, ApiError> {
    let flow = &state.flow;
    Ok(Json(CheckoutStateResponse {
        step: flow.step().as_str().to_string(),
        express_ready: flow.express_ready(),
        session: flow.session().map(SessionResponse::from),
        session_error: flow.session_error().map(MessageResponse::from),
        prefetch_error: flow.prefetch_error().map(MessageResponse::from),
        quote: QuoteResponse::from(flow.quote()),
        suggestion: flow.suggestion().map(SuggestionResponse::from),
    }))
}

/// PUT /checkout/customer — replace the customer snapshot.
#[tracing::instrument(skip(state, snapshot))]
pub async fn set_customer<S: CartStorage>(
    State(state): State<Arc<AppState<S>>>,
    Json(snapshot): Json<CustomerSnapshot>,
) -> Result<StatusCode, ApiError> {
    state.flow.set_customer(snapshot).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /checkout/fulfillment — switch between shipping and pickup.
#[tracing::instrument(skip(state, request))]
pub async fn set_fulfillment<S: CartStorage>(
    State(state): State<Arc<AppState<S>>>,
    Json(request): Json<FulfillmentRequest>,
) -> Result<StatusCode, ApiError> {
    state.flow.set_fulfillment(request.mode).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /checkout/appointment — update the service-appointment preference.
#[tracing::instrument(skip(state, preference))]
pub async fn set_appointment<S: CartStorage>(
    State(state): State<Arc<AppState<S>>>,
    Json(preference): Json<AppointmentPreference>,
) -> Result<StatusCode, ApiError> {
    state.flow.set_appointment(preference);
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /checkout/shipping-option — pick a quoted shipping method.
#[tracing::instrument(skip(state, request))]
pub async fn select_shipping<S: CartStorage>(
    State(state): State<Arc<AppState<S>>>,
    Json(request): Json<ShippingSelectionRequest>,
) -> Result<StatusCode, ApiError> {
    if state
        .flow
        .select_shipping_option(&ShippingOptionId::new(request.id.clone()))
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!(
            "shipping option {} is not offered",
            request.id
        )))
    }
}

/// POST /checkout/advance — run a step intent.
///
/// Step-machine refusals map to 422; stock conflicts raised while entering
/// the payment step map to 409. A gateway outage is not an HTTP error: the
/// step still advances and the failure rides along in the body.
#[tracing::instrument(skip(state, request))]
pub async fn advance<S: CartStorage>(
    State(state): State<Arc<AppState<S>>>,
    Json(request): Json<AdvanceRequest>,
) -> Result<Json<AdvanceResponse>, ApiError> {
    let result = state.flow.advance(request.intent).await?;

    if let Some(message) = result.error {
        return Err(ApiError::Validation(message));
    }

    let session_error = if result.next == CheckoutStep::Payment {
        match state.flow.session_error() {
            Some(
                conflict @ (CheckoutMessage::ItemsUnavailable { .. }
                | CheckoutMessage::InsufficientStock { .. }),
            ) => return Err(ApiError::Conflict(conflict)),
            other => other.map(MessageResponse::from),
        }
    } else {
        None
    };

    Ok(Json(AdvanceResponse {
        step: result.next.as_str().to_string(),
        session_error,
    }))
}

/// POST /checkout/complete — finish the order after gateway-side success.
#[tracing::instrument(skip(state, request))]
pub async fn complete<S: CartStorage>(
    State(state): State<Arc<AppState<S>>>,
    Json(request): Json<CompleteRequest>,
) -> Result<Json<CompleteResponse>, ApiError> {
    if state.flow.session().is_none() {
        return Err(ApiError::BadRequest(
            "no active payment session to complete".to_string(),
        ));
    }

    state.flow.complete_order(&request.payment_intent_id).await?;
    metrics::counter!("checkout_completions_http_total").increment(1);
    Ok(Json(CompleteResponse {
        status: "completed",
    }))
}
