//! Premium membership checkout.

use chrono::{Duration, Utc};

use super::{ServiceError, ServiceResult};
use crate::payments::{CreatedOrder, OrderRequest};
use crate::storage::models::{Payment, Tier, User};
use crate::AppState;

pub struct CaptureResult {
    pub payment: Payment,
    pub user: User,
    /// False when this capture had already been recorded
    pub newly_recorded: bool,
}

fn validate_order_id(order_id: &str) -> ServiceResult<&str> {
    let order_id = order_id.trim();
    if order_id.is_empty()
        || order_id.len() > 64
        || !order_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(ServiceError::validation("orderId is not a valid order id"));
    }
    Ok(order_id)
}

/// A capture that was already recorded. Only its buyer gets to see it.
fn replayed(state: &AppState, caller: &User, payment: Payment) -> ServiceResult<CaptureResult> {
    if payment.user_id != caller.id {
        tracing::warn!(
            order_id = %payment.order_id,
            caller = %caller.id,
            "Capture replayed by a different user"
        );
        return Err(ServiceError::not_found("Order not found"));
    }
    let user = state
        .db
        .get_user(&payment.user_id)?
        .ok_or_else(|| ServiceError::not_found("User not found"))?;
    Ok(CaptureResult {
        payment,
        user,
        newly_recorded: false,
    })
}

/// Open a checkout order for one premium period at the configured price.
pub async fn create_order(state: &AppState, user: &User) -> ServiceResult<CreatedOrder> {
    let paypal = &state.config.paypal;
    let order = OrderRequest {
        amount: paypal.premium_price.clone(),
        currency: paypal.currency.clone(),
        description: format!("Komuness premium ({} days)", paypal.premium_days),
    };

    let created = state.gateway.create_order(&order).await?;
    tracing::info!(order_id = %created.id, user_id = %user.id, "Checkout order created");
    Ok(created)
}

/// Capture an approved order, record it and upgrade the buyer.
///
/// Replaying a capture that was already recorded returns the stored payment
/// and does not extend the membership again. Admins keep their tier.
pub async fn capture_order(state: &AppState, user: &User, order_id: &str) -> ServiceResult<CaptureResult> {
    let order_id = validate_order_id(order_id)?;

    if let Some(existing) = state.db.get_payment_by_reference(order_id)? {
        return replayed(state, user, existing);
    }

    let outcome = state.gateway.capture_order(order_id).await?;
    if !outcome.is_completed() {
        tracing::warn!(order_id = %order_id, status = %outcome.status, "Capture did not complete");
        return Err(ServiceError::validation(format!(
            "Payment was not completed (status {})",
            outcome.status
        )));
    }

    let now = Utc::now();
    let payment = Payment {
        id: uuid::Uuid::new_v4().to_string(),
        order_id: outcome.order_id.clone(),
        capture_id: outcome.capture_id.clone(),
        user_id: user.id.clone(),
        status: outcome.status.clone(),
        amount: outcome
            .amount
            .clone()
            .unwrap_or_else(|| state.config.paypal.premium_price.clone()),
        currency: outcome
            .currency
            .clone()
            .unwrap_or_else(|| state.config.paypal.currency.clone()),
        raw: outcome.raw.to_string(),
        created_at: now,
    };

    let (payment, newly_recorded) = state.db.record_payment(&payment)?;
    if !newly_recorded {
        return replayed(state, user, payment);
    }

    let days = state.config.paypal.premium_days;
    let (user, ()) = state
        .db
        .modify_user(&user.id, |u| -> ServiceResult<()> {
            if !u.tier.is_admin() {
                let start = u.premium_until.filter(|until| *until > now).unwrap_or(now);
                u.tier = Tier::Premium;
                u.premium_until = Some(start + Duration::days(days));
            }
            Ok(())
        })?
        .ok_or_else(|| ServiceError::not_found("User not found"))?;

    tracing::info!(
        order_id = %payment.order_id,
        capture_id = ?payment.capture_id,
        user_id = %user.id,
        amount = %payment.amount,
        currency = %payment.currency,
        premium_until = ?user.premium_until,
        "Payment captured"
    );

    Ok(CaptureResult {
        payment,
        user,
        newly_recorded,
    })
}

pub fn list_payments(state: &AppState, user_id: Option<&str>) -> ServiceResult<Vec<Payment>> {
    Ok(state.db.list_payments(user_id)?)
}
