use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::api::response::{ApiError, JSend};
use crate::auth::CurrentUser;
use crate::payments::CreatedOrder;
use crate::services::payments;
use crate::services::users::UserView;
use crate::storage::models::Payment;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentView {
    pub id: String,
    pub order_id: String,
    pub capture_id: Option<String>,
    pub user_id: String,
    pub status: String,
    pub amount: String,
    pub currency: String,
    pub created_at: String,
}

impl From<&Payment> for PaymentView {
    fn from(p: &Payment) -> Self {
        PaymentView {
            id: p.id.clone(),
            order_id: p.order_id.clone(),
            capture_id: p.capture_id.clone(),
            user_id: p.user_id.clone(),
            status: p.status.clone(),
            amount: p.amount.clone(),
            currency: p.currency.clone(),
            created_at: p.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CaptureResponse {
    pub pago: PaymentView,
    pub usuario: UserView,
}

pub async fn create_order(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<JSend<CreatedOrder>>, ApiError> {
    Ok(JSend::success(payments::create_order(&state, &user).await?))
}

pub async fn capture_order(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<String>,
) -> Result<Json<JSend<CaptureResponse>>, ApiError> {
    let result = payments::capture_order(&state, &user, &order_id).await?;
    Ok(JSend::success(CaptureResponse {
        pago: PaymentView::from(&result.payment),
        usuario: UserView::from(&result.user),
    }))
}

pub async fn my_payments(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<JSend<Vec<PaymentView>>>, ApiError> {
    let all = payments::list_payments(&state, Some(&user.id))?;
    Ok(JSend::success(all.iter().map(PaymentView::from).collect()))
}

pub async fn all_payments(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<Vec<PaymentView>>>, ApiError> {
    let all = payments::list_payments(&state, None)?;
    Ok(JSend::success(all.iter().map(PaymentView::from).collect()))
}
