//! Request/response types and handlers for the REST surface.

use crate::api::AppState;
use crate::core::order::{EarnSummary, OrderEvent};
use crate::core::redemption::RedemptionCheck;
use crate::core::transfer::TransferOutcome;
use crate::core::{account, ledger, order, redemption, transfer};
use crate::entities::{loyalty_account, point_transaction, redemption as redemption_entity};
use crate::errors::Error;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

/// Error payload returned for every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

fn map_error(err: Error) -> ApiError {
    let status = match &err {
        Error::AccountNotFound { .. } => StatusCode::NOT_FOUND,
        Error::Conflict { .. } | Error::StockExhausted => StatusCode::CONFLICT,
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(error = %err, "Request failed");
        "internal server error".to_string()
    } else {
        err.to_string()
    };

    (status, Json(ErrorResponse { error: message }))
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Deserialize)]
pub struct EnsureAccountRequest {
    pub customer_id: i64,
    pub brand_id: i64,
    #[serde(default)]
    pub preferred_branch_id: Option<i64>,
}

/// POST /loyalty/accounts/ensure - Create-or-get the (customer, brand)
/// account; creation applies any active welcome campaign.
pub async fn ensure_account(
    State(state): State<AppState>,
    Json(request): Json<EnsureAccountRequest>,
) -> ApiResult<loyalty_account::Model> {
    account::ensure_account(
        &state.db,
        request.customer_id,
        request.brand_id,
        request.preferred_branch_id,
    )
    .await
    .map(Json)
    .map_err(map_error)
}

/// GET /loyalty/accounts/:id - Account balance, tier, and status.
pub async fn get_account(
    State(state): State<AppState>,
    Path(account_id): Path<i64>,
) -> ApiResult<loyalty_account::Model> {
    account::get_account(state.db.as_ref(), account_id)
        .await
        .map(Json)
        .map_err(map_error)
}

/// GET /loyalty/customers/:id/accounts - The customer's active accounts
/// across brands.
pub async fn list_customer_accounts(
    State(state): State<AppState>,
    Path(customer_id): Path<i64>,
) -> ApiResult<Vec<loyalty_account::Model>> {
    account::accounts_for_customer(&state.db, customer_id)
        .await
        .map(Json)
        .map_err(map_error)
}

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

const fn default_limit() -> u64 {
    20
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<point_transaction::Model>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

/// GET /loyalty/accounts/:id/transactions - Ledger history, newest first.
pub async fn list_transactions(
    State(state): State<AppState>,
    Path(account_id): Path<i64>,
    Query(query): Query<TransactionsQuery>,
) -> ApiResult<TransactionsResponse> {
    // Existence check so an empty history and a missing account differ
    account::get_account(state.db.as_ref(), account_id)
        .await
        .map_err(map_error)?;

    let (transactions, total) =
        ledger::transactions_for_account(&state.db, account_id, query.limit, query.offset)
            .await
            .map_err(map_error)?;

    Ok(Json(TransactionsResponse {
        transactions,
        total,
        limit: query.limit,
        offset: query.offset,
    }))
}

#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    pub points: i64,
    #[serde(default)]
    pub branch_id: Option<i64>,
    pub description: String,
}

/// POST /loyalty/accounts/:id/adjust - Administrative point correction.
pub async fn adjust_points(
    State(state): State<AppState>,
    Path(account_id): Path<i64>,
    Json(request): Json<AdjustRequest>,
) -> ApiResult<point_transaction::Model> {
    ledger::manual_adjust(
        &state.db,
        account_id,
        request.branch_id,
        request.points,
        request.description,
    )
    .await
    .map(Json)
    .map_err(map_error)
}

/// POST /loyalty/earn - Process a completed order: spend used points, credit
/// base points and campaign bonuses, recompute tier.
pub async fn process_order(
    State(state): State<AppState>,
    Json(event): Json<OrderEvent>,
) -> ApiResult<EarnSummary> {
    order::process_order(&state.db, state.branches.as_ref(), &event)
        .await
        .map(Json)
        .map_err(map_error)
}

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub account_id: i64,
    pub reward_id: i64,
    #[serde(default)]
    pub order_id: Option<i64>,
}

/// POST /loyalty/redeem - Redeem a catalog reward.
pub async fn redeem(
    State(state): State<AppState>,
    Json(request): Json<RedeemRequest>,
) -> ApiResult<redemption_entity::Model> {
    redemption::redeem(
        &state.db,
        request.account_id,
        request.reward_id,
        request.order_id,
    )
    .await
    .map(Json)
    .map_err(map_error)
}

#[derive(Debug, Deserialize)]
pub struct CheckRedemptionRequest {
    pub brand_id: i64,
    pub points_to_use: i64,
    pub order_total: i64,
}

/// POST /loyalty/check-redemption - Feasibility check for a points discount.
pub async fn check_redemption(
    State(state): State<AppState>,
    Json(request): Json<CheckRedemptionRequest>,
) -> ApiResult<RedemptionCheck> {
    redemption::check_redemption(
        &state.db,
        request.brand_id,
        request.points_to_use,
        request.order_total,
    )
    .await
    .map(Json)
    .map_err(map_error)
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub account_id: i64,
    pub from_branch_id: i64,
    pub to_branch_id: i64,
    pub points: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

/// POST /loyalty/transfer - Move branch attribution within a brand.
pub async fn transfer(
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> ApiResult<TransferOutcome> {
    transfer::transfer_branch_attribution(
        &state.db,
        state.branches.as_ref(),
        request.account_id,
        request.from_branch_id,
        request.to_branch_id,
        request.points,
        request.reason,
    )
    .await
    .map(Json)
    .map_err(map_error)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    use super::*;
    use crate::api::{router, AppState};
    use crate::test_utils::{
        create_test_account_with_points, setup_test_db, test_branch_directory,
    };
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn test_app() -> crate::errors::Result<(axum::Router, Arc<sea_orm::DatabaseConnection>)>
    {
        let db = Arc::new(setup_test_db().await?);
        let state = AppState {
            db: Arc::clone(&db),
            branches: Arc::new(test_branch_directory()),
        };
        Ok((router(state), db))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    #[tokio::test]
    async fn test_health() -> crate::errors::Result<()> {
        let (app, _db) = test_app().await?;
        let response = app.oneshot(get_req("/health")).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn test_ensure_and_get_account() -> crate::errors::Result<()> {
        let (app, _db) = test_app().await?;

        let response = app
            .clone()
            .oneshot(post(
                "/loyalty/accounts/ensure",
                json!({"customer_id": 1, "brand_id": 1}),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let created = body_json(response).await;
        let id = created["id"].as_i64().expect("id");
        assert_eq!(created["tier_level"], "BRONZE");

        let response = app
            .oneshot(get_req(&format!("/loyalty/accounts/{id}")))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        Ok(())
    }

    #[tokio::test]
    async fn test_get_missing_account_is_404() -> crate::errors::Result<()> {
        let (app, _db) = test_app().await?;
        let response = app
            .oneshot(get_req("/loyalty/accounts/404"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert!(body["error"].as_str().expect("message").contains("404"));
        Ok(())
    }

    #[tokio::test]
    async fn test_earn_endpoint() -> crate::errors::Result<()> {
        let (app, _db) = test_app().await?;

        let response = app
            .oneshot(post(
                "/loyalty/earn",
                json!({
                    "order_id": 500,
                    "branch_id": 10,
                    "customer_id": 1,
                    "total_price": 250,
                    "placed_at": "2026-08-28T12:00:00Z"
                }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let summary = body_json(response).await;
        assert_eq!(summary["points_earned"], 250);
        assert_eq!(summary["new_balance"], 250);

        Ok(())
    }

    #[tokio::test]
    async fn test_earn_unknown_branch_is_400() -> crate::errors::Result<()> {
        let (app, _db) = test_app().await?;

        let response = app
            .oneshot(post(
                "/loyalty/earn",
                json!({
                    "order_id": 501,
                    "branch_id": 999,
                    "customer_id": 1,
                    "total_price": 100,
                    "placed_at": "2026-08-28T12:00:00Z"
                }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_endpoint() -> crate::errors::Result<()> {
        let (app, db) = test_app().await?;
        let account = create_test_account_with_points(&db, 1, 1, 500).await?;

        let response = app
            .oneshot(post(
                "/loyalty/transfer",
                json!({
                    "account_id": account.id,
                    "from_branch_id": 10,
                    "to_branch_id": 11,
                    "points": 200
                }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let outcome = body_json(response).await;
        assert_eq!(outcome["account"]["current_points"], 500);
        assert_eq!(outcome["account"]["preferred_branch_id"], 11);

        Ok(())
    }

    #[tokio::test]
    async fn test_adjust_and_history() -> crate::errors::Result<()> {
        let (app, db) = test_app().await?;
        let account = create_test_account_with_points(&db, 1, 1, 0).await?;

        let response = app
            .clone()
            .oneshot(post(
                &format!("/loyalty/accounts/{}/adjust", account.id),
                json!({"points": 75, "description": "goodwill"}),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(get_req(&format!(
                "/loyalty/accounts/{}/transactions?limit=10",
                account.id
            )))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let history = body_json(response).await;
        assert_eq!(history["total"], 1);
        assert_eq!(history["transactions"][0]["transaction_type"], "manual_add");

        Ok(())
    }

    #[tokio::test]
    async fn test_check_redemption_endpoint() -> crate::errors::Result<()> {
        let (app, _db) = test_app().await?;

        let response = app
            .oneshot(post(
                "/loyalty/check-redemption",
                json!({"brand_id": 1, "points_to_use": 300, "order_total": 100}),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let check = body_json(response).await;
        assert_eq!(check["can_redeem"], true);
        assert_eq!(check["discount_amount"], 30);

        Ok(())
    }
}
