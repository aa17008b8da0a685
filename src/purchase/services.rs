use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::{
    auth::repo_types::User,
    error::{ApiError, ApiResult},
    purchase::{
        gateway::CreateOrder,
        repo::OrderStore,
        repo_types::{ConfirmOutcome, Order},
    },
    state::AppState,
};

/// Open a gateway order for the premium membership and track it as PENDING.
/// Returns the stored order together with the gateway's public key.
pub async fn initiate(state: &AppState, user: &User) -> ApiResult<(Order, String)> {
    let req = CreateOrder {
        amount: state.config.gateway.amount,
        currency: state.config.gateway.currency.clone(),
        receipt: format!(
            "user-{}-{}",
            user.id,
            OffsetDateTime::now_utc().unix_timestamp()
        ),
    };

    let gw_order = state.gateway.create_order(&req).await.map_err(|e| {
        error!(user_id = user.id, error = %e, "gateway order creation failed");
        ApiError::Forbidden("Something went wrong".into())
    })?;

    let order = state.store.create_order(user.id, &gw_order.id).await?;
    info!(user_id = user.id, orderid = %order.orderid, "order created");
    Ok((order, state.gateway.key_id().to_string()))
}

/// Settle an order. Confirming an already settled order with the same
/// payment id succeeds without changing anything.
pub async fn confirm(
    state: &AppState,
    user: &User,
    order_id: &str,
    payment_id: &str,
) -> ApiResult<Order> {
    let order_id = order_id.trim();
    let payment_id = payment_id.trim();
    if order_id.is_empty() || payment_id.is_empty() {
        return Err(ApiError::BadRequest(
            "orderId and paymentId are required".into(),
        ));
    }

    match state
        .store
        .confirm_order(user.id, order_id, payment_id)
        .await?
    {
        ConfirmOutcome::Confirmed(order) => {
            info!(user_id = user.id, orderid = %order.orderid, "order confirmed, premium granted");
            Ok(order)
        }
        ConfirmOutcome::AlreadyConfirmed(order) => {
            info!(user_id = user.id, orderid = %order.orderid, "order already confirmed");
            Ok(order)
        }
        ConfirmOutcome::PaymentMismatch(order) => {
            warn!(user_id = user.id, orderid = %order.orderid, "order settled with another payment");
            Err(ApiError::Conflict(
                "Order already settled with a different payment".into(),
            ))
        }
        ConfirmOutcome::NotFound => {
            warn!(user_id = user.id, orderid = %order_id, "confirm for unknown order");
            Err(ApiError::NotFound("Order not found".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::repo::UserStore,
        purchase::repo_types::OrderStatus,
        test_utils::{test_context, test_user},
    };

    #[tokio::test]
    async fn initiate_records_pending_order() {
        let ctx = test_context();
        let user = test_user(&ctx, "a@x.com").await;

        let (order, key) = initiate(&ctx.state, &user).await.unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.user_id, user.id);
        assert!(order.paymentid.is_none());
        assert_eq!(key, "rzp_test_key");
        assert_eq!(ctx.gateway.calls(), 1);
    }

    #[tokio::test]
    async fn gateway_failure_creates_nothing() {
        let ctx = test_context();
        let user = test_user(&ctx, "a@x.com").await;
        ctx.gateway.fail(true);

        let err = initiate(&ctx.state, &user).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        // No order exists, so confirming any id is a 404.
        let err = confirm(&ctx.state, &user, "order_test_1", "pay_1")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn confirm_is_idempotent() {
        let ctx = test_context();
        let user = test_user(&ctx, "a@x.com").await;
        let (order, _) = initiate(&ctx.state, &user).await.unwrap();

        let first = confirm(&ctx.state, &user, &order.orderid, "pay_1").await.unwrap();
        assert_eq!(first.status, OrderStatus::Successful);
        assert_eq!(first.paymentid.as_deref(), Some("pay_1"));

        let again = confirm(&ctx.state, &user, &order.orderid, "pay_1").await.unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(again.status, OrderStatus::Successful);

        let user = ctx.store.find_user_by_id(user.id).await.unwrap().unwrap();
        assert!(user.is_premium_user);
    }

    #[tokio::test]
    async fn confirm_with_other_payment_conflicts() {
        let ctx = test_context();
        let user = test_user(&ctx, "a@x.com").await;
        let (order, _) = initiate(&ctx.state, &user).await.unwrap();
        confirm(&ctx.state, &user, &order.orderid, "pay_1").await.unwrap();

        let err = confirm(&ctx.state, &user, &order.orderid, "pay_2")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn cannot_confirm_someone_elses_order() {
        let ctx = test_context();
        let alice = test_user(&ctx, "a@x.com").await;
        let bob = test_user(&ctx, "b@x.com").await;
        let (order, _) = initiate(&ctx.state, &alice).await.unwrap();

        let err = confirm(&ctx.state, &bob, &order.orderid, "pay_1")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let bob = ctx.store.find_user_by_id(bob.id).await.unwrap().unwrap();
        assert!(!bob.is_premium_user);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_confirms_settle_once() {
        let ctx = test_context();
        let user = test_user(&ctx, "a@x.com").await;
        let (order, _) = initiate(&ctx.state, &user).await.unwrap();

        let (a, b) = tokio::join!(
            confirm(&ctx.state, &user, &order.orderid, "pay_1"),
            confirm(&ctx.state, &user, &order.orderid, "pay_1"),
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.id, b.id);
        for settled in [&a, &b] {
            assert_eq!(settled.status, OrderStatus::Successful);
            assert_eq!(settled.paymentid.as_deref(), Some("pay_1"));
        }

        let user = ctx.store.find_user_by_id(user.id).await.unwrap().unwrap();
        assert!(user.is_premium_user);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn racing_payments_have_one_winner() {
        let ctx = test_context();
        let user = test_user(&ctx, "a@x.com").await;
        let (order, _) = initiate(&ctx.state, &user).await.unwrap();

        let (a, b) = tokio::join!(
            confirm(&ctx.state, &user, &order.orderid, "pay_1"),
            confirm(&ctx.state, &user, &order.orderid, "pay_2"),
        );
        let (winner, loser) = match (a, b) {
            (Ok(o), Err(e)) | (Err(e), Ok(o)) => (o, e),
            other => panic!("expected one success and one failure: {other:?}"),
        };
        assert!(matches!(loser, ApiError::Conflict(_)));

        let paid_with = winner.paymentid.clone().unwrap();
        let again = confirm(&ctx.state, &user, &order.orderid, &paid_with)
            .await
            .unwrap();
        assert_eq!(again.paymentid, winner.paymentid);
    }

    #[tokio::test]
    async fn confirm_requires_both_ids() {
        let ctx = test_context();
        let user = test_user(&ctx, "a@x.com").await;
        let err = confirm(&ctx.state, &user, " ", "pay_1").await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
