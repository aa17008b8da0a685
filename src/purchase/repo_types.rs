use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// Lifecycle of a premium purchase. `Successful` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "order_status", rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    Successful,
}

/// Payment intent tracked against the gateway's order id.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub orderid: String,           // gateway order id
    pub paymentid: Option<String>, // set on confirmation
    pub status: OrderStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Result of applying a payment confirmation to an order.
#[derive(Debug, Clone)]
pub enum ConfirmOutcome {
    /// The order moved PENDING -> SUCCESSFUL and the user became premium.
    Confirmed(Order),
    /// The order was already settled with the same payment id; nothing changed.
    AlreadyConfirmed(Order),
    /// The order is settled with a different payment id; nothing changed.
    PaymentMismatch(Order),
    /// No order with that id belongs to the user.
    NotFound,
}
