use serde::{Deserialize, Serialize};

use crate::purchase::repo_types::Order;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPurchaseRequest {
    #[serde(alias = "order_id")]
    pub order_id: String,
    #[serde(alias = "payment_id")]
    pub payment_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePurchaseResponse {
    pub order: Order,
    pub gateway_key: String,
}

#[derive(Debug, Serialize)]
pub struct ConfirmPurchaseResponse {
    pub success: bool,
    pub message: String,
}
