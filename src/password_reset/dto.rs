use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct SendMailRequest {
    pub email: String,
}

/// `requestId` may be omitted when the browser posts from the reset page;
/// the id is then taken from the `Referer` header.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub password: String,
    #[serde(default)]
    pub request_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}
