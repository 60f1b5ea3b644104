use serde::{Deserialize, Serialize};

/// `POST /create-order`
///
/// `amount` is kept as a raw JSON number so fractional or out-of-range values
/// can be reported as an invalid amount rather than a malformed body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub amount: Option<serde_json::Number>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Order creation parameters sent to the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    /// Amount in the smallest currency unit (paise, cents)
    pub amount: i64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<String>,
    /// 1 = capture automatically on successful authorization
    pub payment_capture: u8,
}

/// Order object as returned by the gateway and echoed to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    #[serde(default)]
    pub entity: Option<String>,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub created_at: Option<i64>,
}
