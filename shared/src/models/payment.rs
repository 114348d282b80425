//! Payment Model

use serde::{Deserialize, Serialize};

/// Payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
}

/// Payment record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    #[serde(default)]
    pub order_id: Option<i64>,
    /// Amount in currency unit
    #[serde(default)]
    pub amount: f64,
    #[serde(default, alias = "payment_method")]
    pub method: Option<String>,
    #[serde(default)]
    pub status: PaymentStatus,
}
