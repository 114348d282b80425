//! Client-related types shared with the backend API
//!
//! Request/response DTOs for the REST endpoints the dashboard calls.

use serde::{Deserialize, Serialize};

// =============================================================================
// Auth API DTOs
// =============================================================================

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(alias = "access_token")]
    pub token: String,
    pub user: UserInfo,
}

/// User information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub role: String,
}

// =============================================================================
// Mutation DTOs
// =============================================================================

/// `PATCH /api/tables/{id}/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableStatusRequest {
    pub status: crate::models::TableStatus,
}

/// `PATCH /api/orders/{id}/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusRequest {
    pub status: crate::models::OrderStatus,
}
