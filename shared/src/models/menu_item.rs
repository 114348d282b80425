//! Menu Item Model

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// Menu item entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    /// Price in currency unit
    #[serde(default)]
    pub price: f64,
    #[serde(default = "default_true", alias = "available")]
    pub is_available: bool,
}
