//! Dining Table Model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Table occupancy status.
///
/// The three states are mutually exclusive; every table is counted in
/// exactly one of the dashboard counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    #[default]
    Available,
    Occupied,
    Dirty,
}

impl TableStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Occupied => "occupied",
            Self::Dirty => "dirty",
        }
    }
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" => Ok(Self::Available),
            "occupied" => Ok(Self::Occupied),
            "dirty" => Ok(Self::Dirty),
            other => Err(format!("unknown table status: {other}")),
        }
    }
}

/// Dining table entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiningTable {
    pub id: i64,
    #[serde(default, alias = "table_number")]
    pub number: Option<String>,
    #[serde(default)]
    pub capacity: Option<i32>,
    pub status: TableStatus,
    #[serde(default, alias = "location")]
    pub zone: Option<String>,
}

impl DiningTable {
    /// Display label, falling back to the id
    pub fn label(&self) -> String {
        match &self.number {
            Some(n) if !n.is_empty() => n.clone(),
            _ => self.id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!("Occupied".parse::<TableStatus>(), Ok(TableStatus::Occupied));
        assert!("reserved".parse::<TableStatus>().is_err());
    }

    #[test]
    fn test_partial_record_decodes() {
        let table: DiningTable =
            serde_json::from_str(r#"{"id":3,"status":"dirty","table_number":"T3"}"#).unwrap();
        assert_eq!(table.status, TableStatus::Dirty);
        assert_eq!(table.label(), "T3");
        assert_eq!(table.capacity, None);
    }
}
