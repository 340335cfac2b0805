use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::RiskLevel;

/// A registered organizational risk.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Risk {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub level: RiskLevel,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
