use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::ProjectStatus;

/// A compliance project scoped to one framework within an organization.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub status: ProjectStatus,
    #[serde(default)]
    pub framework_id: Option<String>,
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
