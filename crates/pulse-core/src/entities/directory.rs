//! Flat records that only feed counts and breakdowns.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{TodoStatus, UserStatus};

/// A compliance framework (e.g., ISO 27001, SOC 2).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Framework {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub status: UserStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Auditor {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Todo {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub status: TodoStatus,
}
