//! # pulse-core
//!
//! Core types and error types for Compliance Pulse.
//!
//! This crate provides the foundational types shared across all Pulse crates:
//! - Record structs for everything fetched from the compliance API
//!   (projects, controls, evidence, reviews, risks, users, to-dos, frameworks)
//! - Status enums for each record family, plus the derived `ControlStatus`
//! - The explicit evidence override mapping consumed by status resolution
//! - The derived `OrganizationSnapshot` and its breakdown/score sub-types
//! - Cross-cutting error types

pub mod entities;
pub mod enums;
pub mod errors;
pub mod overrides;
pub mod snapshot;
