//! # API Shared
//!
//! Shared definitions for DXR front ends.
//!
//! Contains:
//! - Wire DTOs (`dto` module) with serde and OpenAPI schemas
//! - Shared services like `HealthService`
//!
//! Request DTOs keep every field optional so that missing input reaches the core's validation
//! and is reported field by field, instead of failing JSON decoding.

pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
