//! Identifier and sharded-path utilities.
//!
//! DXR stores patient and doctor records under sharded directories derived from a UUID, and
//! names each diagnosis entry with a time-prefixed identifier.
//!
//! Storage identifiers use a *canonical* UUID representation: **32 lowercase hexadecimal
//! characters** (no hyphens), the value produced by `Uuid::new_v4().simple().to_string()`.
//! Externally supplied identifiers (CLI arguments, REST path segments) must already be canonical;
//! use [`ShardableUuid::parse`] to validate them.
//!
//! ## Sharded directory layout
//! For a canonical UUID `u`, records live under:
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`
//!
//! Example:
//! `patient_data/patients/55/0e/550e8400e29b41d4a716446655440000/`
//!
//! ## Entry identifiers
//! [`TimestampId`] values look like `20260111T143522.045Z-550e8400e29b41d4a716446655440000`.
//! Their lexical order equals their chronological order, so a directory listing sorted by
//! filename is already a timeline.

mod service;

pub use service::{ShardableUuid, TimestampId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
