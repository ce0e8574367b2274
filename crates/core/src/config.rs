//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services as an
//! `Arc<CoreConfig>`. Core code never reads process-wide environment variables while handling a
//! request; the binaries read them and hand the raw values to the helpers below.

use crate::constants::{DEFAULT_DATA_DIR, DEFAULT_NAMESPACE, DOCTORS_DIR_NAME, PATIENTS_DIR_NAME};
use crate::validation::validate_namespace_safe_for_uri;
use crate::{RecordError, RecordResult};
use dxr_types::NonEmptyText;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which record store implementation backs the services.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StoreBackend {
    /// Git-versioned YAML files under the data directory.
    #[default]
    File,
    /// Process-local, lost on restart.
    Memory,
}

impl StoreBackend {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreBackend {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            other => Err(RecordError::InvalidInput(format!(
                "unsupported store backend '{}' (expected 'file' or 'memory')",
                other
            ))),
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    namespace: NonEmptyText,
    store_backend: StoreBackend,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::InvalidInput` if the namespace is not safe to embed in an address.
    pub fn new(
        data_dir: PathBuf,
        namespace: NonEmptyText,
        store_backend: StoreBackend,
    ) -> RecordResult<Self> {
        validate_namespace_safe_for_uri(namespace.as_str())?;

        Ok(Self {
            data_dir,
            namespace,
            store_backend,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn patients_dir(&self) -> PathBuf {
        self.data_dir.join(PATIENTS_DIR_NAME)
    }

    pub fn doctors_dir(&self) -> PathBuf {
        self.data_dir.join(DOCTORS_DIR_NAME)
    }

    pub fn namespace(&self) -> &str {
        self.namespace.as_str()
    }

    pub fn store_backend(&self) -> StoreBackend {
        self.store_backend
    }
}

/// Resolve the data directory from an optional raw value (e.g. `DXR_DATA_DIR`).
pub fn data_dir_from_env_value(value: Option<&str>) -> PathBuf {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => PathBuf::from(v),
        _ => PathBuf::from(DEFAULT_DATA_DIR),
    }
}

/// Resolve the namespace from an optional raw value (e.g. `DXR_NAMESPACE`).
///
/// # Errors
///
/// Returns `RecordError::InvalidInput` if the value is present but unsafe.
pub fn namespace_from_env_value(value: Option<&str>) -> RecordResult<NonEmptyText> {
    let namespace = match value.and_then(|v| NonEmptyText::new(v).ok()) {
        Some(ns) => ns,
        None => NonEmptyText::new(DEFAULT_NAMESPACE)?,
    };
    validate_namespace_safe_for_uri(namespace.as_str())?;
    Ok(namespace)
}

/// Resolve the store backend from an optional raw value (e.g. `DXR_STORE`).
///
/// # Errors
///
/// Returns `RecordError::InvalidInput` for anything other than `file` or `memory`.
pub fn store_backend_from_env_value(value: Option<&str>) -> RecordResult<StoreBackend> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.parse(),
        _ => Ok(StoreBackend::default()),
    }
}
