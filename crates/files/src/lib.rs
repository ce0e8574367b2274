//! DXR attachment storage
//!
//! Diagnosis entries may reference a report document and a medical image. The record core only
//! ever stores an opaque reference string for each; this crate is the collaborator that turns a
//! local file into such a reference.
//!
//! ## Design Principles
//!
//! - Binary bytes are kept out of the versioned record history (the folder is gitignored)
//! - Stored files are immutable and content-addressed; identical content is stored once
//! - References are repository-relative, so a record stays valid when moved or restored
//! - No media-type restrictions are enforced; detection is best-effort metadata only
//!
//! ## Repository-Scoped Storage Model
//!
//! ```text
//! patients/
//! └── <s1>/<s2>/<patient_id>/
//!     ├── .gitignore
//!     ├── patient.yaml
//!     ├── diagnoses/
//!     └── files/        # gitignored
//!         └── sha256/
//!             └── ab/
//!                 └── 3f/
//!                     └── ab3f9e…
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use dxr_files::FilesService;
//! use dxr_uuid::ShardableUuid;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let root = Path::new("patient_data/patients");
//! let patient_id = ShardableUuid::parse("550e8400e29b41d4a716446655440000")?;
//!
//! let service = FilesService::new(root, patient_id)?;
//! let stored = service.add(Path::new("scan.png"))?;
//! println!("image reference: {}", stored.relative_path);
//! # Ok(())
//! # }
//! ```

mod constants;
mod files;

pub use constants::FILES_FOLDER_NAME;
pub use files::{FileMetadata, FilesService, Sha256Hash};
pub use dxr_uuid::ShardableUuid;

/// Errors that can occur during file operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Root directory does not exist or is not a directory
    #[error("Invalid root directory: {0}")]
    InvalidRootDirectory(String),

    /// Repository directory does not exist
    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),

    /// Hash string is not a 64-character lowercase hex digest
    #[error("Invalid hash: {0}")]
    InvalidHash(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
