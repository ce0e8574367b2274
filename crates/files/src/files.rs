//! Repository-scoped attachment storage
//!
//! [`FilesService`] stores binary attachments for one patient repository, addressed by the
//! SHA-256 of their content. The returned [`FileMetadata::relative_path`] is the value recorded
//! on a diagnosis entry as its report or image reference.
//!
//! # Storage Layout
//!
//! ```text
//! <root>/<s1>/<s2>/<repository_id>/files/sha256/<h0h1>/<h2h3>/<full_hash>
//! ```
//!
//! Writes go to a temporary sibling first and are renamed into place, so a reader never observes
//! a partially written attachment.

use crate::constants::HASH_ALGORITHM;
use crate::{FilesError, FILES_FOLDER_NAME};
use chrono::{DateTime, Utc};
use dxr_types::NonEmptyText;
use dxr_uuid::ShardableUuid;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Hex-encoded SHA-256 digest (64 lowercase hex characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sha256Hash(String);

impl Sha256Hash {
    /// Computes the digest of `bytes`.
    pub fn digest(bytes: &[u8]) -> Self {
        let hash: [u8; 32] = Sha256::digest(bytes).into();
        Self(hex::encode(hash))
    }

    /// Validates an externally supplied digest.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidHash`] unless `input` is 64 lowercase hex characters.
    pub fn parse(input: &str) -> Result<Self, FilesError> {
        let valid = input.len() == 64
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if !valid {
            return Err(FilesError::InvalidHash(input.to_string()));
        }
        Ok(Self(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Sha256Hash {
    type Error = FilesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Sha256Hash> for String {
    fn from(hash: Sha256Hash) -> Self {
        hash.0
    }
}

/// Metadata for a stored attachment
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct FileMetadata {
    /// Hexadecimal digest of the file content
    pub hash: Sha256Hash,

    /// Path relative to the repository root; this is the reference stored on an entry
    pub relative_path: NonEmptyText,

    pub size_bytes: u64,

    /// Detected media type (MIME type), best-effort only
    pub media_type: Option<NonEmptyText>,

    /// Original filename from the source path
    pub original_filename: NonEmptyText,

    /// UTC timestamp when the content was first stored
    pub stored_at: DateTime<Utc>,
}

/// Service for storing attachments within one repository
///
/// - Repository-scoped: each instance is bound to one repository directory
/// - Immutable: stored files are never modified
/// - Content-addressed: identical content maps to one stored file
#[derive(Debug)]
pub struct FilesService {
    root_directory: PathBuf,
    repository_id: ShardableUuid,
}

impl FilesService {
    /// Creates a new `FilesService` for a specific repository.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - The root directory does not exist or is not a directory
    /// - The repository directory does not exist or is not a directory
    pub fn new(root_directory: &Path, repository_id: ShardableUuid) -> Result<Self, FilesError> {
        if !root_directory.is_dir() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Not an existing directory: {}",
                root_directory.display()
            )));
        }

        let root_directory = root_directory.canonicalize().map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot canonicalize path {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        let repository_root = repository_id.sharded_dir(&root_directory);
        if !repository_root.is_dir() {
            return Err(FilesError::RepositoryNotFound(format!(
                "Repository directory does not exist: {}",
                repository_root.display()
            )));
        }

        Ok(Self {
            root_directory,
            repository_id,
        })
    }

    /// Stores the file at `source_path` and returns its metadata.
    ///
    /// # Errors
    ///
    /// Returns `FilesError::Io` if the source cannot be read or the content cannot be written.
    pub fn add(&self, source_path: &Path) -> Result<FileMetadata, FilesError> {
        let buffer = fs::read(source_path).map_err(|e| {
            FilesError::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to read source file {}: {}",
                    source_path.display(),
                    e
                ),
            ))
        })?;

        let original_filename = source_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown");

        self.add_bytes(original_filename, &buffer)
    }

    /// Stores `content` under its content hash and returns its metadata.
    ///
    /// If identical content is already stored, nothing is written and the existing file's
    /// reference is returned (with `stored_at` taken from the existing file when available).
    ///
    /// # Errors
    ///
    /// Returns `FilesError::Io` if the storage directory or file cannot be written.
    pub fn add_bytes(
        &self,
        original_filename: &str,
        content: &[u8],
    ) -> Result<FileMetadata, FilesError> {
        let hash = Sha256Hash::digest(content);
        let relative_path = Self::compute_relative_path(hash.as_str());
        let storage_path = self.repository_root().join(relative_path.as_str());

        let stored_at = if storage_path.is_file() {
            fs::metadata(&storage_path)
                .and_then(|m| m.modified())
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now())
        } else {
            self.write_new(&storage_path, content)?;
            Utc::now()
        };

        let original_filename = NonEmptyText::new(original_filename)
            .unwrap_or_else(|_| NonEmptyText::new("unknown").expect("literal is non-empty"));

        let media_type =
            infer::get(content).and_then(|kind| NonEmptyText::new(kind.mime_type()).ok());

        Ok(FileMetadata {
            hash,
            relative_path,
            size_bytes: content.len() as u64,
            media_type,
            original_filename,
            stored_at,
        })
    }

    /// Returns the path to this repository's root directory.
    pub fn repository_root(&self) -> PathBuf {
        self.repository_id.sharded_dir(&self.root_directory)
    }

    fn write_new(&self, storage_path: &Path, content: &[u8]) -> Result<(), FilesError> {
        let parent = storage_path.parent().ok_or_else(|| {
            FilesError::InvalidRootDirectory(format!(
                "storage path has no parent: {}",
                storage_path.display()
            ))
        })?;
        fs::create_dir_all(parent)?;

        let file_name = storage_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("attachment");
        let temp_path = parent.join(format!(".{}.tmp", file_name));

        fs::write(&temp_path, content)?;
        if let Err(e) = fs::rename(&temp_path, storage_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(FilesError::Io(e));
        }

        Ok(())
    }

    /// `files/sha256/<h0h1>/<h2h3>/<hash>`
    fn compute_relative_path(hash_hex: &str) -> NonEmptyText {
        let shard1 = &hash_hex[0..2];
        let shard2 = &hash_hex[2..4];
        let path = format!(
            "{}/{}/{}/{}/{}",
            FILES_FOLDER_NAME, HASH_ALGORITHM, shard1, shard2, hash_hex
        );
        NonEmptyText::new(&path).expect("computed path is non-empty")
    }
}
