//! Error types for the record core.
//!
//! [`RecordError`] keeps granular variants so logs say exactly what went wrong, while
//! [`RecordError::kind`] collapses them into the four outcomes callers act on.

use crate::model::{DoctorId, PatientId};
use crate::validation::Field;
use dxr_types::CaseId;
use std::fmt;
use std::path::PathBuf;

/// Caller-facing classification of a [`RecordError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input was incomplete or malformed. Nothing was written.
    Validation,
    /// No records exist for the requested patient or case. Not a fault.
    NotFound,
    /// A submission referenced a patient or doctor the registry does not know.
    Reference,
    /// The store could not be read or written. Fatal for the request.
    StorageUnavailable,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Reference => "reference",
            Self::StorageUnavailable => "storage_unavailable",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn join_fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("missing required fields: {}", join_fields(.0))]
    MissingFields(Vec<Field>),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid {kind} identifier: {source}")]
    InvalidIdentifier {
        kind: &'static str,
        #[source]
        source: dxr_uuid::UuidError,
    },

    #[error("patient not found: {0}")]
    PatientNotFound(PatientId),
    #[error("no diagnosis entries for patient {patient_id} under case '{case_id}'")]
    CaseNotFound {
        patient_id: PatientId,
        case_id: CaseId,
    },

    #[error("unknown patient: {0}")]
    UnknownPatient(PatientId),
    #[error("unknown doctor: {0}")]
    UnknownDoctor(DoctorId),

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to create record directory: {0}")]
    RecordDirCreation(std::io::Error),
    #[error(
        "initialise failed and cleanup also failed (path: {path}): init={init_error}; cleanup={cleanup_error}",
        path = path.display()
    )]
    CleanupAfterInitialiseFailed {
        path: PathBuf,
        #[source]
        init_error: Box<RecordError>,
        cleanup_error: std::io::Error,
    },
    #[error("failed to write record file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read record file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to deserialize YAML ({path}): {source}", path = path.display())]
    YamlDeserialization {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("corrupt record file {path}: {reason}", path = path.display())]
    CorruptRecord { path: PathBuf, reason: String },
    #[error("attachment storage failed: {0}")]
    Attachment(#[from] dxr_files::FilesError),

    #[error("failed to initialise git repository: {0}")]
    GitInit(git2::Error),
    #[error("failed to open git repository: {0}")]
    GitOpen(git2::Error),
    #[error("failed to access git index: {0}")]
    GitIndex(git2::Error),
    #[error("failed to add file to git index: {0}")]
    GitAdd(git2::Error),
    #[error("failed to write git tree: {0}")]
    GitWriteTree(git2::Error),
    #[error("failed to find git tree: {0}")]
    GitFindTree(git2::Error),
    #[error("failed to create git signature: {0}")]
    GitSignature(git2::Error),
    #[error("failed to create git commit: {0}")]
    GitCommit(git2::Error),
    #[error("failed to get git head: {0}")]
    GitHead(git2::Error),
    #[error("failed to set git head: {0}")]
    GitSetHead(git2::Error),
    #[error("failed to peel git commit: {0}")]
    GitPeel(git2::Error),

    #[error("record store lock poisoned")]
    LockPoisoned,
}

impl RecordError {
    /// Classify this error into one of the caller-facing outcomes.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingFields(_) | Self::InvalidInput(_) | Self::InvalidIdentifier { .. } => {
                ErrorKind::Validation
            }
            Self::PatientNotFound(_) | Self::CaseNotFound { .. } => ErrorKind::NotFound,
            Self::UnknownPatient(_) | Self::UnknownDoctor(_) => ErrorKind::Reference,
            _ => ErrorKind::StorageUnavailable,
        }
    }

    /// True only for storage faults; every other outcome is an expected answer.
    pub fn is_fault(&self) -> bool {
        self.kind() == ErrorKind::StorageUnavailable
    }

    /// The offending fields of a validation failure, if they are known.
    pub fn fields(&self) -> &[Field] {
        match self {
            Self::MissingFields(fields) => fields,
            _ => &[],
        }
    }
}

impl From<dxr_types::TextError> for RecordError {
    fn from(err: dxr_types::TextError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

pub type RecordResult<T> = std::result::Result<T, RecordError>;
