//! Attachment ingestion for diagnosis entries.
//!
//! Report documents and images are copied into the patient's content-addressed `files/` area by
//! [`dxr_files::FilesService`]. The returned relative path is what goes into an entry's
//! `report_path` or `image_path`.

use crate::config::CoreConfig;
use crate::error::{RecordError, RecordResult};
use crate::model::PatientId;
use dxr_files::{FileMetadata, FilesService};
use std::path::Path;

/// Copy `source` into the attachment area of a patient record.
///
/// # Errors
///
/// - `RecordError::PatientNotFound` if the patient has no record directory.
/// - `RecordError::Attachment` if the file could not be read or stored.
pub fn store_attachment(
    cfg: &CoreConfig,
    patient_id: &PatientId,
    source: &Path,
) -> RecordResult<FileMetadata> {
    let service = FilesService::new(&cfg.patients_dir(), patient_id.as_uuid().clone()).map_err(
        |e| match e {
            dxr_files::FilesError::RepositoryNotFound(_) => {
                RecordError::PatientNotFound(patient_id.clone())
            }
            other => RecordError::Attachment(other),
        },
    )?;

    let metadata = service.add(source)?;
    tracing::info!(
        patient_id = %patient_id,
        hash = %metadata.hash.as_str(),
        size_bytes = metadata.size_bytes,
        "attachment stored"
    );
    Ok(metadata)
}
