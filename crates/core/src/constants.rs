//! Constants used throughout the DXR core crate.
//!
//! Path and filename constants live here so the file store, the attachment helper and the tests
//! agree on one on-disk layout.

/// Default directory for record storage when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "patient_data";

/// Default namespace used in git author e-mail addresses.
pub const DEFAULT_NAMESPACE: &str = "dxr.dev.1";

/// Directory name for patient repositories.
pub const PATIENTS_DIR_NAME: &str = "patients";

/// Directory name for doctor repositories.
pub const DOCTORS_DIR_NAME: &str = "doctors";

/// Directory (inside a patient repository) holding one YAML file per diagnosis entry.
pub const DIAGNOSES_DIR_NAME: &str = "diagnoses";

/// Filename for the patient identity record.
pub const PATIENT_YAML_FILENAME: &str = "patient.yaml";

/// Filename for the doctor identity record.
pub const DOCTOR_YAML_FILENAME: &str = "doctor.yaml";

/// Extension of diagnosis entry files.
pub const ENTRY_FILE_EXTENSION: &str = "yaml";

/// `.gitignore` written into every new repository. Attachment bytes stay out of history.
pub const DEFAULT_GITIGNORE: &str = "files/\n.*.tmp\n";
