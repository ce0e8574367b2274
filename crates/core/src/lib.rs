//! # DXR Core
//!
//! Core business logic for diagnosis case records.
//!
//! A diagnosis entry belongs to one patient, is authored by one doctor and carries a free-form
//! case identifier. `(patient, case)` names a logical case whose entries, ordered by creation
//! time, form its timeline. This crate provides:
//!
//! - the data model ([`model`]) and validation of raw inputs,
//! - the append-only record store seam ([`store`]) with a git-versioned file backend and an
//!   in-memory backend,
//! - identifier resolution ([`resolver`]) and timeline aggregation ([`timeline`]),
//! - the submission workflow ([`workflow`]) and the [`DiagnosisService`] facade.
//!
//! **No API concerns**: HTTP servers, CLI parsing and wire formats belong in `api-rest`,
//! `api-shared` and `dxr-cli`.

pub mod attachments;
pub mod config;
pub mod constants;
pub mod error;
pub mod model;
pub mod resolver;
pub mod service;
pub mod store;
pub mod timeline;
pub mod validation;
pub mod workflow;

mod versioned_files;

pub use config::{CoreConfig, StoreBackend};
pub use error::{ErrorKind, RecordError, RecordResult};
pub use model::{
    DiagnosisEntry, Doctor, DoctorId, NewDiagnosisEntry, NewDoctor, NewPatient, Patient, PatientId,
};
pub use resolver::Resolution;
pub use service::DiagnosisService;
pub use timeline::Timeline;
pub use validation::Field;
pub use workflow::{CaseStatus, SubmissionOutcome, SubmitDiagnosis};

pub use dxr_types::{CaseId, NonEmptyText};
pub use dxr_uuid::TimestampId;
