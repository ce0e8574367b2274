//! Record storage.
//!
//! Two trait seams: [`Registry`] holds patient and doctor identity records, [`RecordStore`] holds
//! the append-only diagnosis entries. Both are implemented by [`FileStore`] (git-versioned YAML
//! on disk) and [`MemoryStore`] (process-local).
//!
//! Implementations share these rules:
//!
//! - `insert` is the only way an entry comes into existence. It assigns the entry id,
//!   `created_at` and the per-patient `sequence`, strictly increasing per patient.
//! - Entries are never updated or deleted.
//! - Concurrent inserts for one patient are serialised; readers see either the set before or the
//!   set after an insert, never a partial entry.

mod file;
mod memory;
mod shared;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::config::{CoreConfig, StoreBackend};
use crate::model::{
    DiagnosisEntry, Doctor, DoctorDetails, DoctorId, NewDiagnosisEntry, Patient, PatientDetails,
    PatientId,
};
use crate::RecordResult;
use dxr_types::CaseId;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Patient and doctor identity records.
pub trait Registry: Send + Sync {
    /// Store a new patient under a freshly generated identifier.
    fn create_patient(&self, details: PatientDetails) -> RecordResult<Patient>;

    /// Store a new doctor under a freshly generated identifier.
    fn register_doctor(&self, details: DoctorDetails) -> RecordResult<Doctor>;

    /// Look up a patient. `Ok(None)` if no such patient was ever registered.
    fn patient(&self, id: &PatientId) -> RecordResult<Option<Patient>>;

    /// Look up a doctor. `Ok(None)` if no such doctor was ever registered.
    fn doctor(&self, id: &DoctorId) -> RecordResult<Option<Doctor>>;
}

/// Append-only collection of diagnosis entries.
pub trait RecordStore: Send + Sync {
    /// Append an entry, assigning its id, sequence and `created_at`.
    ///
    /// # Errors
    ///
    /// - `RecordError::UnknownPatient` / `RecordError::UnknownDoctor` if a reference does not
    ///   resolve. Nothing is written.
    /// - A storage fault if the entry could not be persisted.
    fn insert(&self, entry: NewDiagnosisEntry) -> RecordResult<DiagnosisEntry>;

    /// Entries for one logical case, ascending by `created_at`. Empty if none match, including
    /// when the patient is unknown.
    fn query_by_patient_and_case(
        &self,
        patient_id: &PatientId,
        case_id: &CaseId,
    ) -> RecordResult<Vec<DiagnosisEntry>>;

    /// Distinct case identifiers used in a patient's record, alphabetical.
    ///
    /// # Errors
    ///
    /// `RecordError::PatientNotFound` if the patient is not registered. A registered patient
    /// without entries yields an empty set.
    fn list_case_ids_for_patient(&self, patient_id: &PatientId) -> RecordResult<BTreeSet<CaseId>>;
}

/// Everything a diagnosis service needs from its backing storage.
pub trait Store: Registry + RecordStore {}

impl<T: Registry + RecordStore + ?Sized> Store for T {}

/// Build the store selected by `cfg`.
pub fn open_store(cfg: Arc<CoreConfig>) -> RecordResult<Arc<dyn Store>> {
    match cfg.store_backend() {
        StoreBackend::File => Ok(Arc::new(FileStore::new(cfg)?)),
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}
