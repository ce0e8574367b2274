//! Process-local store. Nothing survives a restart.

use super::{RecordStore, Registry};
use crate::error::{RecordError, RecordResult};
use crate::model::{
    DiagnosisEntry, Doctor, DoctorDetails, DoctorId, NewDiagnosisEntry, Patient, PatientDetails,
    PatientId,
};
use crate::timeline::case_ids;
use dxr_types::CaseId;
use dxr_uuid::TimestampId;
use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct MemoryState {
    patients: HashMap<PatientId, Patient>,
    doctors: HashMap<DoctorId, Doctor>,
    entries: HashMap<PatientId, Vec<DiagnosisEntry>>,
}

/// In-memory store with the same semantics as the file store.
///
/// A single `RwLock` guards all state, so an insert is atomic with respect to every reader.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RecordResult<RwLockReadGuard<'_, MemoryState>> {
        self.state.read().map_err(|_| RecordError::LockPoisoned)
    }

    fn write(&self) -> RecordResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state.write().map_err(|_| RecordError::LockPoisoned)
    }
}

impl Registry for MemoryStore {
    fn create_patient(&self, details: PatientDetails) -> RecordResult<Patient> {
        let mut state = self.write()?;
        let mut id = PatientId::new();
        while state.patients.contains_key(&id) {
            id = PatientId::new();
        }
        let patient = Patient::from_details(id.clone(), details);
        state.patients.insert(id, patient.clone());

        tracing::info!(patient_id = %patient.id, "patient record created");
        Ok(patient)
    }

    fn register_doctor(&self, details: DoctorDetails) -> RecordResult<Doctor> {
        let mut state = self.write()?;
        let mut id = DoctorId::new();
        while state.doctors.contains_key(&id) {
            id = DoctorId::new();
        }
        let doctor = Doctor::from_details(id.clone(), details);
        state.doctors.insert(id, doctor.clone());

        tracing::info!(doctor_id = %doctor.id, "doctor registered");
        Ok(doctor)
    }

    fn patient(&self, id: &PatientId) -> RecordResult<Option<Patient>> {
        Ok(self.read()?.patients.get(id).cloned())
    }

    fn doctor(&self, id: &DoctorId) -> RecordResult<Option<Doctor>> {
        Ok(self.read()?.doctors.get(id).cloned())
    }
}

impl RecordStore for MemoryStore {
    fn insert(&self, entry: NewDiagnosisEntry) -> RecordResult<DiagnosisEntry> {
        let mut state = self.write()?;
        if !state.patients.contains_key(&entry.patient_id) {
            return Err(RecordError::UnknownPatient(entry.patient_id));
        }
        if !state.doctors.contains_key(&entry.doctor_id) {
            return Err(RecordError::UnknownDoctor(entry.doctor_id));
        }

        let record = state.entries.entry(entry.patient_id.clone()).or_default();
        let last = record.last();
        let id = TimestampId::generate(last.map(DiagnosisEntry::id));
        let sequence = last.map_or(1, |e| e.sequence() + 1);
        let stored = DiagnosisEntry::stored(id, sequence, entry);
        record.push(stored.clone());

        tracing::info!(
            patient_id = %stored.patient_id(),
            entry_id = %stored.id(),
            sequence = stored.sequence(),
            "diagnosis entry stored"
        );
        Ok(stored)
    }

    fn query_by_patient_and_case(
        &self,
        patient_id: &PatientId,
        case_id: &CaseId,
    ) -> RecordResult<Vec<DiagnosisEntry>> {
        let state = self.read()?;
        Ok(state
            .entries
            .get(patient_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.belongs_to(patient_id, case_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_case_ids_for_patient(&self, patient_id: &PatientId) -> RecordResult<BTreeSet<CaseId>> {
        let state = self.read()?;
        if !state.patients.contains_key(patient_id) {
            return Err(RecordError::PatientNotFound(patient_id.clone()));
        }
        Ok(case_ids(state.entries.get(patient_id).into_iter().flatten()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dxr_types::NonEmptyText;
    use std::sync::Arc;
    use std::thread;

    fn seeded() -> (MemoryStore, Patient, Doctor) {
        let store = MemoryStore::new();
        let patient = store
            .create_patient(PatientDetails {
                name: NonEmptyText::new("Grace Hopper").unwrap(),
                age: 85,
                weight_kg: 50.0,
                height_cm: 160.0,
                gender: NonEmptyText::new("female").unwrap(),
            })
            .expect("create_patient should succeed");
        let doctor = store
            .register_doctor(DoctorDetails {
                name: NonEmptyText::new("Dr. Watson").unwrap(),
                specialty: None,
            })
            .expect("register_doctor should succeed");
        (store, patient, doctor)
    }

    fn entry(patient: &Patient, doctor: &Doctor, case: &str) -> NewDiagnosisEntry {
        NewDiagnosisEntry {
            case_id: CaseId::new(case).unwrap(),
            patient_id: patient.id.clone(),
            doctor_id: doctor.id.clone(),
            symptoms: NonEmptyText::new("cough").unwrap(),
            clinical_assessment: NonEmptyText::new("bronchitis").unwrap(),
            prescription: NonEmptyText::optional(Some("rest")),
            report_path: None,
            image_path: None,
        }
    }

    #[test]
    fn insert_assigns_increasing_sequence_and_time() {
        let (store, patient, doctor) = seeded();
        let a = store.insert(entry(&patient, &doctor, "C-1")).unwrap();
        let b = store.insert(entry(&patient, &doctor, "C-1")).unwrap();

        assert_eq!((a.sequence(), b.sequence()), (1, 2));
        assert!(a.created_at() < b.created_at());
    }

    #[test]
    fn insert_checks_references() {
        let (store, patient, doctor) = seeded();
        let mut bad = entry(&patient, &doctor, "C-1");
        bad.doctor_id = DoctorId::new();

        assert!(matches!(store.insert(bad), Err(RecordError::UnknownDoctor(_))));
        assert!(store
            .query_by_patient_and_case(&patient.id, &CaseId::new("C-1").unwrap())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn case_ids_scoped_per_patient() {
        let (store, patient, doctor) = seeded();
        let other = store
            .create_patient(PatientDetails {
                name: NonEmptyText::new("Alan Turing").unwrap(),
                age: 41,
                weight_kg: 70.0,
                height_cm: 178.0,
                gender: NonEmptyText::new("male").unwrap(),
            })
            .unwrap();

        store.insert(entry(&patient, &doctor, "SHARED")).unwrap();
        store.insert(entry(&other, &doctor, "SHARED")).unwrap();

        let timeline = store
            .query_by_patient_and_case(&patient.id, &CaseId::new("SHARED").unwrap())
            .unwrap();
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline[0].patient_id(), &patient.id);
        assert_eq!(store.list_case_ids_for_patient(&other.id).unwrap().len(), 1);
    }

    #[test]
    fn concurrent_inserts_produce_every_entry() {
        let (store, patient, doctor) = seeded();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                let e = entry(&patient, &doctor, "C-1");
                thread::spawn(move || store.insert(e).map(|_| ()))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let entries = store
            .query_by_patient_and_case(&patient.id, &CaseId::new("C-1").unwrap())
            .unwrap();
        assert_eq!(entries.len(), 16);
        for pair in entries.windows(2) {
            assert!(pair[0].created_at() < pair[1].created_at());
            assert_eq!(pair[0].sequence() + 1, pair[1].sequence());
        }
    }
}
