//! Git-versioned file store.
//!
//! ```text
//! <data_dir>/
//!   patients/<s1>/<s2>/<patient_id>/
//!       .git/
//!       .gitignore
//!       patient.yaml
//!       diagnoses/<timestamp_id>.yaml
//!   doctors/<s1>/<s2>/<doctor_id>/
//!       .git/
//!       .gitignore
//!       doctor.yaml
//! ```
//!
//! Entry files are named after their [`TimestampId`], so the lexical order of a directory listing
//! is the chronological order of the record. A new entry is written to a hidden temporary file
//! and renamed into place before it is committed; readers skip hidden files and so never observe
//! a partially written entry.

use super::shared::{create_uuid_and_shard_dir, KeyedLocks};
use super::{RecordStore, Registry};
use crate::config::CoreConfig;
use crate::constants::{
    DEFAULT_GITIGNORE, DIAGNOSES_DIR_NAME, DOCTOR_YAML_FILENAME, ENTRY_FILE_EXTENSION,
    PATIENT_YAML_FILENAME,
};
use crate::error::{RecordError, RecordResult};
use crate::model::{
    DiagnosisEntry, Doctor, DoctorDetails, DoctorId, NewDiagnosisEntry, Patient, PatientDetails,
    PatientId,
};
use crate::timeline::case_ids;
use crate::versioned_files::{
    escape_control_chars, CommitAction, CommitAuthor, CommitDomain, CommitMessage, FileToWrite,
    VersionedFileService,
};
use dxr_types::CaseId;
use dxr_uuid::{ShardableUuid, TimestampId};
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Durable store backed by one git repository per patient and per doctor.
pub struct FileStore {
    cfg: Arc<CoreConfig>,
    patient_locks: KeyedLocks<PatientId>,
}

impl FileStore {
    /// Open the store rooted at the configured data directory.
    ///
    /// The data directory itself must already exist; the `patients/` and `doctors/`
    /// subdirectories are created on demand.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::StorageDirCreation` if the data directory is missing or the record
    /// directories cannot be created.
    pub fn new(cfg: Arc<CoreConfig>) -> RecordResult<Self> {
        if !cfg.data_dir().is_dir() {
            return Err(RecordError::StorageDirCreation(io::Error::new(
                ErrorKind::NotFound,
                format!("data directory {} does not exist", cfg.data_dir().display()),
            )));
        }
        fs::create_dir_all(cfg.patients_dir()).map_err(RecordError::StorageDirCreation)?;
        fs::create_dir_all(cfg.doctors_dir()).map_err(RecordError::StorageDirCreation)?;

        Ok(Self {
            cfg,
            patient_locks: KeyedLocks::new(),
        })
    }

    fn patient_dir(&self, id: &PatientId) -> PathBuf {
        id.sharded_dir(&self.cfg.patients_dir())
    }

    fn doctor_dir(&self, id: &DoctorId) -> PathBuf {
        id.sharded_dir(&self.cfg.doctors_dir())
    }

    fn patient_exists(&self, id: &PatientId) -> bool {
        self.patient_dir(id).join(PATIENT_YAML_FILENAME).is_file()
    }

    /// Entry file names in a patient record, sorted. Hidden and non-YAML files are skipped.
    fn entry_files(patient_dir: &Path) -> RecordResult<Vec<PathBuf>> {
        let dir = patient_dir.join(DIAGNOSES_DIR_NAME);
        let read_dir = match fs::read_dir(&dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(RecordError::FileRead(e)),
        };

        let mut files = Vec::new();
        for entry in read_dir {
            let path = entry.map_err(RecordError::FileRead)?.path();
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_none_or(|n| n.starts_with('.'));
            let is_entry = path.extension().and_then(|e| e.to_str()) == Some(ENTRY_FILE_EXTENSION);
            if !hidden && is_entry && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn read_entry(path: &Path) -> RecordResult<DiagnosisEntry> {
        let entry: DiagnosisEntry = read_yaml(path)?;

        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        if stem != entry.id().to_string() {
            return Err(RecordError::CorruptRecord {
                path: path.to_path_buf(),
                reason: format!("file name does not match entry id {}", entry.id()),
            });
        }
        entry
            .check_consistent()
            .map_err(|reason| RecordError::CorruptRecord {
                path: path.to_path_buf(),
                reason,
            })?;

        Ok(entry)
    }

    fn read_entries(patient_dir: &Path) -> RecordResult<Vec<DiagnosisEntry>> {
        Self::entry_files(patient_dir)?
            .iter()
            .map(|path| Self::read_entry(path))
            .collect()
    }

    /// Id of the newest entry and the number of entries, from file names alone.
    fn last_entry_id(patient_dir: &Path) -> RecordResult<(Option<TimestampId>, u64)> {
        let files = Self::entry_files(patient_dir)?;
        let last = match files.last() {
            Some(path) => {
                let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
                let id = stem
                    .parse::<TimestampId>()
                    .map_err(|e| RecordError::CorruptRecord {
                        path: path.clone(),
                        reason: e.to_string(),
                    })?;
                Some(id)
            }
            None => None,
        };
        Ok((last, files.len() as u64))
    }

    /// Write `entry` into `diagnoses/` via a hidden temporary file and commit it.
    ///
    /// The entry file is removed again if the commit fails.
    fn persist_entry(
        &self,
        patient_dir: &Path,
        entry: &DiagnosisEntry,
        author: &CommitAuthor,
    ) -> RecordResult<()> {
        let yaml = serde_yaml::to_string(entry).map_err(RecordError::YamlSerialization)?;
        let message = CommitMessage::new(
            CommitDomain::Diagnosis,
            CommitAction::Append,
            "Diagnosis entry recorded",
        )?
        .with_trailer("Patient-Id", entry.patient_id().to_string())?
        .with_trailer("Case-Id", escape_control_chars(entry.case_id().as_str()))?
        .with_trailer("Doctor-Id", entry.doctor_id().to_string())?;

        let diagnoses_dir = patient_dir.join(DIAGNOSES_DIR_NAME);
        fs::create_dir_all(&diagnoses_dir).map_err(RecordError::FileWrite)?;

        let file_name = format!("{}.{}", entry.id(), ENTRY_FILE_EXTENSION);
        let temp_path = diagnoses_dir.join(format!(".{file_name}.tmp"));
        let final_path = diagnoses_dir.join(&file_name);

        if let Err(e) = fs::write(&temp_path, &yaml) {
            let _ = fs::remove_file(&temp_path);
            return Err(RecordError::FileWrite(e));
        }
        if let Err(e) = fs::rename(&temp_path, &final_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(RecordError::FileWrite(e));
        }

        let committed = VersionedFileService::open(patient_dir).and_then(|repo| {
            repo.commit_paths(
                author,
                &message,
                &[Path::new(DIAGNOSES_DIR_NAME).join(&file_name)],
            )
        });

        if let Err(e) = committed {
            let _ = fs::remove_file(&final_path);
            return Err(e);
        }
        Ok(())
    }
}

fn read_yaml<T: DeserializeOwned>(path: &Path) -> RecordResult<T> {
    let content = fs::read_to_string(path).map_err(RecordError::FileRead)?;
    serde_yaml::from_str(&content).map_err(|source| RecordError::YamlDeserialization {
        path: path.to_path_buf(),
        source,
    })
}

fn read_optional_yaml<T: DeserializeOwned>(path: &Path) -> RecordResult<Option<T>> {
    if !path.is_file() {
        return Ok(None);
    }
    read_yaml(path).map(Some)
}

impl Registry for FileStore {
    fn create_patient(&self, details: PatientDetails) -> RecordResult<Patient> {
        let (uuid, dir) = create_uuid_and_shard_dir(&self.cfg.patients_dir(), ShardableUuid::new)?;
        let patient = Patient::from_details(PatientId::from(uuid), details);

        let yaml = serde_yaml::to_string(&patient).map_err(RecordError::YamlSerialization)?;
        let message = CommitMessage::new(
            CommitDomain::Patient,
            CommitAction::Create,
            "Patient record created",
        )?
        .with_trailer("Patient-Id", patient.id.to_string())?;
        let files = [
            FileToWrite {
                relative_path: Path::new(".gitignore"),
                content: DEFAULT_GITIGNORE,
            },
            FileToWrite {
                relative_path: Path::new(PATIENT_YAML_FILENAME),
                content: &yaml,
            },
        ];

        VersionedFileService::init_and_commit(
            &dir,
            &CommitAuthor::registration(self.cfg.namespace()),
            &message,
            &files,
        )?;

        tracing::info!(patient_id = %patient.id, "patient record created");
        Ok(patient)
    }

    fn register_doctor(&self, details: DoctorDetails) -> RecordResult<Doctor> {
        let (uuid, dir) = create_uuid_and_shard_dir(&self.cfg.doctors_dir(), ShardableUuid::new)?;
        let doctor = Doctor::from_details(DoctorId::from(uuid), details);

        let yaml = serde_yaml::to_string(&doctor).map_err(RecordError::YamlSerialization)?;
        let message = CommitMessage::new(
            CommitDomain::Doctor,
            CommitAction::Create,
            "Doctor registered",
        )?
        .with_trailer("Doctor-Id", doctor.id.to_string())?;
        let files = [
            FileToWrite {
                relative_path: Path::new(".gitignore"),
                content: DEFAULT_GITIGNORE,
            },
            FileToWrite {
                relative_path: Path::new(DOCTOR_YAML_FILENAME),
                content: &yaml,
            },
        ];

        VersionedFileService::init_and_commit(
            &dir,
            &CommitAuthor::registration(self.cfg.namespace()),
            &message,
            &files,
        )?;

        tracing::info!(doctor_id = %doctor.id, "doctor registered");
        Ok(doctor)
    }

    fn patient(&self, id: &PatientId) -> RecordResult<Option<Patient>> {
        read_optional_yaml(&self.patient_dir(id).join(PATIENT_YAML_FILENAME))
    }

    fn doctor(&self, id: &DoctorId) -> RecordResult<Option<Doctor>> {
        read_optional_yaml(&self.doctor_dir(id).join(DOCTOR_YAML_FILENAME))
    }
}

impl RecordStore for FileStore {
    fn insert(&self, entry: NewDiagnosisEntry) -> RecordResult<DiagnosisEntry> {
        if !self.patient_exists(&entry.patient_id) {
            return Err(RecordError::UnknownPatient(entry.patient_id));
        }
        let Some(doctor) = self.doctor(&entry.doctor_id)? else {
            return Err(RecordError::UnknownDoctor(entry.doctor_id));
        };
        let author = CommitAuthor::doctor(&doctor.name, &doctor.id, self.cfg.namespace());

        let patient_dir = self.patient_dir(&entry.patient_id);
        let lock = self.patient_locks.lock_for(&entry.patient_id)?;
        let _guard = lock.lock().map_err(|_| RecordError::LockPoisoned)?;

        let (last_id, count) = Self::last_entry_id(&patient_dir)?;
        let id = TimestampId::generate(last_id.as_ref());
        let stored = DiagnosisEntry::stored(id, count + 1, entry);

        self.persist_entry(&patient_dir, &stored, &author)?;

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
        if !self.patient_exists(patient_id) {
            return Ok(Vec::new());
        }
        let mut entries: Vec<DiagnosisEntry> = Self::read_entries(&self.patient_dir(patient_id))?
            .into_iter()
            .filter(|e| e.belongs_to(patient_id, case_id))
            .collect();
        entries.sort_by_key(|e| (e.created_at(), e.sequence()));
        Ok(entries)
    }

    fn list_case_ids_for_patient(&self, patient_id: &PatientId) -> RecordResult<BTreeSet<CaseId>> {
        if !self.patient_exists(patient_id) {
            return Err(RecordError::PatientNotFound(patient_id.clone()));
        }
        Ok(case_ids(&Self::read_entries(&self.patient_dir(patient_id))?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreBackend;
    use dxr_types::NonEmptyText;
    use std::thread;
    use tempfile::TempDir;

    fn test_cfg(data_dir: &Path) -> Arc<CoreConfig> {
        Arc::new(
            CoreConfig::new(
                data_dir.to_path_buf(),
                NonEmptyText::new("dxr.dev.1").unwrap(),
                StoreBackend::File,
            )
            .expect("CoreConfig::new should succeed"),
        )
    }

    fn patient_details() -> PatientDetails {
        PatientDetails {
            name: NonEmptyText::new("Ada Lovelace").unwrap(),
            age: 36,
            weight_kg: 58.5,
            height_cm: 165.0,
            gender: NonEmptyText::new("female").unwrap(),
        }
    }

    fn doctor_details() -> DoctorDetails {
        DoctorDetails {
            name: NonEmptyText::new("Dr. Joseph Bell").unwrap(),
            specialty: Some(NonEmptyText::new("General practice").unwrap()),
        }
    }

    fn new_entry(patient: &Patient, doctor: &Doctor, case: &str, symptoms: &str) -> NewDiagnosisEntry {
        NewDiagnosisEntry {
            case_id: CaseId::new(case).unwrap(),
            patient_id: patient.id.clone(),
            doctor_id: doctor.id.clone(),
            symptoms: NonEmptyText::new(symptoms).unwrap(),
            clinical_assessment: NonEmptyText::new("assessment").unwrap(),
            prescription: None,
            report_path: None,
            image_path: None,
        }
    }

    fn setup() -> (TempDir, FileStore, Patient, Doctor) {
        let temp = TempDir::new().expect("TempDir::new should succeed");
        let store = FileStore::new(test_cfg(temp.path())).expect("FileStore::new should succeed");
        let patient = store
            .create_patient(patient_details())
            .expect("create_patient should succeed");
        let doctor = store
            .register_doctor(doctor_details())
            .expect("register_doctor should succeed");
        (temp, store, patient, doctor)
    }

    fn commit_count(dir: &Path) -> usize {
        let repo = git2::Repository::open(dir).expect("repository should open");
        let mut walk = repo.revwalk().expect("revwalk should succeed");
        walk.push_head().expect("push_head should succeed");
        walk.count()
    }

    #[test]
    fn test_new_requires_existing_data_dir() {
        let temp = TempDir::new().expect("TempDir::new should succeed");
        let missing = temp.path().join("nope");

        let result = FileStore::new(test_cfg(&missing));
        assert!(matches!(result, Err(RecordError::StorageDirCreation(_))));
    }

    #[test]
    fn test_create_patient_writes_sharded_repository() {
        let (temp, store, patient, _) = setup();

        let dir = patient.id.sharded_dir(&temp.path().join("patients"));
        assert!(dir.join(".git").is_dir());
        assert!(dir.join(PATIENT_YAML_FILENAME).is_file());
        assert_eq!(
            fs::read_to_string(dir.join(".gitignore")).expect("read should succeed"),
            DEFAULT_GITIGNORE
        );
        assert_eq!(commit_count(&dir), 1);

        let loaded = store
            .patient(&patient.id)
            .expect("patient lookup should succeed")
            .expect("patient should exist");
        assert_eq!(loaded, patient);
    }

    #[test]
    fn test_unknown_records_resolve_to_none() {
        let (_temp, store, _, _) = setup();
        assert!(store
            .patient(&PatientId::new())
            .expect("lookup should succeed")
            .is_none());
        assert!(store
            .doctor(&DoctorId::new())
            .expect("lookup should succeed")
            .is_none());
    }

    #[test]
    fn test_insert_commits_entry_authored_by_doctor() {
        let (temp, store, patient, doctor) = setup();

        let stored = store
            .insert(new_entry(&patient, &doctor, "DX-1", "fever"))
            .expect("insert should succeed");
        assert_eq!(stored.sequence(), 1);

        let dir = patient.id.sharded_dir(&temp.path().join("patients"));
        let file = dir
            .join(DIAGNOSES_DIR_NAME)
            .join(format!("{}.yaml", stored.id()));
        assert!(file.is_file());
        assert_eq!(commit_count(&dir), 2);

        let repo = git2::Repository::open(&dir).expect("repository should open");
        let head = repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .expect("HEAD should be a commit");
        let expected_email = format!("{}@dxr.dev.1", doctor.id);
        assert_eq!(head.author().email(), Some(expected_email.as_str()));
        let message = head.message().expect("message should be UTF-8");
        assert!(message.starts_with("diagnosis:append:"));
        assert!(message.contains("Case-Id: DX-1"));
        assert!(!message.contains("fever"));
    }

    #[test]
    fn test_insert_rejects_unknown_references_without_writing() {
        let (temp, store, patient, doctor) = setup();

        let mut unknown_doctor = new_entry(&patient, &doctor, "DX-1", "fever");
        unknown_doctor.doctor_id = DoctorId::new();
        assert!(matches!(
            store.insert(unknown_doctor),
            Err(RecordError::UnknownDoctor(_))
        ));

        let mut unknown_patient = new_entry(&patient, &doctor, "DX-1", "fever");
        unknown_patient.patient_id = PatientId::new();
        assert!(matches!(
            store.insert(unknown_patient),
            Err(RecordError::UnknownPatient(_))
        ));

        let dir = patient.id.sharded_dir(&temp.path().join("patients"));
        assert!(!dir.join(DIAGNOSES_DIR_NAME).exists());
        assert_eq!(commit_count(&dir), 1);
    }

    #[test]
    fn test_query_filters_by_case_and_orders_chronologically() {
        let (_temp, store, patient, doctor) = setup();

        let first = store
            .insert(new_entry(&patient, &doctor, "DX-1", "fever"))
            .expect("insert should succeed");
        store
            .insert(new_entry(&patient, &doctor, "DX-2", "rash"))
            .expect("insert should succeed");
        let third = store
            .insert(new_entry(&patient, &doctor, "DX-1", "recovering"))
            .expect("insert should succeed");

        let entries = store
            .query_by_patient_and_case(&patient.id, &CaseId::new("DX-1").unwrap())
            .expect("query should succeed");
        assert_eq!(entries, vec![first.clone(), third.clone()]);
        assert!(first.created_at() < third.created_at());
        assert_eq!(third.sequence(), 3);

        let none = store
            .query_by_patient_and_case(&patient.id, &CaseId::new("DX-UNKNOWN").unwrap())
            .expect("query should succeed");
        assert!(none.is_empty());
    }

    #[test]
    fn test_case_ids_are_distinct_and_sorted() {
        let (_temp, store, patient, doctor) = setup();

        assert!(store
            .list_case_ids_for_patient(&patient.id)
            .expect("listing should succeed")
            .is_empty());

        for case in ["DX-2", "DX-1", "DX-2"] {
            store
                .insert(new_entry(&patient, &doctor, case, "symptom"))
                .expect("insert should succeed");
        }

        let ids: Vec<String> = store
            .list_case_ids_for_patient(&patient.id)
            .expect("listing should succeed")
            .into_iter()
            .map(|c| c.as_str().to_string())
            .collect();
        assert_eq!(ids, vec!["DX-1", "DX-2"]);

        assert!(matches!(
            store.list_case_ids_for_patient(&PatientId::new()),
            Err(RecordError::PatientNotFound(_))
        ));
    }

    #[test]
    fn test_readers_ignore_hidden_temporary_files() {
        let (temp, store, patient, doctor) = setup();
        store
            .insert(new_entry(&patient, &doctor, "DX-1", "fever"))
            .expect("insert should succeed");

        let diagnoses = patient
            .id
            .sharded_dir(&temp.path().join("patients"))
            .join(DIAGNOSES_DIR_NAME);
        fs::write(diagnoses.join(".half-written.yaml.tmp"), "symp").expect("write should succeed");
        fs::write(diagnoses.join("notes.txt"), "scratch").expect("write should succeed");

        let entries = store
            .query_by_patient_and_case(&patient.id, &CaseId::new("DX-1").unwrap())
            .expect("query should succeed");
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_corrupt_entry_is_a_storage_fault() {
        let (temp, store, patient, doctor) = setup();
        let stored = store
            .insert(new_entry(&patient, &doctor, "DX-1", "fever"))
            .expect("insert should succeed");

        let file = patient
            .id
            .sharded_dir(&temp.path().join("patients"))
            .join(DIAGNOSES_DIR_NAME)
            .join(format!("{}.yaml", stored.id()));
        fs::write(&file, "not: [valid").expect("write should succeed");

        let err = store
            .query_by_patient_and_case(&patient.id, &CaseId::new("DX-1").unwrap())
            .unwrap_err();
        assert!(err.is_fault());
    }

    #[test]
    fn test_concurrent_inserts_are_serialised_per_patient() {
        let (_temp, store, patient, doctor) = setup();
        let store = Arc::new(store);
        let n = 8;

        let handles: Vec<_> = (0..n)
            .map(|i| {
                let store = Arc::clone(&store);
                let entry = new_entry(&patient, &doctor, "DX-1", &format!("visit {i}"));
                thread::spawn(move || store.insert(entry))
            })
            .collect();
        for handle in handles {
            handle
                .join()
                .expect("thread should not panic")
                .expect("insert should succeed");
        }

        let entries = store
            .query_by_patient_and_case(&patient.id, &CaseId::new("DX-1").unwrap())
            .expect("query should succeed");
        assert_eq!(entries.len(), n);
        for pair in entries.windows(2) {
            assert!(pair[0].created_at() < pair[1].created_at());
        }
        let mut sequences: Vec<u64> = entries.iter().map(|e| e.sequence()).collect();
        sequences.sort_unstable();
        assert_eq!(sequences, (1..=n as u64).collect::<Vec<_>>());
    }
}
