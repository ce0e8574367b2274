//! Boundary-facing operations over a configured store.
//!
//! [`DiagnosisService`] is the one type the REST and CLI front ends talk to. It is cheap to clone
//! and safe to share between request handlers.

use crate::config::CoreConfig;
use crate::error::{RecordError, RecordResult};
use crate::model::{Doctor, NewDoctor, NewPatient, Patient, PatientId};
use crate::resolver::{resolve, Resolution};
use crate::store::{open_store, Store};
use crate::workflow::{submit, SubmissionOutcome, SubmitDiagnosis};
use dxr_types::CaseId;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Clone)]
pub struct DiagnosisService {
    store: Arc<dyn Store>,
}

impl DiagnosisService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Open the store selected by `cfg` and wrap it.
    pub fn from_config(cfg: Arc<CoreConfig>) -> RecordResult<Self> {
        Ok(Self::new(open_store(cfg)?))
    }

    /// Register a patient. Every attribute is required.
    pub fn create_patient(&self, input: NewPatient) -> RecordResult<Patient> {
        let details = input.validate().inspect_err(|e| {
            tracing::debug!(error = %e, "patient registration rejected");
        })?;
        self.store.create_patient(details)
    }

    pub fn register_doctor(&self, input: NewDoctor) -> RecordResult<Doctor> {
        let details = input.validate().inspect_err(|e| {
            tracing::debug!(error = %e, "doctor registration rejected");
        })?;
        self.store.register_doctor(details)
    }

    /// Fetch a patient record.
    ///
    /// # Errors
    ///
    /// `RecordError::PatientNotFound` if the patient is not registered.
    pub fn patient(&self, patient_id: &PatientId) -> RecordResult<Patient> {
        self.store
            .patient(patient_id)?
            .ok_or_else(|| RecordError::PatientNotFound(patient_id.clone()))
    }

    /// Distinct case identifiers for a patient's summary view.
    pub fn list_case_ids(&self, patient_id: &PatientId) -> RecordResult<BTreeSet<CaseId>> {
        self.store.list_case_ids_for_patient(patient_id)
    }

    /// Look up the timeline of one case. A missing case is `Resolution::NotFound`, not an error.
    pub fn resolve_timeline(
        &self,
        patient_id: &PatientId,
        case_id: &CaseId,
    ) -> RecordResult<Resolution> {
        let resolution = resolve(self.store.as_ref(), patient_id, case_id)?;
        if !resolution.exists() {
            tracing::debug!(%patient_id, %case_id, "no entries for case");
        }
        Ok(resolution)
    }

    /// Validate, resolve and append a diagnosis entry.
    pub fn submit(&self, input: SubmitDiagnosis) -> RecordResult<SubmissionOutcome> {
        submit(self.store.as_ref(), input).inspect_err(|e| {
            if !e.is_fault() {
                tracing::debug!(error = %e, kind = %e.kind(), "diagnosis submission rejected");
            }
        })
    }
}
