//! Identifier resolution for `(patient, case)` pairs.
//!
//! A missing case is an ordinary answer, not a failure: [`resolve`] returns
//! [`Resolution::NotFound`] so callers can offer to open a new case. Only storage faults come
//! back as errors.

use crate::error::{RecordError, RecordResult};
use crate::model::{DiagnosisEntry, PatientId};
use crate::store::RecordStore;
use crate::timeline::Timeline;
use dxr_types::CaseId;

/// Outcome of looking up one logical case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Found(Timeline),
    NotFound,
}

impl Resolution {
    /// True iff at least one entry exists for the case.
    pub fn exists(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// The ordered entries; empty for `NotFound`.
    pub fn entries(&self) -> &[DiagnosisEntry] {
        match self {
            Self::Found(timeline) => timeline.entries(),
            Self::NotFound => &[],
        }
    }

    pub fn into_timeline(self) -> Option<Timeline> {
        match self {
            Self::Found(timeline) => Some(timeline),
            Self::NotFound => None,
        }
    }

    /// Convert into a `Result`, turning `NotFound` into `RecordError::CaseNotFound`.
    pub fn found_or_err(self, patient_id: &PatientId, case_id: &CaseId) -> RecordResult<Timeline> {
        self.into_timeline()
            .ok_or_else(|| RecordError::CaseNotFound {
                patient_id: patient_id.clone(),
                case_id: case_id.clone(),
            })
    }
}

/// Look up every entry recorded for `patient_id` under `case_id`.
pub fn resolve<S>(store: &S, patient_id: &PatientId, case_id: &CaseId) -> RecordResult<Resolution>
where
    S: RecordStore + ?Sized,
{
    let entries = store.query_by_patient_and_case(patient_id, case_id)?;
    Ok(
        match Timeline::new(patient_id.clone(), case_id.clone(), entries) {
            Some(timeline) => Resolution::Found(timeline),
            None => Resolution::NotFound,
        },
    )
}
