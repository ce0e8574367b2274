//! Diagnosis submission workflow.
//!
//! A submission moves through three states, each a distinct type so the steps cannot be
//! reordered or skipped:
//!
//! ```text
//! Submission<Unvalidated> --validate--> Submission<Validated> --resolve--> Submission<Resolved> --insert--> SubmissionOutcome
//! ```
//!
//! - `validate` checks required fields and identifier syntax. Failure leaves the store untouched.
//! - `resolve` looks up the case only to report whether it is being opened or extended. It never
//!   blocks the insert.
//! - `insert` appends the entry; unknown patient or doctor references fail here.

use crate::error::RecordResult;
use crate::model::{DiagnosisEntry, DoctorId, NewDiagnosisEntry, PatientId};
use crate::resolver::resolve;
use crate::store::RecordStore;
use crate::validation::{Field, RequiredFields};
use dxr_types::{CaseId, NonEmptyText};
use serde::Serialize;

/// A diagnosis submission exactly as the client sent it.
#[derive(Clone, Debug, Default)]
pub struct SubmitDiagnosis {
    pub patient_id: Option<String>,
    pub doctor_id: Option<String>,
    pub case_id: Option<String>,
    pub symptoms: Option<String>,
    pub clinical_assessment: Option<String>,
    pub prescription: Option<String>,
    pub report_path: Option<String>,
    pub image_path: Option<String>,
}

/// Whether a submission started a new case or added to an existing one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Opened,
    Extended,
}

/// Result of a successful submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub entry: DiagnosisEntry,
    pub case_status: CaseStatus,
    /// Entries already recorded for the case when the submission was resolved.
    pub prior_entries: usize,
}

pub struct Unvalidated(SubmitDiagnosis);

pub struct Validated(NewDiagnosisEntry);

pub struct Resolved {
    entry: NewDiagnosisEntry,
    prior_entries: usize,
}

/// A submission in state `S`.
pub struct Submission<S> {
    state: S,
}

impl Submission<Unvalidated> {
    pub fn new(raw: SubmitDiagnosis) -> Self {
        Self {
            state: Unvalidated(raw),
        }
    }

    /// Check required fields and parse identifiers.
    ///
    /// # Errors
    ///
    /// - `RecordError::MissingFields` listing every absent or blank required field.
    /// - `RecordError::InvalidIdentifier` if a patient or doctor id is not canonical.
    pub fn validate(self) -> RecordResult<Submission<Validated>> {
        let raw = self.state.0;

        let mut required = RequiredFields::default();
        let patient_id = required.text(Field::PatientId, raw.patient_id.as_deref());
        let doctor_id = required.text(Field::DoctorId, raw.doctor_id.as_deref());
        let case_id = required.text(Field::CaseId, raw.case_id.as_deref());
        let symptoms = required.text(Field::Symptoms, raw.symptoms.as_deref());
        let clinical_assessment =
            required.text(Field::ClinicalAssessment, raw.clinical_assessment.as_deref());

        let (
            Some(patient_id),
            Some(doctor_id),
            Some(case_id),
            Some(symptoms),
            Some(clinical_assessment),
        ) = (patient_id, doctor_id, case_id, symptoms, clinical_assessment)
        else {
            return Err(required.into_error());
        };

        let entry = NewDiagnosisEntry {
            patient_id: PatientId::parse(patient_id.as_str())?,
            doctor_id: DoctorId::parse(doctor_id.as_str())?,
            case_id: CaseId::from(case_id),
            symptoms,
            clinical_assessment,
            prescription: NonEmptyText::optional(raw.prescription.as_deref()),
            report_path: NonEmptyText::optional(raw.report_path.as_deref()),
            image_path: NonEmptyText::optional(raw.image_path.as_deref()),
        };

        Ok(Submission {
            state: Validated(entry),
        })
    }
}

impl Submission<Validated> {
    pub fn entry(&self) -> &NewDiagnosisEntry {
        &self.state.0
    }

    /// Look up the case to learn whether it already has entries.
    pub fn resolve<S>(self, store: &S) -> RecordResult<Submission<Resolved>>
    where
        S: RecordStore + ?Sized,
    {
        let entry = self.state.0;
        let prior_entries = resolve(store, &entry.patient_id, &entry.case_id)?
            .entries()
            .len();

        Ok(Submission {
            state: Resolved {
                entry,
                prior_entries,
            },
        })
    }
}

impl Submission<Resolved> {
    pub fn case_status(&self) -> CaseStatus {
        if self.state.prior_entries == 0 {
            CaseStatus::Opened
        } else {
            CaseStatus::Extended
        }
    }

    /// Append the entry to the store.
    pub fn insert<S>(self, store: &S) -> RecordResult<SubmissionOutcome>
    where
        S: RecordStore + ?Sized,
    {
        let case_status = self.case_status();
        let prior_entries = self.state.prior_entries;
        let entry = store.insert(self.state.entry)?;

        Ok(SubmissionOutcome {
            entry,
            case_status,
            prior_entries,
        })
    }
}

/// Run the full validate, resolve and insert sequence.
pub fn submit<S>(store: &S, raw: SubmitDiagnosis) -> RecordResult<SubmissionOutcome>
where
    S: RecordStore + ?Sized,
{
    Submission::new(raw).validate()?.resolve(store)?.insert(store)
}
