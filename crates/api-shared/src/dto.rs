//! Request and response bodies.

use chrono::{DateTime, SecondsFormat, Utc};
use dxr_core::{
    CaseId, CaseStatus, DiagnosisEntry, Doctor, NewDoctor, NewPatient, Patient, SubmissionOutcome,
    SubmitDiagnosis, Timeline,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use utoipa::ToSchema;

fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct CreatePatientReq {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub gender: Option<String>,
}

impl From<CreatePatientReq> for NewPatient {
    fn from(req: CreatePatientReq) -> Self {
        Self {
            name: req.name,
            age: req.age,
            weight_kg: req.weight_kg,
            height_cm: req.height_cm,
            gender: req.gender,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CreatePatientRes {
    pub patient_id: String,
    pub created_at: String,
}

impl From<&Patient> for CreatePatientRes {
    fn from(patient: &Patient) -> Self {
        Self {
            patient_id: patient.id.to_string(),
            created_at: timestamp(patient.created_at),
        }
    }
}

/// A registered patient's identity record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PatientRes {
    pub patient_id: String,
    pub name: String,
    pub age: u32,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub gender: String,
    pub created_at: String,
}

impl From<&Patient> for PatientRes {
    fn from(patient: &Patient) -> Self {
        Self {
            patient_id: patient.id.to_string(),
            name: patient.name.as_str().to_string(),
            age: patient.age,
            weight_kg: patient.weight_kg,
            height_cm: patient.height_cm,
            gender: patient.gender.as_str().to_string(),
            created_at: timestamp(patient.created_at),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct RegisterDoctorReq {
    pub name: Option<String>,
    pub specialty: Option<String>,
}

impl From<RegisterDoctorReq> for NewDoctor {
    fn from(req: RegisterDoctorReq) -> Self {
        Self {
            name: req.name,
            specialty: req.specialty,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RegisterDoctorRes {
    pub doctor_id: String,
    pub created_at: String,
}

impl From<&Doctor> for RegisterDoctorRes {
    fn from(doctor: &Doctor) -> Self {
        Self {
            doctor_id: doctor.id.to_string(),
            created_at: timestamp(doctor.created_at),
        }
    }
}

/// Distinct case identifiers of one patient, alphabetical.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CaseIdsRes {
    pub patient_id: String,
    pub case_ids: Vec<String>,
}

impl CaseIdsRes {
    pub fn new(patient_id: impl ToString, case_ids: &BTreeSet<CaseId>) -> Self {
        Self {
            patient_id: patient_id.to_string(),
            case_ids: case_ids.iter().map(|c| c.as_str().to_string()).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DiagnosisEntryDto {
    pub id: String,
    pub sequence: u64,
    pub case_id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub symptoms: String,
    pub clinical_assessment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prescription: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    pub created_at: String,
}

impl From<&DiagnosisEntry> for DiagnosisEntryDto {
    fn from(entry: &DiagnosisEntry) -> Self {
        Self {
            id: entry.id().to_string(),
            sequence: entry.sequence(),
            case_id: entry.case_id().as_str().to_string(),
            patient_id: entry.patient_id().to_string(),
            doctor_id: entry.doctor_id().to_string(),
            symptoms: entry.symptoms().as_str().to_string(),
            clinical_assessment: entry.clinical_assessment().as_str().to_string(),
            prescription: entry.prescription().map(|t| t.as_str().to_string()),
            report_path: entry.report_path().map(|t| t.as_str().to_string()),
            image_path: entry.image_path().map(|t| t.as_str().to_string()),
            created_at: timestamp(entry.created_at()),
        }
    }
}

/// Entries of one case, oldest first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TimelineRes {
    pub patient_id: String,
    pub case_id: String,
    pub entries: Vec<DiagnosisEntryDto>,
}

impl From<&Timeline> for TimelineRes {
    fn from(timeline: &Timeline) -> Self {
        Self {
            patient_id: timeline.patient_id().to_string(),
            case_id: timeline.case_id().as_str().to_string(),
            entries: timeline.entries().iter().map(DiagnosisEntryDto::from).collect(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct SubmitDiagnosisReq {
    pub patient_id: Option<String>,
    pub doctor_id: Option<String>,
    pub case_id: Option<String>,
    pub symptoms: Option<String>,
    pub clinical_assessment: Option<String>,
    pub prescription: Option<String>,
    pub report_path: Option<String>,
    pub image_path: Option<String>,
}

impl From<SubmitDiagnosisReq> for SubmitDiagnosis {
    fn from(req: SubmitDiagnosisReq) -> Self {
        Self {
            patient_id: req.patient_id,
            doctor_id: req.doctor_id,
            case_id: req.case_id,
            symptoms: req.symptoms,
            clinical_assessment: req.clinical_assessment,
            prescription: req.prescription,
            report_path: req.report_path,
            image_path: req.image_path,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatusDto {
    Opened,
    Extended,
}

impl From<CaseStatus> for CaseStatusDto {
    fn from(status: CaseStatus) -> Self {
        match status {
            CaseStatus::Opened => Self::Opened,
            CaseStatus::Extended => Self::Extended,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SubmitDiagnosisRes {
    pub entry: DiagnosisEntryDto,
    pub case_status: CaseStatusDto,
    pub prior_entries: u64,
}

impl From<&SubmissionOutcome> for SubmitDiagnosisRes {
    fn from(outcome: &SubmissionOutcome) -> Self {
        Self {
            entry: DiagnosisEntryDto::from(&outcome.entry),
            case_status: outcome.case_status.into(),
            prior_entries: outcome.prior_entries as u64,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
}

/// Body of every non-2xx response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: ErrorDetail,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_request_tolerates_missing_fields() {
        let req: SubmitDiagnosisReq =
            serde_json::from_str(r#"{"case_id":"DX-1","symptoms":"fever"}"#).unwrap();
        let raw = SubmitDiagnosis::from(req);

        assert_eq!(raw.case_id.as_deref(), Some("DX-1"));
        assert!(raw.patient_id.is_none());
        assert!(raw.clinical_assessment.is_none());
    }

    #[test]
    fn case_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&CaseStatusDto::from(CaseStatus::Extended)).unwrap(),
            "\"extended\""
        );
    }

    #[test]
    fn error_body_omits_empty_fields() {
        let body = ErrorRes {
            error: ErrorDetail {
                code: "not_found".into(),
                message: "nothing here".into(),
                fields: Vec::new(),
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json["error"].get("fields").is_none());
    }

    #[test]
    fn case_ids_res_keeps_set_order() {
        let ids: BTreeSet<CaseId> = ["b", "a"].iter().map(|s| CaseId::new(s).unwrap()).collect();
        let res = CaseIdsRes::new("p", &ids);
        assert_eq!(res.case_ids, vec!["a", "b"]);
    }
}
