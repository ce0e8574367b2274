//! Domain records: patients, doctors and diagnosis entries.
//!
//! Raw inputs (`NewPatient`, `NewDoctor`) carry optional fields exactly as a client sent them and
//! are turned into validated details before any store sees them. Stored records are immutable;
//! [`DiagnosisEntry`] in particular exposes read-only accessors only.

use crate::validation::{Field, RequiredFields};
use crate::{RecordError, RecordResult};
use chrono::{DateTime, Utc};
use dxr_types::{CaseId, NonEmptyText};
use dxr_uuid::{ShardableUuid, TimestampId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const MAX_AGE_YEARS: i64 = 150;
const MAX_WEIGHT_KG: f64 = 1_000.0;
const MAX_HEIGHT_CM: f64 = 300.0;

/// Identifier of a patient record.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(ShardableUuid);

impl PatientId {
    pub fn new() -> Self {
        Self(ShardableUuid::new())
    }

    /// Parse an externally supplied identifier. Only the canonical form is accepted.
    pub fn parse(input: &str) -> RecordResult<Self> {
        ShardableUuid::parse(input.trim())
            .map(Self)
            .map_err(|source| RecordError::InvalidIdentifier {
                kind: "patient",
                source,
            })
    }

    pub fn sharded_dir(&self, parent_dir: &Path) -> PathBuf {
        self.0.sharded_dir(parent_dir)
    }

    pub fn as_uuid(&self) -> &ShardableUuid {
        &self.0
    }
}

impl From<ShardableUuid> for PatientId {
    fn from(uuid: ShardableUuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for PatientId {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Identifier of a doctor record.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DoctorId(ShardableUuid);

impl DoctorId {
    pub fn new() -> Self {
        Self(ShardableUuid::new())
    }

    /// Parse an externally supplied identifier. Only the canonical form is accepted.
    pub fn parse(input: &str) -> RecordResult<Self> {
        ShardableUuid::parse(input.trim())
            .map(Self)
            .map_err(|source| RecordError::InvalidIdentifier {
                kind: "doctor",
                source,
            })
    }

    pub fn sharded_dir(&self, parent_dir: &Path) -> PathBuf {
        self.0.sharded_dir(parent_dir)
    }
}

impl From<ShardableUuid> for DoctorId {
    fn from(uuid: ShardableUuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for DoctorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for DoctorId {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Patient registration input, as submitted.
#[derive(Clone, Debug, Default)]
pub struct NewPatient {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub gender: Option<String>,
}

/// Validated patient attributes.
#[derive(Clone, Debug, PartialEq)]
pub struct PatientDetails {
    pub name: NonEmptyText,
    pub age: u32,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub gender: NonEmptyText,
}

impl NewPatient {
    /// Check that every attribute is present and plausible.
    ///
    /// # Errors
    ///
    /// - `RecordError::MissingFields` listing every absent or blank attribute.
    /// - `RecordError::InvalidInput` if a numeric attribute is out of range.
    pub fn validate(&self) -> RecordResult<PatientDetails> {
        let mut required = RequiredFields::default();
        let name = required.text(Field::Name, self.name.as_deref());
        let age = required.value(Field::Age, self.age);
        let weight_kg = required.value(Field::WeightKg, self.weight_kg);
        let height_cm = required.value(Field::HeightCm, self.height_cm);
        let gender = required.text(Field::Gender, self.gender.as_deref());

        let (Some(name), Some(age), Some(weight_kg), Some(height_cm), Some(gender)) =
            (name, age, weight_kg, height_cm, gender)
        else {
            return Err(required.into_error());
        };

        if !(0..=MAX_AGE_YEARS).contains(&age) {
            return Err(RecordError::InvalidInput(format!(
                "age must be between 0 and {MAX_AGE_YEARS}"
            )));
        }
        check_measurement(Field::WeightKg, weight_kg, MAX_WEIGHT_KG)?;
        check_measurement(Field::HeightCm, height_cm, MAX_HEIGHT_CM)?;

        Ok(PatientDetails {
            name,
            age: age as u32,
            weight_kg,
            height_cm,
            gender,
        })
    }
}

fn check_measurement(field: Field, value: f64, max: f64) -> RecordResult<()> {
    if value.is_finite() && value > 0.0 && value <= max {
        Ok(())
    } else {
        Err(RecordError::InvalidInput(format!(
            "{field} must be greater than 0 and at most {max}"
        )))
    }
}

/// A stored patient identity record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    pub name: NonEmptyText,
    pub age: u32,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub gender: NonEmptyText,
    pub created_at: DateTime<Utc>,
}

impl Patient {
    pub(crate) fn from_details(id: PatientId, details: PatientDetails) -> Self {
        Self {
            id,
            name: details.name,
            age: details.age,
            weight_kg: details.weight_kg,
            height_cm: details.height_cm,
            gender: details.gender,
            created_at: Utc::now(),
        }
    }
}

/// Doctor registration input, as submitted.
#[derive(Clone, Debug, Default)]
pub struct NewDoctor {
    pub name: Option<String>,
    pub specialty: Option<String>,
}

/// Validated doctor attributes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DoctorDetails {
    pub name: NonEmptyText,
    pub specialty: Option<NonEmptyText>,
}

impl NewDoctor {
    pub fn validate(&self) -> RecordResult<DoctorDetails> {
        let mut required = RequiredFields::default();
        let Some(name) = required.text(Field::Name, self.name.as_deref()) else {
            return Err(required.into_error());
        };

        Ok(DoctorDetails {
            name,
            specialty: NonEmptyText::optional(self.specialty.as_deref()),
        })
    }
}

/// A stored doctor identity record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: DoctorId,
    pub name: NonEmptyText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<NonEmptyText>,
    pub created_at: DateTime<Utc>,
}

impl Doctor {
    pub(crate) fn from_details(id: DoctorId, details: DoctorDetails) -> Self {
        Self {
            id,
            name: details.name,
            specialty: details.specialty,
            created_at: Utc::now(),
        }
    }
}

/// A fully validated diagnosis entry that has not been stored yet.
///
/// Required fields are typed as non-empty, so an incomplete entry cannot reach a store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewDiagnosisEntry {
    pub case_id: CaseId,
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
    pub symptoms: NonEmptyText,
    pub clinical_assessment: NonEmptyText,
    pub prescription: Option<NonEmptyText>,
    pub report_path: Option<NonEmptyText>,
    pub image_path: Option<NonEmptyText>,
}

/// One immutable diagnosis event for a patient under a case identifier.
///
/// `created_at` always equals the timestamp of `id`; `sequence` is the 1-based insertion
/// counter within the patient's record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisEntry {
    id: TimestampId,
    sequence: u64,
    case_id: CaseId,
    patient_id: PatientId,
    doctor_id: DoctorId,
    symptoms: NonEmptyText,
    clinical_assessment: NonEmptyText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prescription: Option<NonEmptyText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    report_path: Option<NonEmptyText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_path: Option<NonEmptyText>,
    created_at: DateTime<Utc>,
}

impl DiagnosisEntry {
    /// Stamp a validated entry with its store-assigned identity.
    pub(crate) fn stored(id: TimestampId, sequence: u64, entry: NewDiagnosisEntry) -> Self {
        Self {
            created_at: id.timestamp(),
            id,
            sequence,
            case_id: entry.case_id,
            patient_id: entry.patient_id,
            doctor_id: entry.doctor_id,
            symptoms: entry.symptoms,
            clinical_assessment: entry.clinical_assessment,
            prescription: entry.prescription,
            report_path: entry.report_path,
            image_path: entry.image_path,
        }
    }

    pub fn id(&self) -> &TimestampId {
        &self.id
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn case_id(&self) -> &CaseId {
        &self.case_id
    }

    pub fn patient_id(&self) -> &PatientId {
        &self.patient_id
    }

    pub fn doctor_id(&self) -> &DoctorId {
        &self.doctor_id
    }

    pub fn symptoms(&self) -> &NonEmptyText {
        &self.symptoms
    }

    pub fn clinical_assessment(&self) -> &NonEmptyText {
        &self.clinical_assessment
    }

    pub fn prescription(&self) -> Option<&NonEmptyText> {
        self.prescription.as_ref()
    }

    pub fn report_path(&self) -> Option<&NonEmptyText> {
        self.report_path.as_ref()
    }

    pub fn image_path(&self) -> Option<&NonEmptyText> {
        self.image_path.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// True if this entry belongs to the given logical case.
    pub fn belongs_to(&self, patient_id: &PatientId, case_id: &CaseId) -> bool {
        &self.patient_id == patient_id && &self.case_id == case_id
    }

    /// True if this entry carries the same submitted content as `entry`.
    pub fn matches_submission(&self, entry: &NewDiagnosisEntry) -> bool {
        self.case_id == entry.case_id
            && self.patient_id == entry.patient_id
            && self.doctor_id == entry.doctor_id
            && self.symptoms == entry.symptoms
            && self.clinical_assessment == entry.clinical_assessment
            && self.prescription == entry.prescription
            && self.report_path == entry.report_path
            && self.image_path == entry.image_path
    }

    /// Reject a decoded entry whose stored timestamp disagrees with its identifier.
    pub(crate) fn check_consistent(&self) -> Result<(), String> {
        if self.created_at != self.id.timestamp() {
            return Err(format!(
                "created_at {} does not match entry id {}",
                self.created_at, self.id
            ));
        }
        if self.sequence == 0 {
            return Err("sequence must be 1-based".into());
        }
        Ok(())
    }
}
