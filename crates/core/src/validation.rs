//! Input validation utilities.
//!
//! This module contains the field vocabulary used in validation errors and the helpers that
//! check user inputs before anything touches the store.

use crate::{RecordError, RecordResult};
use dxr_types::NonEmptyText;
use serde::Serialize;
use std::fmt;

/// A named input field, as reported in validation errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    PatientId,
    DoctorId,
    CaseId,
    Symptoms,
    ClinicalAssessment,
    Name,
    Age,
    WeightKg,
    HeightCm,
    Gender,
}

impl Field {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PatientId => "patient_id",
            Self::DoctorId => "doctor_id",
            Self::CaseId => "case_id",
            Self::Symptoms => "symptoms",
            Self::ClinicalAssessment => "clinical_assessment",
            Self::Name => "name",
            Self::Age => "age",
            Self::WeightKg => "weight_kg",
            Self::HeightCm => "height_cm",
            Self::Gender => "gender",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accumulates missing required fields so a single error can list all of them.
///
/// Blank and whitespace-only strings count as missing.
#[derive(Debug, Default)]
pub(crate) struct RequiredFields {
    missing: Vec<Field>,
}

impl RequiredFields {
    pub(crate) fn text(&mut self, field: Field, value: Option<&str>) -> Option<NonEmptyText> {
        let text = value.and_then(|v| NonEmptyText::new(v).ok());
        if text.is_none() {
            self.missing.push(field);
        }
        text
    }

    pub(crate) fn value<T>(&mut self, field: Field, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.missing.push(field);
        }
        value
    }

    pub(crate) fn into_error(self) -> RecordError {
        RecordError::MissingFields(self.missing)
    }
}

/// Validates that a namespace string is safe for embedding in a URI authority or e-mail domain.
///
/// The namespace is used as the domain of git author addresses (`<doctor_id>@<namespace>`).
///
/// # Errors
///
/// Returns a `RecordError::InvalidInput` if the namespace is empty, too long, or contains
/// characters outside `[A-Za-z0-9._-]`.
pub fn validate_namespace_safe_for_uri(namespace: &str) -> RecordResult<()> {
    const MAX_NAMESPACE_LEN: usize = 253;

    if namespace.trim().is_empty() {
        return Err(RecordError::InvalidInput("namespace cannot be empty".into()));
    }

    if namespace.len() > MAX_NAMESPACE_LEN {
        return Err(RecordError::InvalidInput(format!(
            "namespace exceeds maximum length of {} characters",
            MAX_NAMESPACE_LEN
        )));
    }

    let ok = namespace
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'.' | b'-' | b'_'));

    if !ok {
        return Err(RecordError::InvalidInput(
            "namespace contains invalid characters (only alphanumeric, '.', '-', '_' allowed)"
                .into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_namespace_accepts_default() {
        assert!(validate_namespace_safe_for_uri("dxr.dev.1").is_ok());
    }

    #[test]
    fn test_validate_namespace_rejects_bad_input() {
        assert!(validate_namespace_safe_for_uri("").is_err());
        assert!(validate_namespace_safe_for_uri("   ").is_err());
        assert!(validate_namespace_safe_for_uri("dxr/dev").is_err());
        assert!(validate_namespace_safe_for_uri("dxr dev").is_err());
        assert!(validate_namespace_safe_for_uri("dxré").is_err());
        assert!(validate_namespace_safe_for_uri(&"a".repeat(254)).is_err());
    }

    #[test]
    fn test_required_fields_treats_blank_as_missing() {
        let mut required = RequiredFields::default();
        let name = required.text(Field::Name, Some("  "));
        let gender = required.text(Field::Gender, Some(" female "));
        let age: Option<u32> = required.value(Field::Age, None);

        assert!(name.is_none());
        assert!(age.is_none());
        assert_eq!(gender.map(NonEmptyText::into_string).as_deref(), Some("female"));

        let err = required.into_error();
        assert_eq!(err.fields(), &[Field::Name, Field::Age]);
    }
}
