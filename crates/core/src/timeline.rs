//! Timeline aggregation.
//!
//! [`aggregate`] is a pure ordering step; [`Timeline`] is the non-empty, ordered view of one
//! logical case returned by the resolver.

use crate::model::{DiagnosisEntry, PatientId};
use dxr_types::CaseId;
use serde::Serialize;
use std::collections::BTreeSet;

/// Order entries by `created_at`, ascending.
///
/// The sort is stable, so entries with equal timestamps keep their input order. Applying it
/// twice gives the same result as applying it once.
pub fn aggregate(entries: impl IntoIterator<Item = DiagnosisEntry>) -> Vec<DiagnosisEntry> {
    let mut entries: Vec<DiagnosisEntry> = entries.into_iter().collect();
    entries.sort_by_key(DiagnosisEntry::created_at);
    entries
}

/// Distinct case identifiers across `entries`, alphabetical.
pub fn case_ids<'a>(entries: impl IntoIterator<Item = &'a DiagnosisEntry>) -> BTreeSet<CaseId> {
    entries.into_iter().map(|e| e.case_id().clone()).collect()
}

/// The chronologically ordered entries of one `(patient, case)` pair. Never empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Timeline {
    patient_id: PatientId,
    case_id: CaseId,
    entries: Vec<DiagnosisEntry>,
}

impl Timeline {
    /// Build a timeline from entries of the given case. Returns `None` if there are none.
    ///
    /// Entries belonging to a different patient or case are dropped.
    pub fn new(
        patient_id: PatientId,
        case_id: CaseId,
        entries: impl IntoIterator<Item = DiagnosisEntry>,
    ) -> Option<Self> {
        let entries = aggregate(
            entries
                .into_iter()
                .filter(|e| e.belongs_to(&patient_id, &case_id)),
        );
        if entries.is_empty() {
            return None;
        }
        Some(Self {
            patient_id,
            case_id,
            entries,
        })
    }

    pub fn patient_id(&self) -> &PatientId {
        &self.patient_id
    }

    pub fn case_id(&self) -> &CaseId {
        &self.case_id
    }

    pub fn entries(&self) -> &[DiagnosisEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// A constructed timeline is never empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The case opening entry.
    pub fn first(&self) -> &DiagnosisEntry {
        &self.entries[0]
    }

    /// The most recent entry.
    pub fn latest(&self) -> &DiagnosisEntry {
        &self.entries[self.entries.len() - 1]
    }
}
