//! Validated text primitives shared across the DXR crates.
//!
//! Clinical submissions arrive as loosely typed strings. These wrappers turn "present and
//! non-blank" into a type-level guarantee so that downstream code never has to re-check it.

use std::fmt;
use std::str::FromStr;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Empty` if the input is empty or contains only whitespace.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Maps an optional input to an optional `NonEmptyText`.
    ///
    /// Absent and blank inputs both become `None`; form clients send empty strings for
    /// untouched optional fields.
    pub fn optional<S: AsRef<str>>(input: Option<S>) -> Option<Self> {
        input.and_then(|s| Self::new(s).ok())
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the owned string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for NonEmptyText {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Client-supplied case identifier grouping diagnosis entries into one timeline.
///
/// A `CaseId` is a grouping key, not a primary key: any number of entries may carry the same
/// value, and the same value used under two different patients names two unrelated cases.
/// Ordering is plain lexical ordering of the trimmed text, which keeps case summaries
/// deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct CaseId(NonEmptyText);

impl CaseId {
    /// Creates a case identifier from free-form input.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Empty` if the input is blank.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        NonEmptyText::new(input).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl AsRef<str> for CaseId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for CaseId {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl From<NonEmptyText> for CaseId {
    fn from(text: NonEmptyText) -> Self {
        Self(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_whitespace() {
        let text = NonEmptyText::new("  fever  ").unwrap();
        assert_eq!(text.as_str(), "fever");
    }

    #[test]
    fn test_new_rejects_blank() {
        assert_eq!(NonEmptyText::new(""), Err(TextError::Empty));
        assert_eq!(NonEmptyText::new(" \t\n"), Err(TextError::Empty));
    }

    #[test]
    fn test_optional_maps_blank_to_none() {
        assert_eq!(NonEmptyText::optional(None::<String>), None);
        assert_eq!(NonEmptyText::optional(Some("   ")), None);
        assert_eq!(
            NonEmptyText::optional(Some(" paracetamol ")).map(NonEmptyText::into_string),
            Some("paracetamol".to_string())
        );
    }

    #[test]
    fn test_deserialize_rejects_blank() {
        let result: Result<NonEmptyText, _> = serde_json::from_str("\"  \"");
        assert!(result.is_err());
    }

    #[test]
    fn test_case_id_is_transparent_in_json() {
        let case_id = CaseId::new("DX-1").unwrap();
        let json = serde_json::to_string(&case_id).unwrap();
        assert_eq!(json, "\"DX-1\"");

        let parsed: CaseId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, case_id);
    }

    #[test]
    fn test_case_ids_order_alphabetically() {
        let mut ids = vec![
            CaseId::new("DX-2").unwrap(),
            CaseId::new("ANX-1").unwrap(),
            CaseId::new("DX-10").unwrap(),
        ];
        ids.sort();

        let ordered: Vec<&str> = ids.iter().map(CaseId::as_str).collect();
        assert_eq!(ordered, vec!["ANX-1", "DX-10", "DX-2"]);
    }
}
