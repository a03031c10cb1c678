//! Validated text types shared across the bedflow crates.
//!
//! Every value here is trimmed on construction and rejects empty input, so downstream code can
//! treat ward names, bed numbers and equipment tags as well-formed without re-checking.

use std::hash::{Hash, Hasher};

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
    #[error("Text exceeds maximum length of {max} characters")]
    TooLong { max: usize },
    #[error("Text contains invalid characters: '{0}'")]
    InvalidCharacters(String),
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
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

/// Name of a hospital ward, e.g. `ICU` or `General Ward`.
///
/// Equality is exact; [`WardName::matches`] is the case-insensitive comparison used when
/// resolving a caller's ward hint against the bed pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WardName(NonEmptyText);

impl WardName {
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        NonEmptyText::new(input).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Case-insensitive ward comparison.
    pub fn matches(&self, other: &WardName) -> bool {
        self.as_str().eq_ignore_ascii_case(other.as_str())
    }
}

impl TryFrom<String> for WardName {
    type Error = TextError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<WardName> for String {
    fn from(value: WardName) -> Self {
        value.0 .0
    }
}

impl std::fmt::Display for WardName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unique bed identifier as printed on the bed, e.g. `ICU-002`.
///
/// Restricted to ASCII alphanumerics, `-` and `_` so it can appear in URL paths unescaped.
/// Ordering is plain lexicographic and is the tie-break order of the bed matcher.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BedNumber(String);

impl BedNumber {
    pub const MAX_LEN: usize = 32;

    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        if trimmed.len() > Self::MAX_LEN {
            return Err(TextError::TooLong { max: Self::MAX_LEN });
        }
        let ok = trimmed
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_'));
        if !ok {
            return Err(TextError::InvalidCharacters(trimmed.to_owned()));
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BedNumber {
    type Error = TextError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BedNumber> for String {
    fn from(value: BedNumber) -> Self {
        value.0
    }
}

impl std::fmt::Display for BedNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for BedNumber {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// An equipment capability attached to a bed or required by a request, e.g. `Ventilator`.
///
/// The original spelling is kept for display, but equality and hashing ignore ASCII case so
/// `ventilator` on a request matches `Ventilator` on a bed.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EquipmentTag(NonEmptyText);

impl EquipmentTag {
    /// Legacy request value meaning "no special equipment".
    pub const STANDARD: &'static str = "standard";

    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        NonEmptyText::new(input).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_standard(&self) -> bool {
        self.as_str().eq_ignore_ascii_case(Self::STANDARD)
    }
}

impl PartialEq for EquipmentTag {
    fn eq(&self, other: &Self) -> bool {
        self.as_str().eq_ignore_ascii_case(other.as_str())
    }
}

impl Eq for EquipmentTag {}

impl Hash for EquipmentTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.as_str().bytes() {
            state.write_u8(b.to_ascii_lowercase());
        }
    }
}

impl TryFrom<String> for EquipmentTag {
    type Error = TextError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EquipmentTag> for String {
    fn from(value: EquipmentTag) -> Self {
        value.0 .0
    }
}

impl std::fmt::Display for EquipmentTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_non_empty_text_trims_and_rejects_blank() {
        assert_eq!(NonEmptyText::new("  ICU  ").unwrap().as_str(), "ICU");
        assert_eq!(NonEmptyText::new("   "), Err(TextError::Empty));
    }

    #[test]
    fn test_ward_name_matches_ignores_case() {
        let a = WardName::new("General Ward").unwrap();
        let b = WardName::new("general ward").unwrap();
        assert!(a.matches(&b));
        assert_ne!(a, b, "exact equality should stay case-sensitive");
    }

    #[test]
    fn test_bed_number_rejects_path_characters() {
        assert!(BedNumber::new("ICU-001").is_ok());
        assert!(matches!(
            BedNumber::new("ICU/001"),
            Err(TextError::InvalidCharacters(_))
        ));
        assert_eq!(
            BedNumber::new("x".repeat(33)),
            Err(TextError::TooLong { max: 32 })
        );
    }

    #[test]
    fn test_bed_number_orders_lexicographically() {
        let mut beds = vec![
            BedNumber::new("ICU-010").unwrap(),
            BedNumber::new("ICU-002").unwrap(),
            BedNumber::new("ER-001").unwrap(),
        ];
        beds.sort();
        let order: Vec<&str> = beds.iter().map(BedNumber::as_str).collect();
        assert_eq!(order, ["ER-001", "ICU-002", "ICU-010"]);
    }

    #[test]
    fn test_equipment_tag_equality_and_hash_ignore_case() {
        let mut set = HashSet::new();
        set.insert(EquipmentTag::new("Ventilator").unwrap());
        assert!(set.contains(&EquipmentTag::new("ventilator").unwrap()));
        assert!(EquipmentTag::new("Standard").unwrap().is_standard());
    }

    #[test]
    fn test_serde_rejects_empty_ward() {
        let err = serde_json::from_str::<WardName>("\"  \"");
        assert!(err.is_err(), "blank ward names should not deserialize");
        let ok: WardName = serde_json::from_str("\"ICU\"").unwrap();
        assert_eq!(serde_json::to_string(&ok).unwrap(), "\"ICU\"");
    }
}
