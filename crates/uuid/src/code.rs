//! Short patient codes.

use crate::{UuidError, UuidResult};
use chrono::{DateTime, Utc};
use rand::Rng;
use std::fmt;

const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// A five character patient code drawn from `0-9A-Z`, e.g. `9X2A1`.
///
/// Random codes are not unique on their own; callers retry [`PatientCode::random`] against the
/// patient store and fall back to [`PatientCode::from_timestamp`] when every attempt collides.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct PatientCode(String);

impl PatientCode {
    pub const LEN: usize = 5;

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code = (0..Self::LEN)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// Last five digits of the millisecond timestamp.
    pub fn from_timestamp(at: DateTime<Utc>) -> Self {
        let millis = at.timestamp_millis().unsigned_abs();
        Self(format!("{:05}", millis % 100_000))
    }

    pub fn parse(input: &str) -> UuidResult<Self> {
        let ok = input.len() == Self::LEN
            && input
                .bytes()
                .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase());
        if !ok {
            return Err(UuidError::InvalidInput(format!(
                "patient code must be {} characters of 0-9A-Z, got: '{}'",
                Self::LEN,
                input
            )));
        }
        Ok(Self(input.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatientCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PatientCode {
    type Error = UuidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PatientCode> for String {
    fn from(value: PatientCode) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_random_code_is_well_formed() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let code = PatientCode::random(&mut rng);
            assert!(
                PatientCode::parse(code.as_str()).is_ok(),
                "generated code {} should parse",
                code
            );
        }
    }

    #[test]
    fn test_from_timestamp_keeps_last_five_digits() {
        let at = Utc.timestamp_millis_opt(1_700_000_012_345).unwrap();
        assert_eq!(PatientCode::from_timestamp(at).as_str(), "12345");

        let early = Utc.timestamp_millis_opt(42).unwrap();
        assert_eq!(PatientCode::from_timestamp(early).as_str(), "00042");
    }

    #[test]
    fn test_parse_rejects_lowercase_and_wrong_length() {
        assert!(PatientCode::parse("abcde").is_err());
        assert!(PatientCode::parse("ABCD").is_err());
        assert!(PatientCode::parse("ABCDE").is_ok());
    }
}
