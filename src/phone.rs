//! Thai mobile phone number validation and normalization.
//!
//! Canonical form is ten digits starting with `0`. Parsing accepts the
//! common raw variants found in listing data: `+66` and `66` country-code
//! prefixes, a 9-digit form with the leading zero dropped, and embedded
//! spaces/dashes. Anything else is rejected, never coerced.

use crate::error::{MongkolError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated, canonical 10-digit Thai mobile number.
///
/// Immutable once constructed; all feature functions take this type, so
/// they can assume exactly ten digits.
///
/// # Examples
///
/// ```
/// use mongkol::phone::PhoneNumber;
///
/// let p = PhoneNumber::parse("+66 81-234-5678").unwrap();
/// assert_eq!(p.as_str(), "0812345678");
/// assert_eq!(PhoneNumber::parse("812345678").unwrap().as_str(), "0812345678");
/// assert!(PhoneNumber::parse("12ab").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Parses and normalizes a raw phone number string.
    ///
    /// # Errors
    ///
    /// Returns [`MongkolError::InvalidPhoneNumber`] when the input cannot
    /// be rewritten into the canonical `0XXXXXXXXX` form.
    pub fn parse(raw: &str) -> Result<Self> {
        let cleaned: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '(' && *c != ')' && *c != '.')
            .collect();

        let mut digits: &str = &cleaned;
        if let Some(rest) = digits.strip_prefix('+') {
            digits = rest;
        }

        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(MongkolError::InvalidPhoneNumber {
                input: raw.to_string(),
                reason: "non-digit characters".to_string(),
            });
        }

        let canonical = match digits.len() {
            // 66812345678 -> 0812345678
            11 if digits.starts_with("66") => format!("0{}", &digits[2..]),
            10 if digits.starts_with('0') => digits.to_string(),
            10 => {
                return Err(MongkolError::InvalidPhoneNumber {
                    input: raw.to_string(),
                    reason: "10-digit number must start with 0".to_string(),
                })
            }
            // leading zero dropped by a spreadsheet
            9 => format!("0{digits}"),
            n => {
                return Err(MongkolError::InvalidPhoneNumber {
                    input: raw.to_string(),
                    reason: format!("expected 9-11 digits, got {n}"),
                })
            }
        };

        Ok(Self(canonical))
    }

    /// The canonical 10-character string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The ten digit values, 0-9 each.
    #[must_use]
    pub fn digits(&self) -> [u8; 10] {
        let mut out = [0u8; 10];
        for (i, c) in self.0.bytes().enumerate() {
            out[i] = c - b'0';
        }
        out
    }

    /// The last `n` digits as a string slice. `n` must be at most 10.
    #[must_use]
    pub fn suffix(&self, n: usize) -> &str {
        &self.0[10 - n..]
    }

    /// Digits at positions 3..6, the "abc" block of a Thai number.
    #[must_use]
    pub fn middle_block(&self) -> &str {
        &self.0[3..6]
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = MongkolError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_canonical_passes_through() {
        let p = PhoneNumber::parse("0812345678").expect("valid");
        assert_eq!(p.as_str(), "0812345678");
    }

    #[test]
    fn test_country_code_plus() {
        assert_eq!(
            PhoneNumber::parse("+66812345678").expect("valid").as_str(),
            "0812345678"
        );
    }

    #[test]
    fn test_country_code_bare() {
        assert_eq!(
            PhoneNumber::parse("66812345678").expect("valid").as_str(),
            "0812345678"
        );
    }

    #[test]
    fn test_nine_digit_variant() {
        assert_eq!(
            PhoneNumber::parse("812345678").expect("valid").as_str(),
            "0812345678"
        );
    }

    #[test]
    fn test_separators_stripped() {
        assert_eq!(
            PhoneNumber::parse("081-234-5678").expect("valid").as_str(),
            "0812345678"
        );
        assert_eq!(
            PhoneNumber::parse("081 234 5678").expect("valid").as_str(),
            "0812345678"
        );
    }

    #[test]
    fn test_rejects_letters() {
        assert!(PhoneNumber::parse("08123abc78").is_err());
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert!(PhoneNumber::parse("12345").is_err());
        assert!(PhoneNumber::parse("081234567890").is_err());
    }

    #[test]
    fn test_rejects_ten_digits_without_leading_zero() {
        assert!(PhoneNumber::parse("8123456789").is_err());
    }

    #[test]
    fn test_digits_and_slices() {
        let p = PhoneNumber::parse("0899999999").expect("valid");
        assert_eq!(p.digits()[0], 0);
        assert_eq!(p.digits()[9], 9);
        assert_eq!(p.suffix(4), "9999");
        assert_eq!(p.middle_block(), "999");
    }

    proptest! {
        // Normalizing an already-canonical number is the identity.
        #[test]
        fn prop_normalization_idempotent(tail in "[0-9]{9}") {
            let canonical = format!("0{tail}");
            let p = PhoneNumber::parse(&canonical).expect("canonical is valid");
            prop_assert_eq!(p.as_str(), canonical.as_str());
            let again = PhoneNumber::parse(p.as_str()).expect("still valid");
            prop_assert_eq!(again.as_str(), canonical.as_str());
        }

        // All accepted country-code variants agree with the canonical form.
        #[test]
        fn prop_variants_agree(tail in "[1-9][0-9]{8}") {
            let canonical = format!("0{tail}");
            let plus = format!("+66{tail}");
            let bare = format!("66{tail}");
            let from_plus = PhoneNumber::parse(&plus).expect("plus");
            let from_bare = PhoneNumber::parse(&bare).expect("bare");
            let from_nine = PhoneNumber::parse(&tail).expect("nine");
            prop_assert_eq!(from_plus.as_str(), canonical.as_str());
            prop_assert_eq!(from_bare.as_str(), canonical.as_str());
            prop_assert_eq!(from_nine.as_str(), canonical.as_str());
        }
    }
}
