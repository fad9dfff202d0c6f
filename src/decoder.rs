// Field extraction from a validated identity number

use std::fmt;

use crate::area::{resolve_area, AreaIndex};

/// Gender derived from the parity of the sequence digit at position 16.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "男",
            Gender::Female => "女",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The decoded fields of an identity number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityInfo {
    /// YYYY-MM-DD, taken verbatim from positions 6..14. The calendar is
    /// deliberately not validated: the source data is permissive and a
    /// syntactically well-formed but impossible date passes through.
    pub birth_date: String,

    pub gender: Gender,

    /// Residence location resolved from the leading 6-digit area code.
    pub location: String,
}

/// Decodes a checksum-valid identity number.
///
/// Precondition: `id_number` has passed [`crate::checksum::validate`],
/// which guarantees 18 ASCII characters with a numeric 17-digit body.
/// Deterministic and pure; there is no failure path.
pub fn decode(id_number: &str, index: &AreaIndex) -> IdentityInfo {
    let birth_date = format!(
        "{}-{}-{}",
        &id_number[6..10],
        &id_number[10..12],
        &id_number[12..14]
    );
    let sequence_digit = id_number.as_bytes()[16] - b'0';
    let gender = if sequence_digit % 2 == 1 {
        Gender::Male
    } else {
        Gender::Female
    };
    let location = resolve_area(index, &id_number[..6]);

    IdentityInfo {
        birth_date,
        gender,
        location,
    }
}

// ============================================================================
// TESTS
// ============================================================================
