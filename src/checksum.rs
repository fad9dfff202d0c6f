// Check-digit validation for 18-character identity numbers

use crate::error::{RegistryError, Result, ValidationKind};

/// Weights applied to positions 0..=16 of the number.
const WEIGHTS: [u32; 17] = [7, 9, 10, 5, 8, 4, 2, 1, 6, 3, 7, 9, 10, 5, 8, 4, 2];

/// Check characters indexed by the weighted sum mod 11.
const CHECK_CHARS: &[u8; 11] = b"10X98765432";

/// Returns true iff `id_number` is 18 characters, has a fully numeric
/// 17-character body, and its check character matches the weighted mod-11
/// checksum. Never panics, whatever the input.
pub fn validate(id_number: &str) -> bool {
    check(id_number).is_ok()
}

/// Like [`validate`], but reports which rule was broken.
///
/// Rules are tested in order: length, digit body, check character. The
/// check character is compared case-insensitively, so a trailing `x` is
/// accepted for `X`.
pub fn check(id_number: &str) -> Result<()> {
    let chars: Vec<char> = id_number.chars().collect();
    if chars.len() != 18 {
        return Err(RegistryError::Validation(ValidationKind::WrongLength {
            found: chars.len(),
        }));
    }

    let mut total: u32 = 0;
    for (ch, weight) in chars[..17].iter().zip(WEIGHTS) {
        if !ch.is_ascii_digit() {
            return Err(RegistryError::Validation(ValidationKind::NonDigitBody));
        }
        total += (*ch as u32 - '0' as u32) * weight;
    }

    let expected = CHECK_CHARS[(total % 11) as usize] as char;
    if chars[17].to_ascii_uppercase() == expected {
        Ok(())
    } else {
        Err(RegistryError::Validation(ValidationKind::BadCheckChar))
    }
}

// ============================================================================
// TESTS
// ============================================================================
