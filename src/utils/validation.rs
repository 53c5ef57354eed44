use anyhow::{anyhow, Result};

/// Length of an SMS challenge verification code.
pub const CHALLENGE_CODE_LEN: usize = 6;

/// Validates and normalizes an SMS challenge code.
///
/// Internal whitespace is stripped ("123 456" is accepted), the result must
/// be exactly six ASCII digits. Rejection happens locally, before any
/// network call.
pub fn validate_challenge_code(code: &str) -> Result<String> {
    let normalized: String = code.chars().filter(|c| !c.is_whitespace()).collect();

    if normalized.is_empty() {
        return Err(anyhow!("Verification code cannot be empty"));
    }

    if !normalized.chars().all(|c| c.is_ascii_digit()) {
        return Err(anyhow!("Verification code must contain digits only"));
    }

    if normalized.len() != CHALLENGE_CODE_LEN {
        return Err(anyhow!(
            "Verification code must be exactly {} digits long",
            CHALLENGE_CODE_LEN
        ));
    }

    Ok(normalized)
}

/// Validates and normalizes a phone number for challenge submission.
///
/// The number must be non-blank; the normalized form always carries a
/// leading `+`.
pub fn normalize_phone_number(phone: &str) -> Result<String> {
    let digits: String = phone
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();

    if digits.is_empty() {
        return Err(anyhow!("Phone number cannot be empty"));
    }

    Ok(format!("+{digits}"))
}
