use crate::error::BookingError;

/// Normalize a user-entered phone number to E.164 (`+447123456789`).
///
/// Accepts `+CC...`, `00CC...`, national numbers with a trunk `0` (prefixed
/// with `default_country_code`) and bare international digits. Spaces, dashes,
/// dots and parentheses are ignored.
pub fn normalize_e164(raw: &str, default_country_code: &str) -> Result<String, BookingError> {
    let invalid = || BookingError::InvalidPhone(raw.trim().to_string());

    let compact: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();

    let digits = if let Some(rest) = compact.strip_prefix('+') {
        rest.to_string()
    } else if let Some(rest) = compact.strip_prefix("00") {
        rest.to_string()
    } else if let Some(rest) = compact.strip_prefix('0') {
        format!("{}{}", default_country_code.trim_start_matches('+'), rest)
    } else {
        compact
    };

    if !digits.chars().all(|c| c.is_ascii_digit()) || digits.starts_with('0') {
        return Err(invalid());
    }
    if !(8..=15).contains(&digits.len()) {
        return Err(invalid());
    }
    Ok(format!("+{digits}"))
}

/// Hide all but the last three digits, for logs.
pub fn mask_phone(phone: &str) -> String {
    let keep = phone.len().saturating_sub(3);
    phone
        .char_indices()
        .map(|(i, c)| if i < keep && c.is_ascii_digit() { '*' } else { c })
        .collect()
}
