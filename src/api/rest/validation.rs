use chrono::NaiveTime;
use uuid::Uuid;

use crate::error::AppError;

pub fn require_non_blank(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidInput(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// `HH:MM`, 24-hour clock.
pub fn require_time_of_day(field: &str, value: &str) -> Result<(), AppError> {
    let well_formed = value.len() == 5 && NaiveTime::parse_from_str(value, "%H:%M").is_ok();
    if !well_formed {
        return Err(AppError::InvalidInput(format!(
            "{field} must be a time of day in HH:MM format"
        )));
    }
    Ok(())
}

pub fn require_phone(field: &str, value: &str) -> Result<(), AppError> {
    if value.len() != 10 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::InvalidInput(format!(
            "{field} must be a 10-digit number"
        )));
    }
    Ok(())
}

pub fn require_email(value: &str) -> Result<(), AppError> {
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(AppError::InvalidInput(format!("invalid email '{value}'")));
    }
    Ok(())
}

pub fn require_positive(field: &str, value: f64) -> Result<(), AppError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AppError::InvalidInput(format!("{field} must be > 0")));
    }
    Ok(())
}

/// A missing or blank id is malformed input; an id that cannot be a
/// record id refers to nothing.
pub fn parse_record_id(field: &str, raw: Option<&str>) -> Result<Uuid, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| AppError::InvalidInput(format!("{field} is required")))?;

    raw.parse::<Uuid>()
        .map_err(|_| AppError::NotFound(format!("{field} {raw} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_of_day_requires_two_digit_hours() {
        assert!(require_time_of_day("shift.start", "09:30").is_ok());
        assert!(require_time_of_day("shift.start", "23:59").is_ok());
        assert!(require_time_of_day("shift.start", "9:30").is_err());
        assert!(require_time_of_day("shift.start", "24:00").is_err());
        assert!(require_time_of_day("shift.start", "09:30:00").is_err());
    }

    #[test]
    fn phone_must_be_ten_digits() {
        assert!(require_phone("phone", "5551234567").is_ok());
        assert!(require_phone("phone", "555-123-4567").is_err());
        assert!(require_phone("phone", "555123456").is_err());
    }

    #[test]
    fn email_needs_local_part_and_dotted_domain() {
        assert!(require_email("pat@example.com").is_ok());
        assert!(require_email("pat@localhost").is_err());
        assert!(require_email("@example.com").is_err());
        assert!(require_email("pat example@example.com").is_err());
    }

    #[test]
    fn record_id_distinguishes_missing_from_unknown() {
        assert!(matches!(
            parse_record_id("orderId", None),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            parse_record_id("orderId", Some("  ")),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            parse_record_id("orderId", Some("not-a-uuid")),
            Err(AppError::NotFound(_))
        ));
        assert!(parse_record_id("orderId", Some("00000000-0000-0000-0000-000000000001")).is_ok());
    }

    #[test]
    fn positive_rejects_zero_and_nan() {
        assert!(require_positive("totalAmount", 50.0).is_ok());
        assert!(require_positive("totalAmount", 0.0).is_err());
        assert!(require_positive("totalAmount", f64::NAN).is_err());
    }
}
