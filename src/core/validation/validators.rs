//! Reusable field validators
//!
//! Used through `#[validate(custom(function = "..."))]` on request payloads.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use validator::ValidationError;

/// 17 characters, digits and capital letters except I, O and Q
static VIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-HJ-NPR-Z0-9]{17}$").unwrap_or_else(|e| panic!("invalid VIN pattern: {e}"))
});

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

/// Validator: a vehicle identification number
pub fn vin(value: &str) -> Result<(), ValidationError> {
    if VIN_RE.is_match(value) {
        Ok(())
    } else {
        Err(error(
            "vin",
            "must be 17 characters: digits and capital letters except I, O, Q",
        ))
    }
}

/// Validator: text must contain something besides whitespace
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(error("blank", "must not be blank"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vin() {
        assert!(vin("1HGCM82633A004352").is_ok());
        assert!(vin("1HGCM82633A00435").is_err());
        assert!(vin("1HGCM82633A00435I").is_err());
        assert!(vin("1hgcm82633a004352").is_err());
    }

    #[test]
    fn test_not_blank() {
        assert!(not_blank("x").is_ok());
        assert!(not_blank("   ").is_err());
        assert!(not_blank("").is_err());
    }
}
