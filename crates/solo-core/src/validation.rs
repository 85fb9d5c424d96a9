//! # Validation Module
//!
//! Input validation utilities for the back-office.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Dashboard forms                                              │
//! │  └── Immediate feedback (empty fields, obvious typos)                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (entity constructors, drafts, CSV rows)          │
//! │  └── Business rules: positive quantities, 0–26 absence days, ...       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Transaction coordinator (solo-db)                            │
//! │  └── Reference checks inside the atomic batch                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing that fails here ever reaches the store.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::WORKING_DAYS_PER_MONTH;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Rejects empty or whitespace-only text.
///
/// ## Example
/// ```rust
/// use solo_core::validation::require_text;
///
/// assert!(require_text("name", "Margherita").is_ok());
/// assert!(require_text("name", "   ").is_err());
/// ```
pub fn require_text(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

pub fn require_positive(field: &str, value: Decimal) -> ValidationResult<()> {
    if value <= Decimal::ZERO {
        return Err(ValidationError::positive(field));
    }
    Ok(())
}

pub fn require_non_negative(field: &str, value: Decimal) -> ValidationResult<()> {
    if value < Decimal::ZERO {
        return Err(ValidationError::non_negative(field));
    }
    Ok(())
}

/// Validates a monthly absence count.
///
/// ## Rules
/// - Between 0 and 26 inclusive (26 working days per month)
pub fn validate_absence_days(days: Decimal) -> ValidationResult<()> {
    if days < Decimal::ZERO || days > Decimal::from(WORKING_DAYS_PER_MONTH) {
        return Err(ValidationError::OutOfRange {
            field: "absence days".to_string(),
            min: "0".to_string(),
            max: WORKING_DAYS_PER_MONTH.to_string(),
        });
    }
    Ok(())
}

/// Parses a decimal typed by a user or read from a file.
///
/// Accepts a comma as decimal separator.
pub fn parse_decimal(field: &str, raw: &str) -> ValidationResult<Decimal> {
    let cleaned = raw.trim().replace(',', ".");
    if cleaned.is_empty() {
        return Err(ValidationError::required(field));
    }
    Decimal::from_str(&cleaned)
        .map_err(|_| ValidationError::format(field, format!("'{}' is not a number", raw.trim())))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_positive() {
        assert!(require_positive("quantity", Decimal::ONE).is_ok());
        assert!(require_positive("quantity", Decimal::ZERO).is_err());
        assert!(require_positive("quantity", Decimal::NEGATIVE_ONE).is_err());
    }

    #[test]
    fn test_require_non_negative() {
        assert!(require_non_negative("total", Decimal::ZERO).is_ok());
        assert!(require_non_negative("total", Decimal::NEGATIVE_ONE).is_err());
    }

    #[test]
    fn test_absence_days_bounds() {
        assert!(validate_absence_days(Decimal::ZERO).is_ok());
        assert!(validate_absence_days(Decimal::from(26)).is_ok());
        assert!(validate_absence_days(Decimal::from(27)).is_err());
        assert!(validate_absence_days(Decimal::NEGATIVE_ONE).is_err());
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("qty", "0,5").unwrap(), Decimal::new(5, 1));
        assert_eq!(parse_decimal("qty", " 12 ").unwrap(), Decimal::from(12));
        assert!(matches!(
            parse_decimal("qty", ""),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            parse_decimal("qty", "two"),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }
}
