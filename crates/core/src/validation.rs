//! Field validation for insert and update shapes.
//!
//! Validation runs at the input boundary, before any storage call. Storage
//! adapters assume they are handed valid shapes and never re-check.

use rust_decimal::Decimal;

use crate::types::EmailError;

/// A single rule broken by an input field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The email address is malformed.
    #[error("email: {0}")]
    Email(#[from] EmailError),

    /// A string field is shorter than allowed.
    #[error("{field} must be at least {min} characters")]
    TooShort {
        /// Offending field (wire name).
        field: &'static str,
        /// Minimum length in characters.
        min: usize,
    },

    /// A string field is longer than allowed.
    #[error("{field} must be at most {max} characters")]
    TooLong {
        /// Offending field (wire name).
        field: &'static str,
        /// Maximum length in characters.
        max: usize,
    },

    /// A number or amount must be strictly positive.
    #[error("{field} must be greater than 0")]
    NotPositive {
        /// Offending field (wire name).
        field: &'static str,
    },

    /// A number or amount must not be negative.
    #[error("{field} must not be negative")]
    Negative {
        /// Offending field (wire name).
        field: &'static str,
    },

    /// A money amount has more decimal places than are stored.
    #[error("{field} must have at most {max_scale} decimal places")]
    TooPrecise {
        /// Offending field (wire name).
        field: &'static str,
        /// Maximum number of decimal places.
        max_scale: u32,
    },

    /// A money amount is too large to store.
    #[error("{field} must be less than {limit}")]
    TooLarge {
        /// Offending field (wire name).
        field: &'static str,
        /// Exclusive upper bound.
        limit: Decimal,
    },
}

impl ValidationError {
    /// The wire name of the field that failed, if the rule is field-scoped.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::Email(_) => "email",
            Self::TooShort { field, .. }
            | Self::TooLong { field, .. }
            | Self::NotPositive { field }
            | Self::Negative { field }
            | Self::TooPrecise { field, .. }
            | Self::TooLarge { field, .. } => field,
        }
    }
}

/// Character length must fall within `min..=max`.
pub(crate) fn length(
    field: &'static str,
    value: &str,
    min: usize,
    max: Option<usize>,
) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < min {
        return Err(ValidationError::TooShort { field, min });
    }
    match max {
        Some(max) if len > max => Err(ValidationError::TooLong { field, max }),
        _ => Ok(()),
    }
}

/// Decimal places kept for money (`NUMERIC(10, 2)`).
pub const MONEY_SCALE: u32 = 2;

/// Exclusive upper bound for money amounts: 10^8.
pub const MONEY_LIMIT: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

/// Scale and magnitude must fit the stored money column.
pub(crate) fn money(field: &'static str, value: Decimal) -> Result<(), ValidationError> {
    if value.scale() > MONEY_SCALE {
        return Err(ValidationError::TooPrecise {
            field,
            max_scale: MONEY_SCALE,
        });
    }
    if value.abs() >= MONEY_LIMIT {
        return Err(ValidationError::TooLarge {
            field,
            limit: MONEY_LIMIT,
        });
    }
    Ok(())
}

pub(crate) fn positive_amount(field: &'static str, value: Decimal) -> Result<(), ValidationError> {
    if value <= Decimal::ZERO {
        return Err(ValidationError::NotPositive { field });
    }
    money(field, value)
}

pub(crate) fn non_negative_amount(
    field: &'static str,
    value: Decimal,
) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::Negative { field });
    }
    money(field, value)
}

pub(crate) const fn positive_count(field: &'static str, value: i32) -> Result<(), ValidationError> {
    if value >= 1 {
        Ok(())
    } else {
        Err(ValidationError::NotPositive { field })
    }
}

pub(crate) const fn non_negative_count(
    field: &'static str,
    value: i32,
) -> Result<(), ValidationError> {
    if value >= 0 {
        Ok(())
    } else {
        Err(ValidationError::Negative { field })
    }
}
