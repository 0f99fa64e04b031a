use bigdecimal::BigDecimal;
use std::fmt;
use std::str::FromStr;

pub const AMOUNT_INPUT_MAX_LEN: usize = 64;
/// Amount columns are NUMERIC(15, 2).
pub const AMOUNT_MAX_SCALE: i64 = 2;
pub const AMOUNT_MAX_INTEGER_DIGITS: u64 = 13;
pub const DESCRIPTION_MAX_LEN: usize = 255;
pub const TRANSACTION_ID_MAX_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn sanitize_string(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.len() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

pub fn validate_positive_amount(field: &'static str, amount: &BigDecimal) -> ValidationResult {
    if amount <= &BigDecimal::from(0) {
        return Err(ValidationError::new(field, "must be greater than zero"));
    }

    let (_, scale) = amount.as_bigint_and_exponent();
    if scale > AMOUNT_MAX_SCALE {
        return Err(ValidationError::new(
            field,
            format!("must have at most {} decimal places", AMOUNT_MAX_SCALE),
        ));
    }

    let integer_digits = amount.with_scale(0).abs().digits();
    if integer_digits > AMOUNT_MAX_INTEGER_DIGITS {
        return Err(ValidationError::new(field, "is too large"));
    }

    Ok(())
}

/// Parses a wire-format decimal string such as a gateway `gross_amount`.
pub fn parse_decimal(field: &'static str, raw: &str) -> Result<BigDecimal, ValidationError> {
    let value = raw.trim();
    validate_required(field, value)?;
    validate_max_len(field, value, AMOUNT_INPUT_MAX_LEN)?;

    BigDecimal::from_str(value)
        .map_err(|_| ValidationError::new(field, format!("'{}' is not a valid decimal", value)))
}

pub fn validate_transaction_id(id: &str) -> ValidationResult {
    validate_required("order_id", id)?;
    validate_max_len("order_id", id, TRANSACTION_ID_MAX_LEN)?;

    if id.chars().any(|ch| ch.is_control() || ch.is_whitespace()) {
        return Err(ValidationError::new(
            "order_id",
            "must not contain whitespace or control characters",
        ));
    }

    Ok(())
}
