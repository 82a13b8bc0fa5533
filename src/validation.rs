use lazy_static::lazy_static;
use regex::Regex;

use crate::error::AppError;

pub const NAME_MIN: usize = 1;
pub const NAME_MAX: usize = 120;
pub const INGREDIENT_NAME_MAX: usize = 100;
pub const AISLE_MAX: usize = 100;
pub const UNIT_MAX: usize = 50;
pub const EMAIL_MAX: usize = 255;
pub const PSEUDO_MIN: usize = 2;
pub const PSEUDO_MAX: usize = 50;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 100;

/// Units accepted on dish ingredient references.
pub const DISH_UNITS: &[&str] = &["g", "kg", "paquet"];
/// Units accepted on manual list items.
pub const LIST_ITEM_UNITS: &[&str] = &["g", "kg", "paquet", "unité"];

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    email.chars().count() <= EMAIL_MAX && EMAIL_RE.is_match(email)
}

pub fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<(), AppError> {
    let len = value.chars().count();
    if len < min || len > max || (min > 0 && value.trim().is_empty()) {
        return Err(AppError::Validation(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

pub fn check_optional_max(field: &str, value: Option<&str>, max: usize) -> Result<(), AppError> {
    match value {
        Some(v) if v.chars().count() > max => Err(AppError::Validation(format!(
            "{field} must be at most {max} characters"
        ))),
        _ => Ok(()),
    }
}

pub fn check_id(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(())
}

pub fn check_quantity(quantity: Option<f64>) -> Result<(), AppError> {
    match quantity {
        Some(q) if !q.is_finite() || q < 0.0 => Err(AppError::validation(
            "quantity must be a non-negative number",
        )),
        _ => Ok(()),
    }
}

/// Blank units count as "no unit"; anything else must be in `allowed`,
/// compared case-insensitively after trimming.
pub fn check_unit(unit: Option<&str>, allowed: &[&str]) -> Result<(), AppError> {
    check_optional_max("unit", unit, UNIT_MAX)?;
    let Some(unit) = unit.map(str::trim).filter(|u| !u.is_empty()) else {
        return Ok(());
    };
    let lower = unit.to_lowercase();
    if allowed.iter().any(|a| *a == lower) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "unit must be one of: {}",
            allowed.join(", ")
        )))
    }
}
