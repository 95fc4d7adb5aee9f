//! Field rules for user accounts

use crate::error::DomainError;
use crate::value_objects::Gender;

pub const MAX_NAME_LENGTH: usize = 50;
pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_PASSWORD_LENGTH: usize = 40;

/// `local@domain.tld`, where local is word characters plus `+ - .`, domain is
/// alphanumerics and dots, and the final label is letters only. Case-insensitive.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-' | '.'));
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    let host_ok = !host.is_empty() && host.chars().all(|c| c.is_ascii_alphanumeric() || c == '.');
    let tld_ok = !tld.is_empty() && tld.chars().all(|c| c.is_ascii_alphabetic());
    local_ok && host_ok && tld_ok
}

pub fn check_email(email: &str) -> Result<(), DomainError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(DomainError::InvalidEmail)
    }
}

pub fn check_name(field: &'static str, value: &str) -> Result<(), DomainError> {
    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(DomainError::NameTooLong {
            field,
            max: MAX_NAME_LENGTH,
        });
    }
    Ok(())
}

pub fn check_password(password: &str) -> Result<(), DomainError> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&len) {
        return Err(DomainError::PasswordLength {
            min: MIN_PASSWORD_LENGTH,
            max: MAX_PASSWORD_LENGTH,
        });
    }
    Ok(())
}

pub fn check_gender(value: &str) -> Result<Gender, DomainError> {
    Gender::parse(value).ok_or_else(|| DomainError::InvalidGender(value.to_string()))
}
