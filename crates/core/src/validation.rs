//! Field validators for customer-facing forms.
//!
//! Each validator checks one field and returns the first rule it breaks.
//! The `Display` text of [`ValidationError`] is returned to API clients
//! verbatim, so wording changes here are visible to the frontend.

use crate::types::{CommunicationPreference, ServiceTier};

/// A single field failed validation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was missing or blank. Carries the field label.
    #[error("{0} is required")]
    Required(&'static str),

    #[error("Username must be between 3 and 50 characters")]
    UsernameLength,
    #[error("Username can only contain letters, numbers, and underscores")]
    UsernameCharacters,

    #[error("Password must be between 8 and 50 characters")]
    PasswordLength,
    #[error("Password cannot contain spaces")]
    PasswordWhitespace,
    #[error("Password must contain at least one special character")]
    PasswordSpecialCharacter,

    #[error("Phone number must be between 10 and 15 digits")]
    PhoneLength,
    #[error("Phone number contains invalid characters")]
    PhoneCharacters,

    #[error("Full name can only contain letters and spaces")]
    FullNameCharacters,
    #[error("Full name is too long")]
    FullNameTooLong,

    #[error("Address is too short")]
    AddressTooShort,
    #[error("Address is too long")]
    AddressTooLong,

    #[error("City can only contain letters and spaces")]
    CityCharacters,
    #[error("City name is too long")]
    CityTooLong,

    #[error("Pincode must be 5 or 6 digits")]
    PincodeFormat,

    #[error("OTP must be exactly 6 digits")]
    OtpFormat,

    #[error("Service type must be one of: {0}")]
    ServiceTier(String),
    #[error("Communication preference must be one of: {0}")]
    CommunicationPreference(String),
}

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 50;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 50;
pub const PHONE_MIN_DIGITS: usize = 10;
pub const PHONE_MAX_DIGITS: usize = 15;
pub const FULL_NAME_MAX: usize = 255;
pub const ADDRESS_MIN: usize = 5;
pub const ADDRESS_MAX: usize = 500;
pub const CITY_MAX: usize = 100;
pub const OTP_LENGTH: usize = 6;

const PASSWORD_SPECIALS: &str = "!@#$%^&*(),.?\":{}|<>_-+=[]\\/~`';";

fn required<'a>(value: &'a str, label: &'static str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::Required(label))
    } else {
        Ok(trimmed)
    }
}

/// ASCII letters and whitespace only; accented letters are rejected.
fn letters_and_spaces(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_ascii_alphabetic() || c.is_whitespace())
}

/// Separators a phone number may be written with.
fn is_phone_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '+' | '(' | ')' | '.' | '-')
}

/// # Errors
///
/// Returns the first broken username rule.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let username = required(username, "Username")?;
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(ValidationError::UsernameLength);
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ValidationError::UsernameCharacters);
    }
    Ok(())
}

/// Passwords are taken as typed; surrounding whitespace is not trimmed.
///
/// # Errors
///
/// Returns the first broken password rule.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::Required("Password"));
    }
    let len = password.chars().count();
    if !(PASSWORD_MIN..=PASSWORD_MAX).contains(&len) {
        return Err(ValidationError::PasswordLength);
    }
    if password.chars().any(char::is_whitespace) {
        return Err(ValidationError::PasswordWhitespace);
    }
    if !password.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        return Err(ValidationError::PasswordSpecialCharacter);
    }
    Ok(())
}

/// Length is counted with separators removed, so `+91 98765-43210` is 12
/// long. Characters other than digits and separators are rejected after the
/// length check.
///
/// # Errors
///
/// Returns the first broken phone rule.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let phone = required(phone, "Phone number")?;
    let len = phone.chars().filter(|&c| !is_phone_separator(c)).count();
    if !(PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&len) {
        return Err(ValidationError::PhoneLength);
    }
    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || is_phone_separator(c))
    {
        return Err(ValidationError::PhoneCharacters);
    }
    Ok(())
}

/// Full name is optional; blank input passes.
///
/// # Errors
///
/// Returns the first broken full name rule.
pub fn validate_full_name(full_name: &str) -> Result<(), ValidationError> {
    let full_name = full_name.trim();
    if full_name.is_empty() {
        return Ok(());
    }
    if !letters_and_spaces(full_name) {
        return Err(ValidationError::FullNameCharacters);
    }
    if full_name.chars().count() > FULL_NAME_MAX {
        return Err(ValidationError::FullNameTooLong);
    }
    Ok(())
}

/// # Errors
///
/// Returns the first broken address rule.
pub fn validate_address(address: &str) -> Result<(), ValidationError> {
    let address = required(address, "Address")?;
    let len = address.chars().count();
    if len < ADDRESS_MIN {
        return Err(ValidationError::AddressTooShort);
    }
    if len > ADDRESS_MAX {
        return Err(ValidationError::AddressTooLong);
    }
    Ok(())
}

/// # Errors
///
/// Returns the first broken city rule.
pub fn validate_city(city: &str) -> Result<(), ValidationError> {
    let city = required(city, "City")?;
    if !letters_and_spaces(city) {
        return Err(ValidationError::CityCharacters);
    }
    if city.chars().count() > CITY_MAX {
        return Err(ValidationError::CityTooLong);
    }
    Ok(())
}

/// # Errors
///
/// Returns the first broken pincode rule.
pub fn validate_pincode(pincode: &str) -> Result<(), ValidationError> {
    let pincode = required(pincode, "Pincode")?;
    let len = pincode.len();
    if !(len == 5 || len == 6) || !pincode.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::PincodeFormat);
    }
    Ok(())
}

/// # Errors
///
/// Returns the first broken OTP rule.
pub fn validate_otp(otp: &str) -> Result<(), ValidationError> {
    let otp = required(otp, "OTP")?;
    if otp.len() != OTP_LENGTH || !otp.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::OtpFormat);
    }
    Ok(())
}

/// Parse a customer's preferred turnaround.
///
/// # Errors
///
/// Returns [`ValidationError::ServiceTier`] listing the accepted values.
pub fn parse_service_tier(value: &str) -> Result<ServiceTier, ValidationError> {
    value
        .parse()
        .map_err(|_| ValidationError::ServiceTier(ServiceTier::choices()))
}

/// Parse a customer's preferred contact channel.
///
/// # Errors
///
/// Returns [`ValidationError::CommunicationPreference`] listing the accepted
/// values.
pub fn parse_communication_preference(
    value: &str,
) -> Result<CommunicationPreference, ValidationError> {
    value
        .parse()
        .map_err(|_| ValidationError::CommunicationPreference(CommunicationPreference::choices()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert!(validate_username("ravi_k99").is_ok());
        assert_eq!(
            validate_username("  "),
            Err(ValidationError::Required("Username"))
        );
        assert_eq!(
            validate_username("ab"),
            Err(ValidationError::UsernameLength)
        );
        assert_eq!(
            validate_username(&"a".repeat(51)),
            Err(ValidationError::UsernameLength)
        );
        assert_eq!(
            validate_username("ravi.k"),
            Err(ValidationError::UsernameCharacters)
        );
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("s3cret!pass").is_ok());
        assert_eq!(
            validate_password(""),
            Err(ValidationError::Required("Password"))
        );
        assert_eq!(
            validate_password("a!b"),
            Err(ValidationError::PasswordLength)
        );
        assert_eq!(
            validate_password("has space!"),
            Err(ValidationError::PasswordWhitespace)
        );
        assert_eq!(
            validate_password("nospecial1"),
            Err(ValidationError::PasswordSpecialCharacter)
        );
    }

    #[test]
    fn test_phone_rules() {
        assert!(validate_phone("9876543210").is_ok());
        assert!(validate_phone("+91 98765-43210").is_ok());
        assert!(validate_phone("(022) 2345 6789").is_ok());
        assert!(validate_phone("+91 (98) 765.43210").is_ok());
        assert_eq!(
            validate_phone(""),
            Err(ValidationError::Required("Phone number"))
        );
        assert_eq!(
            validate_phone("12345"),
            Err(ValidationError::PhoneLength)
        );
        // Length is checked before characters
        assert_eq!(
            validate_phone("abc"),
            Err(ValidationError::PhoneLength)
        );
        assert_eq!(
            validate_phone("98765x43210"),
            Err(ValidationError::PhoneCharacters)
        );
        // Letters count toward the length
        assert_eq!(
            validate_phone("12345abcdefg"),
            Err(ValidationError::PhoneCharacters)
        );
    }

    #[test]
    fn test_full_name_rules() {
        assert!(validate_full_name("").is_ok());
        assert!(validate_full_name("Anita Desai").is_ok());
        assert_eq!(
            validate_full_name("R2D2"),
            Err(ValidationError::FullNameCharacters)
        );
        assert!(validate_full_name(&"a".repeat(200)).is_ok());
        assert!(validate_full_name(&"a".repeat(255)).is_ok());
        assert_eq!(
            validate_full_name(&"a".repeat(256)),
            Err(ValidationError::FullNameTooLong)
        );
        assert_eq!(
            validate_full_name("José"),
            Err(ValidationError::FullNameCharacters)
        );
    }

    #[test]
    fn test_address_rules() {
        assert!(validate_address("12 MG Road, Pune").is_ok());
        assert_eq!(
            validate_address(""),
            Err(ValidationError::Required("Address"))
        );
        assert_eq!(
            validate_address("abc"),
            Err(ValidationError::AddressTooShort)
        );
        assert_eq!(
            validate_address(&"x".repeat(501)),
            Err(ValidationError::AddressTooLong)
        );
    }

    #[test]
    fn test_city_rules() {
        assert!(validate_city("New Delhi").is_ok());
        assert_eq!(
            validate_city("Bogotá"),
            Err(ValidationError::CityCharacters)
        );
        assert_eq!(
            validate_city("Sector 17"),
            Err(ValidationError::CityCharacters)
        );
        assert_eq!(
            validate_city(&"a".repeat(101)),
            Err(ValidationError::CityTooLong)
        );
    }

    #[test]
    fn test_pincode_rules() {
        assert!(validate_pincode("411001").is_ok());
        assert!(validate_pincode("10001").is_ok());
        assert_eq!(
            validate_pincode(""),
            Err(ValidationError::Required("Pincode"))
        );
        assert_eq!(
            validate_pincode("4110"),
            Err(ValidationError::PincodeFormat)
        );
        assert_eq!(
            validate_pincode("41100a"),
            Err(ValidationError::PincodeFormat)
        );
    }

    #[test]
    fn test_otp_rules() {
        assert!(validate_otp("012345").is_ok());
        assert_eq!(validate_otp(""), Err(ValidationError::Required("OTP")));
        assert_eq!(validate_otp("12345"), Err(ValidationError::OtpFormat));
        assert_eq!(validate_otp("12345a"), Err(ValidationError::OtpFormat));
    }

    #[test]
    fn test_choice_messages() {
        let err = parse_service_tier("overnight").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Service type must be one of: express, standard, economy"
        );
        assert_eq!(parse_service_tier("Express").unwrap(), ServiceTier::Express);

        let err = parse_communication_preference("pigeon").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Communication preference must be one of: sms, email, both"
        );
    }

    #[test]
    fn test_required_message_uses_label() {
        assert_eq!(
            ValidationError::Required("Phone number").to_string(),
            "Phone number is required"
        );
    }
}
