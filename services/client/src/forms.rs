//! services/client/src/forms.rs
//!
//! Client-side form checks. A form that fails validation is never sent.

use validator::{Validate, ValidationError};

//=========================================================================================
// Custom Validators
//=========================================================================================

fn digits(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// A tax id (ИНН) has 10 digits for companies and 12 for individuals.
fn validate_tax_id(value: &str) -> Result<(), ValidationError> {
    let count = digits(value).len();
    if value.chars().any(|c| c.is_alphabetic()) || (count != 10 && count != 12) {
        let mut err = ValidationError::new("tax_id");
        err.message = Some("Tax id must contain 10 or 12 digits.".into());
        return Err(err);
    }
    Ok(())
}

fn validate_phone(value: &str) -> Result<(), ValidationError> {
    if digits(value).len() < 10 {
        let mut err = ValidationError::new("phone");
        err.message = Some("Phone number must contain at least 10 digits.".into());
        return Err(err);
    }
    Ok(())
}

//=========================================================================================
// Forms
//=========================================================================================

#[derive(Debug, Clone, Validate)]
pub struct LoginForm {
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters."))]
    pub password: String,
}

#[derive(Debug, Clone, Validate)]
pub struct RegisterForm {
    #[validate(custom(function = "validate_tax_id"))]
    pub tax_id: String,

    #[validate(length(min = 1, message = "Full name is required."))]
    pub full_name: String,

    #[validate(email(message = "Email address is not valid."))]
    pub email: Option<String>,

    pub address: Option<String>,

    #[validate(custom(function = "validate_phone"))]
    pub phone: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters."))]
    pub password: String,

    #[validate(must_match(other = "password", message = "Passwords do not match."))]
    pub confirm_password: String,
}

/// Thirty days, the extension an administrator grants by default.
pub const DEFAULT_GRANT_MINUTES: u32 = 43_200;

#[derive(Debug, Clone, Validate)]
pub struct GrantForm {
    #[validate(email(message = "Email address is not valid."))]
    pub email: String,

    #[validate(range(min = 1, message = "At least one minute must be granted."))]
    pub minutes: u32,
}

impl RegisterForm {
    /// The tax id as sent to the server: digits only.
    pub fn normalized_tax_id(&self) -> String {
        digits(&self.tax_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_form() -> RegisterForm {
        RegisterForm {
            tax_id: "7707 083 893".into(),
            full_name: "ООО Ромашка".into(),
            email: Some("buyer@example.com".into()),
            address: None,
            phone: "+7 (999) 123-45-67".into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
        }
    }

    #[test]
    fn accepts_valid_forms() {
        assert!(register_form().validate().is_ok());
        assert_eq!(register_form().normalized_tax_id(), "7707083893");

        let login = LoginForm { phone: "89991234567".into(), password: "secret1".into() };
        assert!(login.validate().is_ok());
    }

    #[test]
    fn rejects_short_phone_and_password() {
        let login = LoginForm { phone: "12345".into(), password: "abc".into() };
        let errors = login.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("phone"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn tax_id_must_have_10_or_12_digits() {
        for tax_id in ["123456789", "12345678901", "1234567890123", "12345abcde"] {
            let form = RegisterForm { tax_id: tax_id.into(), ..register_form() };
            let errors = form.validate().unwrap_err();
            assert!(errors.field_errors().contains_key("tax_id"), "{tax_id}");
        }

        let form = RegisterForm { tax_id: "500100732259".into(), ..register_form() };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn grant_needs_an_email_and_a_positive_duration() {
        let grant = GrantForm { email: "user@example.com".into(), minutes: DEFAULT_GRANT_MINUTES };
        assert!(grant.validate().is_ok());

        let grant = GrantForm { email: "user".into(), minutes: 0 };
        let errors = grant.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
        assert!(errors.field_errors().contains_key("minutes"));
    }

    #[test]
    fn confirmation_and_email_are_checked() {
        let form = RegisterForm {
            confirm_password: "secret2".into(),
            email: Some("not-an-email".into()),
            full_name: String::new(),
            ..register_form()
        };
        let errors = form.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("confirm_password"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("full_name"));
    }
}
