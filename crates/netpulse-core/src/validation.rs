// ── Client-side form validation ──
//
// Runs before any auth request leaves the process. A form that fails
// validation is never submitted; every problem found is reported at once
// so the UI can render them inline.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use strum::Display;

pub const MIN_PASSWORD_LEN: usize = 8;

const FILL_ALL_FIELDS: &str = "Please fill in all fields";
const PASSWORD_TOO_SHORT: &str = "Password must be at least 8 characters long";
const PASSWORD_TOO_WEAK: &str =
    "Password must contain uppercase, lowercase, number, and special character";
const PASSWORDS_DIFFER: &str = "Passwords do not match";
const POLICY_NOT_ACCEPTED: &str = "You must agree to the privacy policy";
const MISSING_RESET_TOKEN: &str = "Invalid or missing token";

/// Which input a [`ValidationError`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Field {
    /// The form as a whole (e.g. empty required fields).
    Form,
    Email,
    Password,
    ConfirmPassword,
    ResetToken,
    AgreePolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: Field,
    pub message: String,
}

impl ValidationError {
    fn new(field: Field, message: &str) -> Self {
        Self {
            field,
            message: message.to_owned(),
        }
    }
}

/// Non-empty list of problems with a submitted form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    pub fn for_field(&self, field: Field) -> impl Iterator<Item = &ValidationError> {
        self.0.iter().filter(move |e| e.field == field)
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|e| e.message.as_str())
    }

    fn check(errors: Vec<ValidationError>) -> Result<(), Self> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self(errors))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, message) in self.messages().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            f.write_str(message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

// ── Password policy ──────────────────────────────────────────────────

/// Check a new password against the account policy: at least
/// [`MIN_PASSWORD_LEN`] characters with an uppercase letter, a lowercase
/// letter, a digit and a non-alphanumeric symbol.
pub fn password_policy(password: &str) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(ValidationError::new(Field::Password, PASSWORD_TOO_SHORT));
    }
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password.chars().any(|c| !c.is_ascii_alphanumeric());
    if !(has_upper && has_lower && has_digit && has_symbol) {
        errors.push(ValidationError::new(Field::Password, PASSWORD_TOO_WEAK));
    }
    errors
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

// ── Forms ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LoginForm {
    pub email: String,
    pub password: SecretString,
}

impl LoginForm {
    /// Existing accounts only need the length rule; the full policy
    /// applies when a password is chosen.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let password = self.password.expose_secret();
        if is_blank(&self.email) || password.is_empty() {
            return ValidationErrors::check(vec![ValidationError::new(
                Field::Form,
                FILL_ALL_FIELDS,
            )]);
        }
        let mut errors = Vec::new();
        if password.chars().count() < MIN_PASSWORD_LEN {
            errors.push(ValidationError::new(Field::Password, PASSWORD_TOO_SHORT));
        }
        ValidationErrors::check(errors)
    }
}

#[derive(Debug, Clone)]
pub struct SignupForm {
    pub email: String,
    pub password: SecretString,
    pub agree_policy: bool,
}

impl SignupForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let password = self.password.expose_secret();
        let mut errors = Vec::new();
        if is_blank(&self.email) || password.is_empty() {
            errors.push(ValidationError::new(Field::Form, FILL_ALL_FIELDS));
        } else {
            errors.extend(password_policy(password));
        }
        if !self.agree_policy {
            errors.push(ValidationError::new(Field::AgreePolicy, POLICY_NOT_ACCEPTED));
        }
        ValidationErrors::check(errors)
    }
}

#[derive(Debug, Clone)]
pub struct ResetForm {
    /// Single-use token from the reset e-mail link.
    pub reset_token: SecretString,
    pub password: SecretString,
    pub confirm_password: SecretString,
}

impl ResetForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let password = self.password.expose_secret();
        let confirm = self.confirm_password.expose_secret();
        let mut errors = Vec::new();
        if is_blank(self.reset_token.expose_secret()) {
            errors.push(ValidationError::new(Field::ResetToken, MISSING_RESET_TOKEN));
        }
        if password.is_empty() || confirm.is_empty() {
            errors.push(ValidationError::new(Field::Form, FILL_ALL_FIELDS));
            return ValidationErrors::check(errors);
        }
        if password != confirm {
            errors.push(ValidationError::new(Field::ConfirmPassword, PASSWORDS_DIFFER));
        }
        errors.extend(password_policy(password));
        ValidationErrors::check(errors)
    }
}
