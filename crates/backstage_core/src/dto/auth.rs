//! Login request shape.

use crate::dto::validation::{
    char_classes, read_optional_string, Rule, Validate, ValidationContext, ValidationRejection,
    MIN_PASSWORD_CHAR_CLASSES, PASSWORD_MAX_LENGTH, PASSWORD_MIN_LENGTH,
};
use crate::model::Record;

/// Username/email plus password.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialDto {
    pub credential: String,
    pub password: String,
}

// Keeps passwords out of logs.
impl std::fmt::Debug for CredentialDto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialDto")
            .field("credential", &self.credential)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Validate for CredentialDto {
    fn validate(
        payload: &Record,
        ctx: &ValidationContext<'_>,
    ) -> Result<Self, ValidationRejection> {
        let mut errors = ctx.errors();

        let credential =
            read_optional_string(payload, "credential", &mut errors).unwrap_or_default();
        if credential.trim().is_empty() {
            errors.add("credential", Rule::IsNotEmpty);
        }

        let password = read_optional_string(payload, "password", &mut errors).unwrap_or_default();
        let length = password.chars().count();
        if !(PASSWORD_MIN_LENGTH..=PASSWORD_MAX_LENGTH).contains(&length) {
            errors.add(
                "password",
                Rule::Length {
                    min: PASSWORD_MIN_LENGTH,
                    max: PASSWORD_MAX_LENGTH,
                },
            );
        }
        if char_classes(password) < MIN_PASSWORD_CHAR_CLASSES {
            errors.add("password", Rule::PasswordComplexity);
        }

        errors.finish(Self {
            credential: credential.to_string(),
            password: password.to_string(),
        })
    }
}
