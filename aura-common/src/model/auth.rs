use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::{
    collections::BTreeMap,
    fmt::{Debug, Formatter},
};
use thiserror::Error;

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The access token was empty")]
pub struct EmptyAccessTokenError;

/// Bearer credential proving the viewer's identity.
#[derive(Clone, Eq, PartialEq, Hash, Serialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: String) -> Result<Self, EmptyAccessTokenError> {
        if token.trim().is_empty() {
            Err(EmptyAccessTokenError)
        } else {
            Ok(Self(token))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Debug for AccessToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AccessToken").field(&"[redacted]").finish()
    }
}

impl<'de> Deserialize<'de> for AccessToken {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        AccessToken::new(inner).map_err(|_| Error::invalid_value(Unexpected::Str(""), &"AccessToken"))
    }
}

/// Form body of `POST /auth/login`. The backend calls the email `username`.
#[derive(Clone, Eq, PartialEq, Hash, Serialize)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct LoginResponse {
    pub access_token: AccessToken,
}

#[derive(Clone, Eq, PartialEq, Hash, Serialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Per-field form errors, keyed by field name.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct PasswordStrength {
    pub has_min_length: bool,
    pub has_letter: bool,
    pub has_digit: bool,
    pub has_special: bool,
}

impl Debug for LoginCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

impl Debug for SignupRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignupRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[redacted]")
            .finish()
    }
}

impl FieldErrors {
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl PasswordStrength {
    #[must_use]
    pub fn of(password: &str) -> Self {
        Self {
            has_min_length: password.chars().count() >= PASSWORD_MIN_LEN,
            has_letter: password.chars().any(|c| c.is_ascii_alphabetic()),
            has_digit: password.chars().any(|c| c.is_ascii_digit()),
            has_special: password.chars().any(|c| PASSWORD_SPECIAL_CHARS.contains(c)),
        }
    }
}

/// Loose `local@domain.tld` shape check; the backend does the real validation.
#[must_use]
pub fn looks_like_email(email: &str) -> bool {
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };

    !local.is_empty()
        && domain
            .rsplit_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}

fn check_email(email: &str, errors: &mut FieldErrors) {
    if email.is_empty() {
        errors.insert("email", "Email is required");
    } else if !looks_like_email(email) {
        errors.insert("email", "Email is invalid");
    }
}

impl LoginCredentials {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();

        check_email(&self.username, &mut errors);
        if self.password.is_empty() {
            errors.insert("password", "Password is required");
        }

        errors.into_result()
    }
}

impl SignupRequest {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();

        if self.name.trim().is_empty() {
            errors.insert("name", "Name is required");
        }
        check_email(&self.email, &mut errors);
        if self.password.is_empty() {
            errors.insert("password", "Password is required");
        } else if !PasswordStrength::of(&self.password).has_min_length {
            errors.insert(
                "password",
                format!("Password must be at least {PASSWORD_MIN_LEN} characters"),
            );
        }

        errors.into_result()
    }
}
