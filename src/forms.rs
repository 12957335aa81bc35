//! Client-side form validation for the login and registration views.
//!
//! Validation runs before anything is sent to the API. Each field reports at
//! most one error (the first rule it breaks) and errors come back in form
//! order. Server-side rejections still arrive through the gateway.

use crate::{api::types::Avatar, api::types::Registration, errors::AppError};
use regex::Regex;
use std::{fmt, fs, path::Path};

pub const NAME_MAX_LENGTH: usize = 150;
pub const USERNAME_MIN_LENGTH: usize = 3;
pub const USERNAME_MAX_LENGTH: usize = 150;
pub const PASSWORD_MIN_LENGTH: usize = 8;
pub const AVATAR_MAX_BYTES: usize = 5 * 1024 * 1024;

const PASSWORD_SPECIALS: &str = "@$!%*?&";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormField {
    FirstName,
    LastName,
    Username,
    Password,
    ConfirmPassword,
    Avatar,
}

impl FormField {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::FirstName => "first name",
            Self::LastName => "last name",
            Self::Username => "username",
            Self::Password => "password",
            Self::ConfirmPassword => "confirm password",
            Self::Avatar => "avatar",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: FormField,
    pub message: &'static str,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field.label(), self.message)
    }
}

/// Checks the login form. Credentials are only required to be present.
#[must_use]
pub fn validate_login(username: &str, password: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if username.trim().is_empty() {
        errors.push(error(FormField::Username, "Username is required"));
    }
    if password.is_empty() {
        errors.push(error(FormField::Password, "Password is required"));
    }
    errors
}

#[must_use]
pub fn validate_registration(registration: &Registration) -> Vec<FieldError> {
    let checks = [
        (
            FormField::FirstName,
            check_name(
                &registration.first_name,
                "First name is required",
                "First name cannot exceed 150 characters",
            ),
        ),
        (
            FormField::LastName,
            check_name(
                &registration.last_name,
                "Last name is required",
                "Last name cannot exceed 150 characters",
            ),
        ),
        (FormField::Username, check_username(&registration.username)),
        (FormField::Password, check_password(&registration.password)),
        (
            FormField::ConfirmPassword,
            check_confirmation(&registration.password, &registration.confirm_password),
        ),
        (
            FormField::Avatar,
            registration.avatar.as_ref().and_then(check_avatar),
        ),
    ];

    checks
        .into_iter()
        .filter_map(|(field, message)| message.map(|message| error(field, message)))
        .collect()
}

/// Reads an avatar from disk, deriving its content type from the extension.
///
/// # Errors
/// Returns `AppError::Storage` if the file cannot be read.
pub fn load_avatar(path: &Path) -> Result<Avatar, AppError> {
    let bytes = fs::read(path).map_err(|err| {
        AppError::Storage(format!("Failed to read avatar {}: {err}", path.display()))
    })?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "avatar".to_string());

    Ok(Avatar {
        content_type: content_type_for(path).to_string(),
        file_name,
        bytes,
    })
}

fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

const fn error(field: FormField, message: &'static str) -> FieldError {
    FieldError { field, message }
}

fn check_name(
    value: &str,
    required: &'static str,
    too_long: &'static str,
) -> Option<&'static str> {
    if value.trim().is_empty() {
        Some(required)
    } else if value.chars().count() > NAME_MAX_LENGTH {
        Some(too_long)
    } else {
        None
    }
}

fn check_username(username: &str) -> Option<&'static str> {
    let length = username.chars().count();
    if username.is_empty() {
        Some("Username is required")
    } else if length < USERNAME_MIN_LENGTH {
        Some("Username must be at least 3 characters")
    } else if length > USERNAME_MAX_LENGTH {
        Some("Username cannot exceed 150 characters")
    } else if !valid_username(username) {
        Some("Username can only contain letters, numbers, and underscores")
    } else {
        None
    }
}

fn valid_username(username: &str) -> bool {
    Regex::new(r"^[a-zA-Z0-9_]+$").is_ok_and(|re| re.is_match(username))
}

fn check_password(password: &str) -> Option<&'static str> {
    if password.is_empty() {
        Some("Password is required")
    } else if password.chars().count() < PASSWORD_MIN_LENGTH {
        Some("Password must be at least 8 characters")
    } else if !strong_password(password) {
        Some(
            "Password must contain at least one uppercase letter, one lowercase letter, one number and one special character",
        )
    } else {
        None
    }
}

fn strong_password(password: &str) -> bool {
    let allowed = Regex::new(r"^[A-Za-z\d@$!%*?&]+$").is_ok_and(|re| re.is_match(password));
    allowed
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c))
}

fn check_confirmation(password: &str, confirmation: &str) -> Option<&'static str> {
    if confirmation.is_empty() {
        Some("Please confirm your password")
    } else if confirmation != password {
        Some("Passwords do not match")
    } else {
        None
    }
}

fn check_avatar(avatar: &Avatar) -> Option<&'static str> {
    if !avatar.content_type.starts_with("image/") {
        Some("Please upload an image file")
    } else if avatar.bytes.len() > AVATAR_MAX_BYTES {
        Some("Image size should not exceed 5MB")
    } else {
        None
    }
}
