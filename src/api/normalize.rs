//! Maps failed round trips onto the client error taxonomy. The mapping is
//! table-driven by status code; 400 bodies are searched for field errors in
//! a fixed priority order.

use crate::errors::{
    ACCESS_DENIED_MESSAGE, AppError, CONNECTIVITY_MESSAGE, Field, GENERIC_MESSAGE,
    INVALID_CREDENTIALS_MESSAGE, NOT_FOUND_MESSAGE, SERVER_ERROR_MESSAGE,
};
use serde_json::Value;

/// Error for a request that never produced a response.
pub(crate) fn connectivity() -> AppError {
    AppError::Connectivity(CONNECTIVITY_MESSAGE.to_string())
}

/// Error for a response whose status is not a success.
pub(crate) fn from_status(status: u16, body: &Value) -> AppError {
    match status {
        400 => match first_field_error(body) {
            Some((field, message)) => AppError::Validation {
                field: Some(field),
                message,
            },
            None => AppError::Validation {
                field: None,
                message: GENERIC_MESSAGE.to_string(),
            },
        },
        401 => AppError::Auth {
            status,
            message: INVALID_CREDENTIALS_MESSAGE.to_string(),
        },
        403 => AppError::Auth {
            status,
            message: ACCESS_DENIED_MESSAGE.to_string(),
        },
        404 => AppError::NotFound(NOT_FOUND_MESSAGE.to_string()),
        500 => AppError::Server(SERVER_ERROR_MESSAGE.to_string()),
        _ => AppError::Unknown {
            status,
            message: GENERIC_MESSAGE.to_string(),
        },
    }
}

/// Username, then password, then non-field errors, then `detail`.
fn first_field_error(body: &Value) -> Option<(Field, String)> {
    if let Some(message) = first_message(body.get("username")) {
        return Some((Field::Username, format!("username error: {message}")));
    }
    if let Some(message) = first_message(body.get("password")) {
        return Some((Field::Password, format!("password error: {message}")));
    }
    if let Some(message) = first_message(body.get("non_field_errors")) {
        return Some((Field::NonField, message));
    }
    first_message(body.get("detail")).map(|message| (Field::Detail, message))
}

/// Field errors arrive either as a list of strings or as a single string.
fn first_message(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(message) => Some(message.clone()),
        Value::Array(items) => items.first().and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}
