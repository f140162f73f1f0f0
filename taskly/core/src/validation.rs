//! Field validation for task and account payloads.
//!
//! The same rules run in the service, where they are authoritative, and in
//! clients, where they only pre-check forms before a request is sent.

use chrono::{DateTime, NaiveDate};
use std::fmt;

#[cfg(feature = "serde")]
use serde::de::{MapAccess, Visitor};
#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::task::TaskStatus;

pub const TITLE_MAX_LEN: usize = 255;
pub const DESCRIPTION_MAX_LEN: usize = 1000;
pub const NAME_MAX_LEN: usize = 255;
pub const EMAIL_MAX_LEN: usize = 255;
pub const PASSWORD_MIN_LEN: usize = 8;

/// Field-level validation failures, kept in the order the fields were checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<(String, Vec<String>)>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a message for `field`.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        let message = message.into();
        match self.errors.iter_mut().find(|(name, _)| name == field) {
            Some((_, messages)) => messages.push(message),
            None => self.errors.push((field.to_string(), vec![message])),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Total number of messages across all fields.
    pub fn len(&self) -> usize {
        self.errors.iter().map(|(_, messages)| messages.len()).sum()
    }

    /// Messages recorded for `field`, if any.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.errors
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, messages)| messages.as_slice())
    }

    /// First message recorded for `field`.
    pub fn first(&self, field: &str) -> Option<&str> {
        self.get(field)
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.errors
            .iter()
            .map(|(name, messages)| (name.as_str(), messages.as_slice()))
    }

    /// One-line description: the first message, plus a count of the rest.
    pub fn summary(&self) -> String {
        let Some(first) = self.errors.first().and_then(|(_, m)| m.first()) else {
            return "The given data was invalid.".to_string();
        };
        match self.len() - 1 {
            0 => first.clone(),
            1 => format!("{first} (and 1 more error)"),
            more => format!("{first} (and {more} more errors)"),
        }
    }

    /// `Ok(value)` when nothing was recorded, the errors otherwise.
    pub fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(feature = "serde")]
impl Serialize for ValidationErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.errors.iter().map(|(k, v)| (k, v)))
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for ValidationErrors {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ErrorsVisitor;

        impl<'de> Visitor<'de> for ErrorsVisitor {
            type Value = ValidationErrors;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to messages")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut errors = ValidationErrors::new();
                while let Some((field, messages)) = map.next_entry::<String, Vec<String>>()? {
                    for message in messages {
                        errors.add(&field, message);
                    }
                }
                Ok(errors)
            }
        }

        deserializer.deserialize_map(ErrorsVisitor)
    }
}

/// Raw fields of a task creation request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewTaskFields {
    pub title: Option<String>,
    pub description: Option<String>,
    /// `YYYY-MM-DD` or an RFC 3339 timestamp.
    pub due_date: Option<String>,
    /// Defaults to `pending`.
    pub status: Option<String>,
}

/// A task creation request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
    pub status: TaskStatus,
}

/// Raw fields of a partial task update. Absent and `null` both mean "leave as is".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TaskPatchFields {
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub title: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub description: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub due_date: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub status: Option<String>,
}

/// A validated partial update. Only `Some` fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<TaskStatus>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.status.is_none()
    }
}

/// Raw fields of a registration request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RegistrationFields {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
}

/// A registration that passed validation. Email uniqueness is checked by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Raw fields of a login request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct LoginFields {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

fn label(field: &str) -> String {
    field.replace('_', " ")
}

fn required_message(field: &str) -> String {
    format!("The {} field is required.", label(field))
}

/// Message for a field whose JSON value is not a string.
pub fn not_a_string_message(field: &str) -> String {
    format!("The {} field must be a string.", label(field))
}

fn too_long_message(field: &str, max: usize) -> String {
    format!(
        "The {} field must not be greater than {} characters.",
        label(field),
        max
    )
}

fn trimmed(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// A required text field. Records an error and returns `None` when missing or too long.
fn required_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&String>,
    max: usize,
) -> Option<String> {
    match trimmed(value) {
        None => {
            errors.add(field, required_message(field));
            None
        }
        Some(v) if v.chars().count() > max => {
            errors.add(field, too_long_message(field, max));
            None
        }
        Some(v) => Some(v.to_string()),
    }
}

/// A text field that may be omitted, but must be valid when present.
fn optional_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&String>,
    max: usize,
) -> Option<String> {
    value?;
    required_text(errors, field, value, max)
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|d| d.date_naive()))
}

fn required_date(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&String>,
) -> Option<NaiveDate> {
    let Some(raw) = trimmed(value) else {
        errors.add(field, required_message(field));
        return None;
    };
    let date = parse_date(raw);
    if date.is_none() {
        errors.add(field, format!("The {} field must be a valid date.", label(field)));
    }
    date
}

fn optional_status(errors: &mut ValidationErrors, value: Option<&String>) -> Option<TaskStatus> {
    let raw = value?;
    match raw.trim().parse::<TaskStatus>() {
        Ok(status) => Some(status),
        Err(_) => {
            errors.add("status", "The selected status is invalid.");
            None
        }
    }
}

/// Validates a creation request. Status defaults to `pending` when omitted.
pub fn validate_new_task(fields: &NewTaskFields) -> Result<NewTask, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let title = required_text(&mut errors, "title", fields.title.as_ref(), TITLE_MAX_LEN);
    let description = required_text(
        &mut errors,
        "description",
        fields.description.as_ref(),
        DESCRIPTION_MAX_LEN,
    );
    let due_date = required_date(&mut errors, "due_date", fields.due_date.as_ref());
    let status = optional_status(&mut errors, fields.status.as_ref()).unwrap_or_default();

    match (title, description, due_date) {
        (Some(title), Some(description), Some(due_date)) if errors.is_empty() => Ok(NewTask {
            title,
            description,
            due_date,
            status,
        }),
        _ => Err(errors),
    }
}

/// Validates a partial update. Only supplied fields are checked.
pub fn validate_task_patch(fields: &TaskPatchFields) -> Result<TaskPatch, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let title = optional_text(&mut errors, "title", fields.title.as_ref(), TITLE_MAX_LEN);
    let description = optional_text(
        &mut errors,
        "description",
        fields.description.as_ref(),
        DESCRIPTION_MAX_LEN,
    );
    let due_date = match fields.due_date.as_ref() {
        Some(_) => required_date(&mut errors, "due_date", fields.due_date.as_ref()),
        None => None,
    };
    let status = optional_status(&mut errors, fields.status.as_ref());

    errors.into_result(|| TaskPatch {
        title,
        description,
        due_date,
        status,
    })
}

fn is_valid_email(email: &str) -> bool {
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

fn required_email(errors: &mut ValidationErrors, value: Option<&String>) -> Option<String> {
    let email = required_text(errors, "email", value, EMAIL_MAX_LEN)?;
    if is_valid_email(&email) {
        Some(email)
    } else {
        errors.add("email", "The email field must be a valid email address.");
        None
    }
}

/// Validates a registration request.
pub fn validate_registration(
    fields: &RegistrationFields,
) -> Result<Registration, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let name = required_text(&mut errors, "name", fields.name.as_ref(), NAME_MAX_LEN);
    let email = required_email(&mut errors, fields.email.as_ref());

    // Passwords are taken verbatim, surrounding whitespace included.
    let password = match fields.password.as_deref() {
        None | Some("") => {
            errors.add("password", required_message("password"));
            None
        }
        Some(p) if p.chars().count() < PASSWORD_MIN_LEN => {
            errors.add(
                "password",
                format!("The password field must be at least {PASSWORD_MIN_LEN} characters."),
            );
            None
        }
        Some(p) if fields.password_confirmation.as_deref() != Some(p) => {
            errors.add("password", "The password field confirmation does not match.");
            None
        }
        Some(p) => Some(p.to_string()),
    };

    match (name, email, password) {
        (Some(name), Some(email), Some(password)) if errors.is_empty() => Ok(Registration {
            name,
            email,
            password,
        }),
        _ => Err(errors),
    }
}

/// Validates the shape of a login request. Whether the credentials match is the service's call.
pub fn validate_login(fields: &LoginFields) -> Result<Credentials, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let email = required_email(&mut errors, fields.email.as_ref());
    let password = match fields.password.as_deref() {
        None | Some("") => {
            errors.add("password", required_message("password"));
            None
        }
        Some(p) => Some(p.to_string()),
    };

    match (email, password) {
        (Some(email), Some(password)) => Ok(Credentials { email, password }),
        _ => Err(errors),
    }
}
