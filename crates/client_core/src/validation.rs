//! Field normalizers and validators for record input.
//!
//! Everything here is pure. Normalizers run on every keystroke so the field
//! never holds characters the grammar could not accept; validators run both
//! live and once more at submit time against the current values.

use std::fmt;

use shared::domain::UserDraft;
use thiserror::Error;

pub const MOBILE_DIGITS: usize = 10;

/// Lower-cases, drops anything that is not an ASCII letter or whitespace, then
/// capitalizes the first letter of each whitespace-separated token.
pub fn normalize_name(raw: &str) -> String {
    let mut normalized = String::with_capacity(raw.len());
    let mut at_token_start = true;

    for ch in raw.chars().flat_map(char::to_lowercase) {
        if ch.is_whitespace() {
            normalized.push(ch);
            at_token_start = true;
        } else if ch.is_ascii_alphabetic() {
            if at_token_start {
                normalized.push(ch.to_ascii_uppercase());
                at_token_start = false;
            } else {
                normalized.push(ch);
            }
        }
    }

    normalized
}

/// Exactly two tokens, each one uppercase letter followed by one or more
/// lowercase letters, separated by a single space.
pub fn is_valid_name(name: &str) -> bool {
    let Some((first, last)) = name.split_once(' ') else {
        return false;
    };
    is_capitalized_word(first) && is_capitalized_word(last)
}

fn is_capitalized_word(word: &str) -> bool {
    let mut chars = word.chars();
    let Some(head) = chars.next() else {
        return false;
    };
    let tail = chars.as_str();
    head.is_ascii_uppercase() && !tail.is_empty() && tail.chars().all(|c| c.is_ascii_lowercase())
}

/// Keeps decimal digits only, truncated to the first ten.
pub fn normalize_mobile(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_digit)
        .take(MOBILE_DIGITS)
        .collect()
}

pub fn is_valid_mobile(mobile: &str) -> bool {
    mobile.len() == MOBILE_DIGITS && mobile.chars().all(|c| c.is_ascii_digit())
}

/// Email policy is presence only; no structural check is applied.
pub fn is_valid_email(email: &str) -> bool {
    !email.trim().is_empty()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Email,
    Mobile,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Name => "name",
            Field::Email => "email",
            Field::Mobile => "mobile",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("required")]
    Empty,
    #[error("malformed")]
    Malformed,
}

impl FieldError {
    /// Operator-facing explanation for a failing field.
    pub fn message(self, field: Field) -> &'static str {
        match (field, self) {
            (Field::Name, FieldError::Empty) => "Please enter a name",
            (Field::Name, FieldError::Malformed) => {
                "Please enter a valid name in the format: First Last"
            }
            (Field::Email, _) => "Please enter an email address",
            (Field::Mobile, FieldError::Empty) => "Please enter a mobile number",
            (Field::Mobile, FieldError::Malformed) => "Mobile number must be exactly 10 digits",
        }
    }
}

pub fn name_error(name: &str) -> Option<FieldError> {
    if name.trim().is_empty() {
        Some(FieldError::Empty)
    } else if !is_valid_name(name) {
        Some(FieldError::Malformed)
    } else {
        None
    }
}

pub fn email_error(email: &str) -> Option<FieldError> {
    (!is_valid_email(email)).then_some(FieldError::Empty)
}

pub fn mobile_error(mobile: &str) -> Option<FieldError> {
    if mobile.trim().is_empty() {
        Some(FieldError::Empty)
    } else if !is_valid_mobile(mobile) {
        Some(FieldError::Malformed)
    } else {
        None
    }
}

/// Per-field failure reasons from a submit-time check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Error)]
#[error("invalid user input: {}", self.summary())]
pub struct FieldErrors {
    pub name: Option<FieldError>,
    pub email: Option<FieldError>,
    pub mobile: Option<FieldError>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.mobile.is_none()
    }

    pub fn get(&self, field: Field) -> Option<FieldError> {
        match field {
            Field::Name => self.name,
            Field::Email => self.email,
            Field::Mobile => self.mobile,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, FieldError)> + '_ {
        [Field::Name, Field::Email, Field::Mobile]
            .into_iter()
            .filter_map(|field| self.get(field).map(|error| (field, error)))
    }

    fn summary(&self) -> String {
        self.iter()
            .map(|(field, error)| format!("{field} {error}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Recomputes every predicate against the current values. The draft is only
/// produced when all three fields pass.
pub fn validate_draft(name: &str, email: &str, mobile: &str) -> Result<UserDraft, FieldErrors> {
    let errors = FieldErrors {
        name: name_error(name),
        email: email_error(email),
        mobile: mobile_error(mobile),
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(UserDraft {
        name: name.to_string(),
        email: email.to_string(),
        mobile: mobile.to_string(),
    })
}
