use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Field-keyed validation messages, serialized as `{"field": ["message", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(pub BTreeMap<String, Vec<String>>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// `Ok(())` when nothing was recorded, otherwise `Err(self)`.
    ///
    /// # Errors
    ///
    /// Returns the collected errors when at least one field failed.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

static CHILEAN_PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\+56\s9\s\d{4}\s\d{4}|\+569\d{8})$").expect("valid phone regex")
});

pub const PHONE_FORMAT_MESSAGE: &str =
    "Invalid phone number. Must be in format: +56 9 XXXX XXXX or +569XXXXXXXX";

/// Chilean mobile numbers, either `+56 9 XXXX XXXX` or `+569XXXXXXXX`.
#[must_use]
pub fn is_valid_phone(value: &str) -> bool {
    CHILEAN_PHONE.is_match(value)
}

/// True when `value` parses as a URL with both a scheme and a host.
#[must_use]
pub fn is_absolute_url(value: &str) -> bool {
    url::Url::parse(value).is_ok_and(|u| u.has_host() && !u.scheme().is_empty())
}

/// Minimal `local@domain.tld` shape check.
#[must_use]
pub fn is_valid_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !value.chars().any(char::is_whitespace)
}

/// Record `message` under `field` when the trimmed value is empty or longer
/// than `max_len` characters.
pub fn require_text(errors: &mut FieldErrors, field: &str, value: &str, max_len: usize) {
    if value.trim().is_empty() {
        errors.add(field, "This field may not be blank.");
    } else if value.chars().count() > max_len {
        errors.add(
            field,
            format!("Ensure this field has no more than {max_len} characters."),
        );
    }
}
