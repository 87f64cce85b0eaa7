use std::collections::HashMap;

use crate::error::ApiError;

const MAX_EMAIL_LEN: usize = 254;

/// Collects the first violation per field
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: HashMap<String, String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Trimmed, non-empty text no longer than `max_len` characters
    pub fn required(&mut self, field: &str, value: Option<&str>, max_len: usize) -> String {
        match value.map(str::trim) {
            None | Some("") => {
                self.add(field, format!("{} is required", label(field)));
                String::new()
            }
            Some(v) => {
                self.check_len(field, v, max_len);
                v.to_string()
            }
        }
    }

    /// Trimmed text; blank becomes `None`
    pub fn optional(&mut self, field: &str, value: Option<&str>, max_len: usize) -> Option<String> {
        let v = value.map(str::trim).filter(|v| !v.is_empty())?;
        self.check_len(field, v, max_len);
        Some(v.to_string())
    }

    pub fn email(&mut self, field: &str, value: Option<&str>) -> String {
        let email = self.required(field, value, MAX_EMAIL_LEN);
        if !email.is_empty() && !looks_like_email(&email) {
            self.add(field, "Invalid email address");
        }
        email.to_lowercase()
    }

    pub fn one_of(&mut self, field: &str, value: &str, allowed: &[&str]) {
        if !allowed.contains(&value) {
            self.add(field, format!("Must be one of: {}", allowed.join(", ")));
        }
    }

    fn check_len(&mut self, field: &str, value: &str, max_len: usize) {
        if value.chars().count() > max_len {
            self.add(
                field,
                format!("{} cannot exceed {} characters", label(field), max_len),
            );
        }
    }

    pub fn into_result(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation_error("Validation failed", Some(self.errors)))
        }
    }
}

fn label(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>().replace('_', " "),
        None => String::new(),
    }
}

fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.chars().any(char::is_whitespace)
}
