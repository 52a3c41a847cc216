use regex::Regex;
use std::sync::OnceLock;

/// Collects per-field problems so the client gets all of them in one response.
#[derive(Debug, Default)]
pub struct FieldErrors {
    messages: Vec<String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Required: present and not just whitespace.
    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.messages.push(format!("field {} is a required field", field));
        }
        self
    }

    /// Required, and shaped like an email address.
    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.messages.push(format!("field {} is a required field", field));
        } else if !is_valid_email(value) {
            self.messages.push(format!("field {} is not a valid email", field));
        }
        self
    }

    /// Ok if nothing was flagged, otherwise the joined messages.
    pub fn finish(&mut self) -> Result<(), String> {
        if self.messages.is_empty() {
            Ok(())
        } else {
            Err(std::mem::take(&mut self.messages).join(", "))
        }
    }
}

/// Validates an email address.
///
/// Rules:
/// 1. At most 254 characters (the SMTP path limit)
/// 2. Exactly one `@`, with something on both sides
/// 3. No whitespace anywhere
/// 4. Domain has at least one dot and no empty labels
pub fn is_valid_email(email: &str) -> bool {
    if email.len() > 254 {
        return false;
    }

    // Not RFC 5322. Nobody actually wants RFC 5322.
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$")
            .expect("email regex is valid")
    });

    re.is_match(email)
}
