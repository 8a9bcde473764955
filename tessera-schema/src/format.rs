//! `format` keyword checks.
//!
//! Only string instances are checked. Formats the engine does not know are
//! annotations and always pass.

use chrono::{DateTime, NaiveDate};

/// A recognised `format` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Format {
    DateTime,
    Date,
    Time,
    Email,
    Uuid,
    Uri,
    Unknown,
}

impl Format {
    pub(crate) fn from_name(name: &str) -> Self {
        match name {
            "date-time" => Self::DateTime,
            "date" => Self::Date,
            "time" => Self::Time,
            "email" => Self::Email,
            "uuid" => Self::Uuid,
            "uri" => Self::Uri,
            _ => Self::Unknown,
        }
    }

    pub(crate) fn matches(self, value: &str) -> bool {
        match self {
            Self::DateTime => DateTime::parse_from_rfc3339(value).is_ok(),
            Self::Date => value.len() == 10 && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok(),
            // RFC 3339 full-time, offset required.
            Self::Time => DateTime::parse_from_rfc3339(&format!("1970-01-01T{value}")).is_ok(),
            Self::Email => is_email(value),
            Self::Uuid => value.len() == 36 && uuid::Uuid::parse_str(value).is_ok(),
            Self::Uri => is_uri(value),
            Self::Unknown => true,
        }
    }
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.contains('@') || value.chars().any(char::is_whitespace) {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}

/// `scheme:rest` with an RFC 3986 scheme and no whitespace.
fn is_uri(value: &str) -> bool {
    let Some((scheme, rest)) = value.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    let scheme_ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    scheme_ok && !rest.is_empty() && !value.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_time() {
        assert!(Format::DateTime.matches("2024-03-01T12:30:00Z"));
        assert!(Format::DateTime.matches("2024-03-01T12:30:00.123+02:00"));
        assert!(!Format::DateTime.matches("2024-03-01 12:30"));
    }

    #[test]
    fn date() {
        assert!(Format::Date.matches("2024-02-29"));
        assert!(!Format::Date.matches("2023-02-29"));
        assert!(!Format::Date.matches("2024-2-1"));
    }

    #[test]
    fn time() {
        assert!(Format::Time.matches("08:15:00Z"));
        assert!(!Format::Time.matches("8am"));
    }

    #[test]
    fn email() {
        assert!(Format::Email.matches("ops@example.com"));
        assert!(!Format::Email.matches("ops@localhost"));
        assert!(!Format::Email.matches("not an email@example.com"));
        assert!(!Format::Email.matches("@example.com"));
    }

    #[test]
    fn uuid_and_uri() {
        assert!(Format::Uuid.matches("0190a5c4-7b1e-7c3a-9f00-1234567890ab"));
        assert!(!Format::Uuid.matches("0190a5c47b1e7c3a9f001234567890ab"));
        assert!(Format::Uri.matches("https://example.com/a?b=c"));
        assert!(!Format::Uri.matches("example dot com"));
    }

    #[test]
    fn unknown_formats_pass() {
        assert!(Format::from_name("hostname-ish").matches("anything"));
    }
}
