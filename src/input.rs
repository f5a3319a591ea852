//! Normalization of user-entered form fields into a QR payload

use crate::error::{Error, MSG_REQUIRED_INPUT, Result};
use crate::qr::Payload;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which form fields feed the payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// A single web address
    #[default]
    Url,
    /// A contact card
    Contact,
}

impl InputMode {
    /// Lowercase tag used in filenames and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            InputMode::Url => "url",
            InputMode::Contact => "contact",
        }
    }
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputMode {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "url" => Ok(Self::Url),
            "contact" => Ok(Self::Contact),
            other => Err(format!(
                "Unsupported input mode '{other}', expected 'url' or 'contact'"
            )),
        }
    }
}

/// Contact details serialized into a vCard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    /// Full name (required)
    pub name: String,
    /// Phone number
    pub phone: String,
    /// Email address
    pub email: String,
    /// Organization, if any
    pub organization: Option<String>,
}

impl ContactRecord {
    /// Create a record with just a name; other fields start empty.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// A record is usable when it has a name and a way to reach the person.
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty()
            && (!self.phone.trim().is_empty() || !self.email.trim().is_empty())
    }
}

/// Prefix a scheme onto a bare address.
///
/// Empty input yields an empty string, which callers treat as "nothing to
/// encode". Input already starting with `http://` or `https://` is returned
/// trimmed but otherwise untouched.
pub fn format_url(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let trimmed = raw.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return trimmed.to_string();
    }

    format!("https://{trimmed}")
}

/// Serialize a contact record as a vCard 3.0 document.
///
/// Field order is fixed (FN, ORG, TEL, EMAIL) and absent values produce empty
/// lines rather than being skipped, so equal records always give equal output.
pub fn build_contact_payload(record: &ContactRecord) -> String {
    let organization = record.organization.as_deref().unwrap_or("");
    [
        "BEGIN:VCARD".to_string(),
        "VERSION:3.0".to_string(),
        format!("FN:{}", record.name),
        format!("ORG:{organization}"),
        format!("TEL:{}", record.phone),
        format!("EMAIL:{}", record.email),
        "END:VCARD".to_string(),
    ]
    .join("\n")
}

/// Raw form contents for both input modes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormInput {
    /// Active mode
    pub mode: InputMode,
    /// URL field text
    pub url: String,
    /// Contact fields
    pub contact: ContactRecord,
}

impl FormInput {
    /// Form in URL mode with the given text
    pub fn url(text: impl Into<String>) -> Self {
        Self {
            mode: InputMode::Url,
            url: text.into(),
            contact: ContactRecord::default(),
        }
    }

    /// Form in contact mode with the given record
    pub fn contact(record: ContactRecord) -> Self {
        Self {
            mode: InputMode::Contact,
            url: String::new(),
            contact: record,
        }
    }

    /// Whether the active mode has enough input to generate.
    pub fn is_valid(&self) -> bool {
        match self.mode {
            InputMode::Url => !self.url.trim().is_empty(),
            InputMode::Contact => self.contact.is_valid(),
        }
    }

    /// Validate the active mode and produce the canonical payload.
    pub fn payload(&self) -> Result<Payload> {
        if !self.is_valid() {
            return Err(Error::Validation(MSG_REQUIRED_INPUT.to_string()));
        }

        let text = match self.mode {
            InputMode::Url => format_url(&self.url),
            InputMode::Contact => build_contact_payload(&self.contact),
        };

        if text.is_empty() {
            return Err(Error::Validation(MSG_REQUIRED_INPUT.to_string()));
        }

        Ok(Payload::new(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_gets_https() {
        assert_eq!(format_url("google.com"), "https://google.com");
        assert_eq!(format_url("  example.org/path "), "https://example.org/path");
    }

    #[test]
    fn schemed_urls_are_idempotent() {
        for raw in [
            "http://example.com",
            "https://example.com/a?b=c",
            "  https://trim.me  ",
        ] {
            let once = format_url(raw);
            assert_eq!(format_url(&once), once);
            assert!(once.starts_with("http"));
        }
    }

    #[test]
    fn unschemed_result_ends_with_trimmed_input() {
        for raw in ["foo", " bar.baz ", "ftp://files", "HTTP://upper"] {
            let formatted = format_url(raw);
            assert!(formatted.starts_with("https://"));
            assert!(formatted.ends_with(raw.trim()));
        }
    }

    #[test]
    fn empty_url_stays_empty() {
        assert_eq!(format_url(""), "");
    }

    #[test]
    fn vcard_keeps_empty_fields() {
        let record = ContactRecord {
            name: "Jane Roe".to_string(),
            phone: String::new(),
            email: "jane@example.com".to_string(),
            organization: None,
        };
        let card = build_contact_payload(&record);
        assert_eq!(
            card,
            "BEGIN:VCARD\nVERSION:3.0\nFN:Jane Roe\nORG:\nTEL:\nEMAIL:jane@example.com\nEND:VCARD"
        );
        assert_eq!(card, build_contact_payload(&record.clone()));
    }

    #[test]
    fn vcard_field_order_is_fixed() {
        let record = ContactRecord {
            name: "A".to_string(),
            phone: "1".to_string(),
            email: "e".to_string(),
            organization: Some("Org".to_string()),
        };
        let card = build_contact_payload(&record);
        let lines: Vec<&str> = card.lines().collect();
        assert_eq!(
            lines,
            [
                "BEGIN:VCARD",
                "VERSION:3.0",
                "FN:A",
                "ORG:Org",
                "TEL:1",
                "EMAIL:e",
                "END:VCARD"
            ]
        );
    }

    #[test]
    fn contact_requires_phone_or_email() {
        let form = FormInput::contact(ContactRecord::new("John Doe"));
        let err = form.payload().unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.user_message(), MSG_REQUIRED_INPUT);

        let mut record = ContactRecord::new("John Doe");
        record.phone = "+1 555 0100".to_string();
        assert!(FormInput::contact(record).payload().is_ok());
    }

    #[test]
    fn whitespace_only_fields_do_not_count() {
        let record = ContactRecord {
            name: "   ".to_string(),
            phone: "123".to_string(),
            ..Default::default()
        };
        assert!(!record.is_valid());
        assert!(FormInput::url("   ").payload().is_err());
    }

    #[test]
    fn url_form_payload_is_normalized() {
        let payload = FormInput::url("google.com").payload().unwrap();
        assert_eq!(payload.as_str(), "https://google.com");
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("URL".parse::<InputMode>().unwrap(), InputMode::Url);
        assert_eq!("contact".parse::<InputMode>().unwrap(), InputMode::Contact);
        assert!("wifi".parse::<InputMode>().is_err());
        assert_eq!(InputMode::Contact.to_string(), "contact");
    }
}
