//! Message parsing and normalization.
//!
//! Raw message bytes reconstructed from the archive diff are parsed with the
//! `mailparse` crate. Two levels of parsing are offered: [`parse_identity`]
//! extracts only what threading needs (Message-ID plus the reference chain),
//! [`parse_message`] additionally decodes the body and sender for rendering.
//!
//! Threading headers are normalized the way public-inbox does it:
//!
//! - Message-IDs lose their angle brackets and surrounding whitespace
//! - `References` is split on whitespace, oldest to newest
//! - `In-Reply-To` is appended to the chain when not already present
//!
//! Transfer encodings (base64, quoted-printable including soft line breaks)
//! are resolved by `mailparse` when the body is extracted, so callers always
//! see decoded text.

use mailparse::{MailHeaderMap, parse_mail};
use thiserror::Error;

/// The threading-relevant subset of a message's headers.
#[derive(Debug, Clone)]
pub struct MessageIdentity {
    pub message_id: String,
    /// Referenced message-ids, oldest first, `In-Reply-To` appended last.
    pub references: Vec<String>,
}

/// A fully parsed message, ready for rendering. Never persisted.
#[derive(Debug, Clone)]
pub struct ParsedMessage {
    pub message_id: String,
    pub references: Vec<String>,
    pub subject: String,
    /// All headers in order of appearance, `(name, value)`.
    pub headers: Vec<(String, String)>,
    /// Decoded text body; empty when the message has none.
    pub body: String,
    /// Display name from `From`, without the address part.
    pub from_name: Option<String>,
}

/// Errors that can be returned while parsing a message.
#[derive(Debug, Error)]
pub enum ParseMessageError {
    #[error("failed to parse MIME structure: {0}")]
    MimeParse(#[from] mailparse::MailParseError),
    #[error("missing Message-ID header")]
    MissingMessageId,
}

/// Sanitize text by removing NUL bytes and surrounding whitespace.
fn sanitize_text(text: &str) -> String {
    text.replace('\0', "").trim().to_string()
}

/// Clean and normalize message IDs by removing angle brackets and whitespace.
fn normalize_message_id(msg_id: Option<String>) -> Option<String> {
    msg_id.and_then(|id| {
        let cleaned = id.trim().trim_matches(&['<', '>'][..]).trim();
        if cleaned.is_empty() {
            None
        } else {
            Some(sanitize_text(cleaned))
        }
    })
}

/// Extract message IDs from a References header value.
/// Uses whitespace-based splitting for better compatibility.
fn extract_references(header_value: &str) -> Vec<String> {
    header_value
        .split_whitespace()
        .map(|id| {
            let cleaned = id.trim().trim_matches(&['<', '>'][..]);
            sanitize_text(cleaned)
        })
        .filter(|id| !id.is_empty())
        .collect()
}

fn identity_from_headers(
    headers: &[mailparse::MailHeader<'_>],
) -> Result<MessageIdentity, ParseMessageError> {
    let message_id = normalize_message_id(headers.get_first_value("Message-ID")).ok_or_else(
        || {
            log::debug!("missing Message-ID header");
            ParseMessageError::MissingMessageId
        },
    )?;

    let mut references = headers
        .get_first_value("References")
        .map(|v| extract_references(&v))
        .unwrap_or_default();

    // In-Reply-To names the direct parent; broken clients set it without
    // repeating it in References.
    if let Some(parent) = normalize_message_id(headers.get_first_value("In-Reply-To")) {
        if !references.contains(&parent) {
            references.push(parent);
        }
    }

    Ok(MessageIdentity {
        message_id,
        references,
    })
}

/// Parse only the threading identity of a raw message.
pub fn parse_identity(raw: &str) -> Result<MessageIdentity, ParseMessageError> {
    let parsed = parse_mail(raw.as_bytes())?;
    identity_from_headers(&parsed.headers)
}

/// Parse a raw message into structured data for rendering and delivery.
///
/// Required: a non-empty Message-ID after normalization. Everything else
/// falls back to an empty value; a missing body or sender does not make the
/// message undeliverable.
pub fn parse_message(raw: &str) -> Result<ParsedMessage, ParseMessageError> {
    let parsed = parse_mail(raw.as_bytes())?;
    let identity = identity_from_headers(&parsed.headers)?;

    let subject = parsed
        .headers
        .get_first_value("Subject")
        .map(|s| sanitize_text(&s))
        .unwrap_or_default();

    let headers = parsed
        .headers
        .iter()
        .map(|h| (h.get_key(), h.get_value()))
        .collect();

    // Decoded body: first text/plain part of a multipart message, falling
    // back to the root body.
    let body = if parsed.subparts.is_empty() {
        parsed.get_body().unwrap_or_default()
    } else {
        let mut body_text = String::new();
        for part in &parsed.subparts {
            if part.ctype.mimetype.as_str() == "text/plain" {
                body_text = part.get_body().unwrap_or_default();
                break;
            }
        }
        if body_text.is_empty() {
            parsed.get_body().unwrap_or_default()
        } else {
            body_text
        }
    };
    let body = sanitize_text(&body);

    let from_str = parsed.headers.get_first_value("From").unwrap_or_default();
    let from_name = if let Ok(addrs) = mailparse::addrparse(&from_str) {
        if let Some(mailparse::MailAddr::Single(info)) = addrs.iter().next() {
            info.display_name
                .as_deref()
                .map(sanitize_text)
                .filter(|name| !name.is_empty())
        } else {
            None
        }
    } else {
        None
    };

    log::trace!("parsed: {} - {}", identity.message_id, subject);

    Ok(ParsedMessage {
        message_id: identity.message_id,
        references: identity.references,
        subject,
        headers,
        body,
        from_name,
    })
}
