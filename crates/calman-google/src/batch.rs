//! Batch request codec.
//!
//! The Google batch endpoint wraps several API calls in a single
//! `multipart/mixed` POST. Each part is an `application/http` envelope
//! holding a plain request line; the response mirrors the layout with
//! one part per sub-request, correlated by Content-ID. Parts succeed
//! and fail independently, so one rejected sub-request never voids the
//! others.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng as _;

use crate::error::{ApiError, ApiResult};

/// A batch of GET sub-requests, encoded as one multipart/mixed body.
#[derive(Debug)]
pub struct BatchRequest {
    boundary: String,
    parts: Vec<BatchPart>,
}

#[derive(Debug)]
struct BatchPart {
    content_id: String,
    path: String,
}

impl BatchRequest {
    /// Creates an empty batch with a fresh random boundary.
    pub fn new() -> Self {
        Self {
            boundary: generate_boundary(),
            parts: Vec::new(),
        }
    }

    /// Queues a GET sub-request.
    ///
    /// `path` is relative to the API host, e.g.
    /// `/calendar/v3/calendars/primary/events?maxResults=5`.
    pub fn add_get(&mut self, content_id: impl Into<String>, path: impl Into<String>) {
        self.parts.push(BatchPart {
            content_id: content_id.into(),
            path: path.into(),
        });
    }

    /// Number of queued sub-requests.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// The multipart boundary, for the outer Content-Type header.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Renders the multipart/mixed request body.
    pub fn encode(&self) -> String {
        let mut body = String::new();
        for part in &self.parts {
            body.push_str(&format!("--{}\r\n", self.boundary));
            body.push_str("Content-Type: application/http\r\n");
            body.push_str(&format!("Content-ID: <{}>\r\n", part.content_id));
            body.push_str("\r\n");
            body.push_str(&format!("GET {} HTTP/1.1\r\n", part.path));
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{}--\r\n", self.boundary));
        body
    }
}

impl Default for BatchRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// One sub-response from a batch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResponsePart {
    /// Content-ID of the originating sub-request.
    pub content_id: String,
    /// HTTP status of this part.
    pub status: u16,
    /// Raw body of this part, usually JSON.
    pub body: String,
}

impl BatchResponsePart {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Parses a multipart/mixed batch response body.
///
/// `content_type` is the outer response header carrying the boundary.
/// Parts come back in whatever order the service chose; callers match
/// them to sub-requests by Content-ID (the service echoes the request
/// id with a `response-` prefix, which is stripped here).
pub fn parse_batch_response(content_type: &str, body: &str) -> ApiResult<Vec<BatchResponsePart>> {
    let boundary = extract_boundary(content_type).ok_or_else(|| {
        ApiError::invalid_response(format!(
            "batch response is not multipart: {:?}",
            content_type
        ))
    })?;

    let delimiter = format!("--{}", boundary);
    let mut parts = Vec::new();

    for segment in body.split(&delimiter) {
        let segment = segment.trim_start_matches("\r\n").trim_start_matches('\n');
        // Skip the preamble and the closing "--" marker
        if segment.is_empty() || segment.starts_with("--") {
            continue;
        }
        if let Some(part) = parse_part(segment) {
            parts.push(part);
        }
    }

    if parts.is_empty() {
        return Err(ApiError::invalid_response(
            "batch response contained no parts",
        ));
    }

    Ok(parts)
}

/// Parses one part: envelope headers, then an embedded HTTP response.
fn parse_part(segment: &str) -> Option<BatchResponsePart> {
    let (envelope_headers, rest) = split_headers(segment)?;
    let content_id = envelope_headers
        .iter()
        .find_map(|line| header_value(line, "content-id"))
        .map(normalize_content_id)
        .unwrap_or_default();

    // Embedded response: status line, headers, blank line, body
    let (response_headers, payload) = split_headers(rest)?;
    let status_line = response_headers.first()?;
    let status = status_line.split_whitespace().nth(1)?.parse::<u16>().ok()?;

    Some(BatchResponsePart {
        content_id,
        status,
        body: payload.trim().to_string(),
    })
}

/// Splits a block into its header lines and the text after the first
/// blank line.
fn split_headers(text: &str) -> Option<(Vec<&str>, &str)> {
    let text = text.trim_start_matches("\r\n").trim_start_matches('\n');
    let (head, rest) = match text.find("\r\n\r\n") {
        Some(idx) => (&text[..idx], &text[idx + 4..]),
        None => {
            let idx = text.find("\n\n")?;
            (&text[..idx], &text[idx + 2..])
        }
    };
    Some((head.lines().map(str::trim).collect(), rest))
}

fn header_value<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let (key, value) = line.split_once(':')?;
    if key.trim().eq_ignore_ascii_case(name) {
        Some(value.trim())
    } else {
        None
    }
}

/// Strips the angle brackets and the `response-` echo prefix from a
/// Content-ID header value.
fn normalize_content_id(raw: &str) -> String {
    let trimmed = raw.trim().trim_start_matches('<').trim_end_matches('>');
    trimmed.strip_prefix("response-").unwrap_or(trimmed).to_string()
}

fn extract_boundary(content_type: &str) -> Option<String> {
    let idx = content_type.find("boundary=")?;
    let raw = &content_type[idx + "boundary=".len()..];
    let end = raw.find(';').unwrap_or(raw.len());
    Some(raw[..end].trim().trim_matches('"').to_string())
}

fn generate_boundary() -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..12).map(|_| rng.random()).collect();
    format!("batch_{}", URL_SAFE_NO_PAD.encode(&bytes))
}
