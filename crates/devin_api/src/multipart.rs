//! Hand-built `multipart/form-data` body with a single `file` part.

use std::time::{SystemTime, UNIX_EPOCH};

/// `----FormBoundary{unix millis}`.
pub fn form_boundary() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    format!("----FormBoundary{millis}")
}

pub fn multipart_content_type(boundary: &str) -> String {
    format!("multipart/form-data; boundary={boundary}")
}

/// Builds the body byte for byte:
///
/// ```text
/// --{boundary}\r\n
/// Content-Disposition: form-data; name="file"; filename="{file_name}"\r\n
/// Content-Type: {content_type}\r\n\r\n
/// {bytes}\r\n--{boundary}--\r\n
/// ```
///
/// The boundary is not checked against `bytes`.
pub fn build_multipart_body(
    bytes: &[u8],
    file_name: &str,
    content_type: &str,
    boundary: &str,
) -> Vec<u8> {
    let head = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {content_type}\r\n\r\n",
        escape_file_name(file_name)
    );
    let tail = format!("\r\n--{boundary}--\r\n");

    let mut body = Vec::with_capacity(head.len() + bytes.len() + tail.len());
    body.extend_from_slice(head.as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(tail.as_bytes());
    body
}

fn escape_file_name(file_name: &str) -> String {
    let mut escaped = String::with_capacity(file_name.len());
    for ch in file_name.chars() {
        match ch {
            '"' => escaped.push_str("%22"),
            '\r' => escaped.push_str("%0D"),
            '\n' => escaped.push_str("%0A"),
            other => escaped.push(other),
        }
    }
    escaped
}
