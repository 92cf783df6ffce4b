/// Default base URL for Devin API requests.
pub const DEFAULT_DEVIN_API_URL: &str = "https://api.devin.ai/v1/";

/// Normalize a base URL so endpoint paths can be appended directly.
///
/// Blank input falls back to [`DEFAULT_DEVIN_API_URL`]; the result always ends
/// with exactly one `/`.
pub fn normalize_base_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_DEVIN_API_URL
    } else {
        input.trim()
    };

    format!("{}/", base.trim_end_matches('/'))
}

pub fn sessions_url(base_url: &str) -> String {
    format!("{}sessions", normalize_base_url(base_url))
}

pub fn attachments_url(base_url: &str) -> String {
    format!("{}attachments", normalize_base_url(base_url))
}
