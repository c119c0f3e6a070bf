//! Small helpers shared by the config, auth, and record layers.

/// Longest backend error body carried into an error message.
const MAX_ERROR_BODY_CHARS: usize = 180;

/// Trimmed text, or `None` when nothing but whitespace is left.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Whether `value` names an HTTP(S) endpoint.
pub fn is_http_url(value: &str) -> bool {
    ["http://", "https://"]
        .iter()
        .any(|scheme| value.starts_with(scheme))
}

/// Trimmed prefix of a response body, short enough for a log line.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(MAX_ERROR_BODY_CHARS).collect()
}

/// Seconds since the Unix epoch. Session expiry uses this resolution.
pub fn unix_timestamp_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Milliseconds since the Unix epoch, the resolution of record timestamps.
pub fn unix_timestamp_millis_now() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Render whole seconds as a zero-padded `mm:ss` clock.
///
/// Minutes are not capped, so an hour-long clip renders as `60:00`.
pub fn format_clock(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "00:00".to_string();
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total = seconds.floor() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}
