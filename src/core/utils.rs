/// Truncates a string to its first 10 characters for log output.
///
/// Stored values and inbound command text go through this before landing in
/// any log line, so secrets kept in the config store never leak into logs in
/// full.
pub fn truncate_for_log(text: &str) -> String {
    text.chars().take(10).collect()
}
