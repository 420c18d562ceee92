//! Small formatters for CLI output.

/// Value or "-" when absent.
pub fn or_dash(value: Option<&str>) -> String {
    value.map_or_else(|| "-".to_string(), str::to_string)
}

/// Truncate to `max_chars` characters with a unicode ellipsis.
pub fn truncate_ellipsis(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{kept}\u{2026}")
}

/// Checkmark for true, blank otherwise.
pub fn flag(value: bool) -> &'static str {
    if value {
        "\u{2713}"
    } else {
        ""
    }
}
