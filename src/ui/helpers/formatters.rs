//! Display formatting helpers.

/// Converts bytes to human-readable file size format.
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Renders a record's ISO-8601 upload date as "dd-mm-yyyy HH:MM" for the
/// file listing. Falls back to the raw string when it doesn't parse.
pub fn format_upload_date(iso: &str) -> String {
    match chrono::DateTime::parse_from_rfc3339(iso) {
        Ok(dt) => dt.format("%d-%m-%Y %H:%M").to_string(),
        Err(_) => iso.to_string(),
    }
}

/// Truncates a file name to max length with ellipsis.
pub fn truncate_filename(name: &str, max_len: usize) -> String {
    if name.chars().count() <= max_len {
        name.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let kept: String = name.chars().take(max_len - 3).collect();
        format!("{kept}...")
    }
}
