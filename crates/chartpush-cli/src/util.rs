//! Formatting helpers for the run summary

/// Human-readable archive size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Shorten a `sha256:<hex>` digest for display
///
/// Keeps the algorithm prefix and the first `len` characters of the hash.
#[must_use]
pub fn short_digest(digest: &str, len: usize) -> String {
    let (algo, hex) = digest.split_once(':').unwrap_or(("sha256", digest));
    let hex: String = hex.chars().take(len).collect();
    format!("{}:{}", algo, hex)
}
