/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a date string to a more readable format
pub fn format_date(date: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date) {
        dt.format("%b %d, %Y").to_string()
    } else if date.len() >= 10 && date.is_char_boundary(10) {
        // Fall back to the YYYY-MM-DD prefix
        date[..10].to_string()
    } else {
        date.to_string()
    }
}

/// Public short link for a code, e.g. `https://sho.rt/r/abc123`
pub fn short_link(public_base_url: &str, short_code: &str) -> String {
    format!("{}/r/{}", public_base_url.trim_end_matches('/'), short_code)
}

/// Server endpoint that records the click and redirects to the target
pub fn redirect_target(api_base_url: &str, short_code: &str) -> String {
    format!("{}/r/{}", api_base_url.trim_end_matches('/'), short_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("สวัสดีครับ", 5), "สว...");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2024-05-01T10:00:00Z"), "May 01, 2024");
        assert_eq!(format_date("2024-05-01 10:00:00"), "2024-05-01");
        assert_eq!(format_date("soon"), "soon");
    }

    #[test]
    fn test_short_link() {
        assert_eq!(short_link("http://localhost:5173/", "abc"), "http://localhost:5173/r/abc");
        assert_eq!(redirect_target("http://localhost:3000", "abc"), "http://localhost:3000/r/abc");
    }
}
