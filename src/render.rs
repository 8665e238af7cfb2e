use chrono::{DateTime, Utc};

/// Escape text for use in HTML bodies and quoted attributes.
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// "October 16, 2026"
pub fn format_date(dt: &DateTime<Utc>) -> String {
    dt.format("%B %-d, %Y").to_string()
}

/// "Oct 16, 2026, 09:41"
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%b %-d, %Y, %H:%M").to_string()
}

/// First `max_chars` characters, with an ellipsis when anything was cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}…", head.trim_end())
    } else {
        head
    }
}

/// Inline notice box, used both for flash messages and inline error regions.
pub fn notice(kind: &str, message: &str) -> String {
    let kind = match kind {
        "success" | "error" | "info" => kind,
        _ => "info",
    };
    format!(
        "<div class=\"notice notice-{}\" role=\"status\">{}</div>",
        kind,
        html_escape(message)
    )
}

/// Small icon for the social link row; unknown platforms get a plain link.
pub fn social_icon(platform: &str) -> &'static str {
    match platform {
        "github" => "🔗",
        "linkedin" => "💼",
        "twitter" => "🐦",
        "instagram" => "📷",
        "facebook" => "👤",
        _ => "🔗",
    }
}
