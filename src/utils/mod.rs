use anyhow::Result;
use url::Url;

pub mod wait;

pub use wait::{wait_for, Cadence};

/// Validate a URL and return normalized version
pub fn validate_and_normalize_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url)
        .map_err(|_| anyhow::anyhow!("Invalid URL format: {}", url))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("URL must use HTTP or HTTPS protocol");
    }

    Ok(parsed.to_string())
}

fn is_video_id(candidate: &str) -> bool {
    candidate.len() == 11
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn is_youtube_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == "youtube.com" || host == "youtu.be" || host.ends_with(".youtube.com")
}

/// Extract a video identifier from a bare id or any common watch URL form
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if is_video_id(input) {
        return Some(input.to_string());
    }

    let normalized = validate_and_normalize_url(input).ok()?;
    let url = Url::parse(&normalized).ok()?;
    let host = url.host_str()?;
    if !is_youtube_host(host) {
        return None;
    }

    let candidate = if host.eq_ignore_ascii_case("youtu.be") {
        url.path_segments()?.next().map(str::to_string)
    } else if url.path().starts_with("/watch") {
        url.query_pairs().find(|(k, _)| k == "v").map(|(_, v)| v.into_owned())
    } else {
        let mut segments = url.path_segments()?;
        match (segments.next(), segments.next()) {
            (Some("embed" | "shorts" | "live" | "v"), Some(id)) => Some(id.to_string()),
            _ => None,
        }
    };

    candidate.filter(|id| is_video_id(id))
}

/// Parse a rendered timestamp (`s`, `m:ss` or `h:mm:ss`) into seconds
pub fn parse_timestamp(text: &str) -> Option<f64> {
    let parts: Vec<&str> = text.trim().split(':').collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }

    parts.iter().enumerate().try_fold(0.0, |total, (i, part)| {
        let value = part
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)?;
        // Only the leading field may exceed a clock position
        if i > 0 && value >= 60.0 {
            return None;
        }
        Some(total * 60.0 + value)
    })
}

/// Format seconds as `m:ss`, or `h:mm:ss` past the hour
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_video_id_variants() {
        let id = Some("dQw4w9WgXcQ".to_string());
        assert_eq!(extract_video_id("dQw4w9WgXcQ"), id);
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42"), id);
        assert_eq!(extract_video_id("https://youtu.be/dQw4w9WgXcQ"), id);
        assert_eq!(extract_video_id("https://m.youtube.com/shorts/dQw4w9WgXcQ"), id);
        assert_eq!(extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ"), id);
        assert_eq!(extract_video_id("https://example.com/watch?v=dQw4w9WgXcQ"), None);
        assert_eq!(extract_video_id("not an id"), None);
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("0:05"), Some(5.0));
        assert_eq!(parse_timestamp("12:34"), Some(754.0));
        assert_eq!(parse_timestamp(" 1:02:03 "), Some(3723.0));
        assert_eq!(parse_timestamp("42"), Some(42.0));
        assert_eq!(parse_timestamp("a:bc"), None);
        assert_eq!(parse_timestamp("1:2:3:4"), None);
    }

    #[test]
    fn test_parse_timestamp_rejects_out_of_range_fields() {
        assert_eq!(parse_timestamp("1:75"), None);
        assert_eq!(parse_timestamp("1:60:00"), None);
        assert_eq!(parse_timestamp("inf"), None);
        assert_eq!(parse_timestamp("NaN"), None);
        assert_eq!(parse_timestamp("90:00"), Some(5400.0));
        assert_eq!(parse_timestamp("1:59.5"), Some(119.5));
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(5.9), "0:05");
        assert_eq!(format_timestamp(754.0), "12:34");
        assert_eq!(format_timestamp(3723.0), "1:02:03");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30.0), "30s");
        assert_eq!(format_duration(90.0), "1m 30s");
        assert_eq!(format_duration(3661.0), "1h 1m 1s");
    }

    #[test]
    fn test_validate_and_normalize_url() {
        assert!(validate_and_normalize_url("https://example.com").is_ok());
        assert!(validate_and_normalize_url("ftp://example.com").is_err());
        assert!(validate_and_normalize_url("not-a-url").is_err());
    }
}
