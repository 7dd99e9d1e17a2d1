//! Maps raw generation failure text to a user-facing category.
//!
//! Matching is lexical: the lower-cased error text is searched for known
//! keywords, and the first category with a hit wins.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    QuotaExceeded,
    Authentication,
    ServiceUnavailable,
    PermissionDenied,
    Other,
}

const RULES: &[(FailureCategory, &[&str])] = &[
    (
        FailureCategory::QuotaExceeded,
        &[
            "429",
            "quota",
            "rate limit",
            "exceeded",
            "resource_exhausted",
            "resource has been exhausted",
        ],
    ),
    (
        FailureCategory::Authentication,
        &[
            "unauthorized",
            "authentication",
            "invalid key",
            "forbidden",
            "401",
            "403",
        ],
    ),
    (
        FailureCategory::ServiceUnavailable,
        &["service unavailable", "timeout", "connection", "503", "504"],
    ),
    (FailureCategory::PermissionDenied, &["permission"]),
];

impl FailureCategory {
    pub fn classify(error_text: &str) -> Self {
        let lowered = error_text.to_lowercase();
        RULES
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
            .map(|(category, _)| *category)
            .unwrap_or(FailureCategory::Other)
    }

    /// Message shown to the user. `raw` is only echoed for uncategorised failures.
    pub fn user_message(&self, raw: &str) -> String {
        match self {
            FailureCategory::QuotaExceeded => {
                "API quota exceeded. Please try again later or use your own API key.".to_string()
            }
            FailureCategory::Authentication => {
                "API authentication failed. Please check your API key or try again later."
                    .to_string()
            }
            FailureCategory::ServiceUnavailable => {
                "API service temporarily unavailable. Please try again later.".to_string()
            }
            FailureCategory::PermissionDenied => {
                "API permission denied. Please use your own API key.".to_string()
            }
            FailureCategory::Other => format!("Failed to generate image: {}", raw),
        }
    }

    /// Label for metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCategory::QuotaExceeded => "quota_exceeded",
            FailureCategory::Authentication => "authentication",
            FailureCategory::ServiceUnavailable => "service_unavailable",
            FailureCategory::PermissionDenied => "permission_denied",
            FailureCategory::Other => "other",
        }
    }
}

/// Seconds from a Gemini `"retryDelay": "37s"` hint in the error text.
/// Fractional delays round up.
pub fn retry_after_seconds(error_text: &str) -> Option<u64> {
    let (_, rest) = error_text.split_once("retryDelay")?;
    let rest = rest.trim_start_matches(|c: char| c == '"' || c == ':' || c.is_whitespace());
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    let seconds: u64 = digits.parse().ok()?;

    if rest[digits.len()..].starts_with('.') {
        Some(seconds + 1)
    } else {
        Some(seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_errors() {
        for text in [
            "Gemini API error 429 Too Many Requests: {}",
            "RESOURCE_EXHAUSTED",
            "Resource has been exhausted (e.g. check quota).",
            "Rate limit reached",
        ] {
            assert_eq!(FailureCategory::classify(text), FailureCategory::QuotaExceeded);
        }
    }

    #[test]
    fn auth_errors() {
        assert_eq!(
            FailureCategory::classify("Gemini API error 401 Unauthorized"),
            FailureCategory::Authentication
        );
        assert_eq!(
            FailureCategory::classify("API key not valid. Invalid key supplied"),
            FailureCategory::Authentication
        );
    }

    #[test]
    fn forbidden_is_checked_before_permission() {
        assert_eq!(
            FailureCategory::classify("403 Forbidden: PERMISSION_DENIED"),
            FailureCategory::Authentication
        );
        assert_eq!(
            FailureCategory::classify("The caller does not have permission"),
            FailureCategory::PermissionDenied
        );
    }

    #[test]
    fn quota_is_checked_before_unavailable() {
        assert_eq!(
            FailureCategory::classify("503 after quota exceeded"),
            FailureCategory::QuotaExceeded
        );
    }

    #[test]
    fn unavailable_errors() {
        for text in [
            "Network error: timeout: operation timed out",
            "connection failed: refused",
            "Gemini API error 503 Service Unavailable",
            "504 Gateway Timeout",
        ] {
            assert_eq!(
                FailureCategory::classify(text),
                FailureCategory::ServiceUnavailable
            );
        }
    }

    #[test]
    fn other_errors_echo_raw_text() {
        let category = FailureCategory::classify("No image data received from the model");
        assert_eq!(category, FailureCategory::Other);
        assert_eq!(
            category.user_message("No image data received from the model"),
            "Failed to generate image: No image data received from the model"
        );
    }

    #[test]
    fn reads_retry_delay_hint() {
        let body = r#"Gemini API error 429: {"details": [{"retryDelay": "37s"}]}"#;
        assert_eq!(retry_after_seconds(body), Some(37));
        assert_eq!(retry_after_seconds(r#""retryDelay":"1.5s""#), Some(2));
        assert_eq!(retry_after_seconds("429 RESOURCE_EXHAUSTED"), None);
        assert_eq!(retry_after_seconds(r#""retryDelay": "soon""#), None);
    }
}
