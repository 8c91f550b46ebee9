//! Response body classification.
//!
//! The exact-count rule encodes an assumption about the target's JSON shape:
//! a location that resolves cleanly mentions the listing title a fixed number
//! of times. Adapting the tool to another target means swapping this policy.

use crate::config::ProbeConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Pattern seen exactly the expected number of times.
    Match { label: String },
    /// Pattern seen more often than expected.
    Ambiguous { count: usize },
    /// Too few occurrences; not worth reporting.
    Skip { count: usize },
}

pub trait Classifier: Send + Sync {
    fn classify(&self, body: &str) -> Classification;
}

#[derive(Debug, Clone)]
pub struct PatternCountClassifier {
    pub pattern: String,
    pub label_prefix: String,
    pub label_suffix: String,
    pub expected_count: usize,
}

impl PatternCountClassifier {
    pub fn from_config(config: &ProbeConfig) -> Self {
        Self {
            pattern: config.match_pattern.clone(),
            label_prefix: config.label_prefix.clone(),
            label_suffix: config.label_suffix.clone(),
            expected_count: config.expected_count,
        }
    }
}

impl Classifier for PatternCountClassifier {
    fn classify(&self, body: &str) -> Classification {
        let count = count_occurrences(body, &self.pattern);
        if count == self.expected_count {
            Classification::Match {
                label: extract_between(body, &self.label_prefix, &self.label_suffix),
            }
        } else if count > self.expected_count {
            Classification::Ambiguous { count }
        } else {
            Classification::Skip { count }
        }
    }
}

/// Non-overlapping occurrences of `pattern` in `body`.
pub fn count_occurrences(body: &str, pattern: &str) -> usize {
    if pattern.is_empty() {
        return 0;
    }
    body.matches(pattern).count()
}

/// Text between the first `prefix` and the next `suffix` after it, or an
/// empty string when either is missing.
pub fn extract_between(body: &str, prefix: &str, suffix: &str) -> String {
    let Some(start) = body.find(prefix).map(|i| i + prefix.len()) else {
        return String::new();
    };
    match body[start..].find(suffix) {
        Some(len) => body[start..start + len].to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> PatternCountClassifier {
        PatternCountClassifier::from_config(&ProbeConfig::default())
    }

    #[test]
    fn two_occurrences_match_with_label() {
        let body = r#"[{"title":"Properties for rent in Dubai Marina","path":"/x"},{"title":"Properties for rent..."}]"#;
        assert_eq!(
            classifier().classify(body),
            Classification::Match { label: "in Dubai Marina".to_string() }
        );
    }

    #[test]
    fn three_occurrences_are_ambiguous() {
        let one = r#"{"title":"Properties for rent in A","path":"/a"}"#;
        let body = format!("{one}{one}{one}");
        assert_eq!(classifier().classify(&body), Classification::Ambiguous { count: 3 });
    }

    #[test]
    fn zero_or_one_is_skipped() {
        assert_eq!(classifier().classify("{}"), Classification::Skip { count: 0 });
        let body = r#"{"title":"Properties for rent in A","path":"/a"}"#;
        assert_eq!(classifier().classify(body), Classification::Skip { count: 1 });
    }

    #[test]
    fn missing_suffix_gives_empty_label() {
        let body = r#"{"title":"Properties for rent in A"{"title":"Properties for rent in B"#;
        assert_eq!(classifier().classify(body), Classification::Match { label: String::new() });
    }

    #[test]
    fn count_is_non_overlapping() {
        assert_eq!(count_occurrences("aaaa", "aa"), 2);
        assert_eq!(count_occurrences("abc", ""), 0);
    }

    #[test]
    fn custom_expected_count() {
        let c = PatternCountClassifier {
            pattern: "x".into(),
            label_prefix: "<".into(),
            label_suffix: ">".into(),
            expected_count: 1,
        };
        assert_eq!(c.classify("x<lbl>"), Classification::Match { label: "lbl".into() });
        assert_eq!(c.classify("xx"), Classification::Ambiguous { count: 2 });
    }
}
