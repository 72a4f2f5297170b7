//! Thinking marker recognition (spec §4.8 "Thinking extraction").

use regex::Regex;
use std::sync::LazyLock;

/// One marker family: an opening and closing delimiter pair.
struct MarkerFamily {
    pattern: &'static str,
    open: &'static str,
    close: &'static str,
}

const FAMILIES: &[MarkerFamily] = &[
    MarkerFamily {
        pattern: r"(?is)<thinking>(.*?)</thinking>",
        open: "<thinking>",
        close: "</thinking>",
    },
    MarkerFamily {
        pattern: r"(?is)\[Thinking\](.*?)\[/Thinking\]",
        open: "[Thinking]",
        close: "[/Thinking]",
    },
    MarkerFamily {
        pattern: r"(?is)<\|thinking\|>(.*?)<\|/thinking\|>",
        open: "<|thinking|>",
        close: "<|/thinking|>",
    },
];

static COMPILED: LazyLock<Vec<Regex>> = LazyLock::new(|| FAMILIES.iter().map(|f| Regex::new(f.pattern).unwrap()).collect());

/// Splits `text` into `(thinking, response)` using the first marker family
/// that matches. Absent any marker, `thinking` is `None` and `response` is
/// `text` unchanged.
#[must_use]
pub fn extract_thinking(text: &str) -> (Option<String>, String) {
    for re in COMPILED.iter() {
        if let Some(caps) = re.captures(text) {
            let thinking = caps.get(1).map(|m| m.as_str().trim().to_string());
            let response = re.replace(text, "").trim().to_string();
            return (thinking, response);
        }
    }
    (None, text.to_string())
}

/// Whether `text` opens any recognized thinking marker without a matching close.
#[must_use]
pub fn opens_thinking(text: &str) -> bool {
    FAMILIES.iter().any(|f| text.contains(f.open))
}

/// Whether `text` closes any recognized thinking marker.
#[must_use]
pub fn closes_thinking(text: &str) -> bool {
    FAMILIES.iter().any(|f| text.contains(f.close))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_angle_bracket_markers() {
        let (thinking, response) = extract_thinking("<thinking>step one</thinking>final answer");
        assert_eq!(thinking.as_deref(), Some("step one"));
        assert_eq!(response, "final answer");
    }

    #[test]
    fn extracts_bracket_markers() {
        let (thinking, response) = extract_thinking("[Thinking]considering options[/Thinking]the answer is 4");
        assert_eq!(thinking.as_deref(), Some("considering options"));
        assert_eq!(response, "the answer is 4");
    }

    #[test]
    fn extracts_pipe_markers() {
        let (thinking, response) = extract_thinking("<|thinking|>hmm<|/thinking|>done");
        assert_eq!(thinking.as_deref(), Some("hmm"));
        assert_eq!(response, "done");
    }

    #[test]
    fn absent_marker_returns_text_unchanged() {
        let (thinking, response) = extract_thinking("just an answer");
        assert!(thinking.is_none());
        assert_eq!(response, "just an answer");
    }
}
