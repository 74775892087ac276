//! Code extraction from free-form agent output.
//!
//! A chain of pure heuristics, each `&str -> Option<String>`, tried in
//! order of reliability. The chain never fails: the last layer falls back
//! to the trimmed raw text, and an empty string is a valid outcome.

use regex::Regex;

/// Extract the body of a fence tagged with the given language or format.
pub fn tagged_fence(text: &str, tag: &str) -> Option<String> {
    let pattern = format!(r"```{}[ \t]*\r?\n([\s\S]*?)```", regex::escape(tag));
    let re = Regex::new(&pattern).ok()?;
    let body = re.captures(text)?.get(1)?.as_str().trim();
    if body.is_empty() {
        None
    } else {
        Some(body.to_string())
    }
}

/// Extract the body of the first fence regardless of its tag.
pub fn any_fence(text: &str) -> Option<String> {
    let re = Regex::new(r"```[^\n]*\r?\n([\s\S]*?)```").ok()?;
    let body = re.captures(text)?.get(1)?.as_str().trim();
    if body.is_empty() {
        None
    } else {
        Some(body.to_string())
    }
}

/// Take everything from the first Python function definition onward.
/// Catches answers that mix prose with unfenced code.
pub fn from_def_keyword(text: &str) -> Option<String> {
    let start = text.find("def ")?;
    let body = text[start..].trim();
    if body.is_empty() {
        None
    } else {
        Some(body.to_string())
    }
}

/// Extract a code candidate from agent output.
///
/// Layers, in order: fence tagged `tag`, any fence, text from the first
/// `def ` keyword, trimmed raw text.
pub fn extract_code(text: &str, tag: &str) -> String {
    tagged_fence(text, tag)
        .or_else(|| any_fence(text))
        .or_else(|| from_def_keyword(text))
        .unwrap_or_else(|| text.trim().to_string())
}

/// Extract a diff candidate from agent output.
///
/// Like `extract_code` but without the keyword layer, which only makes
/// sense for Python source.
pub fn extract_diff(text: &str) -> String {
    tagged_fence(text, "diff")
        .or_else(|| any_fence(text))
        .unwrap_or_else(|| text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_fence_wins_over_untagged() {
        let text = "```\nplain\n```\n\n```python\ndef f():\n    return 1\n```";
        let code = extract_code(text, "python");
        assert_eq!(code, "def f():\n    return 1");
    }

    #[test]
    fn any_fence_used_when_tag_missing() {
        let text = "Here you go:\n```\ndef g():\n    pass\n```";
        let code = extract_code(text, "python");
        assert_eq!(code, "def g():\n    pass");
    }

    #[test]
    fn def_keyword_catches_unfenced_code() {
        let text = "Sure, here is the implementation:\ndef h(x):\n    return x * 2\nHope that helps.";
        let code = extract_code(text, "python");
        assert!(code.starts_with("def h(x):"));
    }

    #[test]
    fn raw_fallback_trims() {
        let text = "  just some text  ";
        assert_eq!(extract_code(text, "python"), "just some text");
    }

    #[test]
    fn empty_input_yields_empty_string() {
        assert_eq!(extract_code("", "python"), "");
        assert_eq!(extract_diff(""), "");
    }

    #[test]
    fn empty_fence_falls_through() {
        let text = "```python\n\n```\ndef k():\n    return 0";
        let code = extract_code(text, "python");
        assert!(code.starts_with("def k():"));
    }

    #[test]
    fn diff_fence_extracted() {
        let text = "Patch below.\n```diff\n--- a/x.py\n+++ b/x.py\n@@ -1 +1 @@\n-old\n+new\n```";
        let diff = extract_diff(text);
        assert!(diff.starts_with("--- a/x.py"));
        assert!(diff.ends_with("+new"));
    }
}
