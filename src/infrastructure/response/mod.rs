use once_cell::sync::Lazy;
use regex::Regex;

static THINK_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<think>[\s\S]*?</think>|<think\s*/>").unwrap());

static REASONING_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<reasoning>[\s\S]*?</reasoning>").unwrap());

static MULTIPLE_NEWLINES_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Strips reasoning blocks some models prepend to the analysis text
pub fn clean_llm_response(response: &str) -> String {
    let cleaned = THINK_TAG_PATTERN.replace_all(response, "");
    let cleaned = REASONING_TAG_PATTERN.replace_all(&cleaned, "");
    let cleaned = cleaned.trim();

    MULTIPLE_NEWLINES_PATTERN
        .replace_all(cleaned, "\n\n")
        .to_string()
}
