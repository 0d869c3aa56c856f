//! Prompt pattern helpers.

use regex::bytes::Regex;

/// Compile a prompt pattern so it only matches at the end of received output.
///
/// Patterns such as `[#$]` are handed in bare; matching them anywhere in the
/// output would fire on the first `#` in a command echo, so an end anchor is
/// appended unless the pattern already carries one.
pub fn compile_prompt_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let anchored = if (pattern.ends_with('$') && !pattern.ends_with("\\$")) || pattern.ends_with("\\z") {
        pattern.to_string()
    } else {
        format!(r"(?:{})\s*\z", pattern)
    };

    Regex::new(&anchored)
}

/// Extract the prompt text: the matched region, trimmed.
pub fn extract_prompt(data: &[u8], pattern: &Regex) -> String {
    pattern
        .find(data)
        .map(|m| String::from_utf8_lossy(&data[m.start()..]).trim().to_string())
        .unwrap_or_default()
}
