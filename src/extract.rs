const FENCE: &str = "```";

/// Extracts the first fenced code block from a chat answer.
///
/// Scans for the first triple-backtick fence, skips the remainder of that
/// line (the language tag, whatever its length), and returns everything up
/// to the next fence. Returns `None` when the text holds fewer than two
/// fences, or when the opening fence line never ends.
pub fn extract_code(text: &str) -> Option<String> {
    let open = text.find(FENCE)?;
    let after_open = &text[open + FENCE.len()..];

    let newline = after_open.find('\n')?;
    let body = &after_open[newline + 1..];

    let close = body.find(FENCE)?;
    Some(body[..close].to_string())
}
