/// Strip markdown link/emphasis punctuation the answer service is known to
/// emit, so replies are safe for channels without markdown rendering.
///
/// `](` becomes `: ` first (turning `[label](url)` into `label: url`), then
/// any remaining brackets and parentheses are dropped.
#[must_use]
pub fn normalize_reply(text: &str) -> String {
    text.replace("](", ": ").replace(['[', ']', '(', ')'], "")
}
