/// Check whether a conversation or its sender may interact with the bot.
///
/// An empty allowlist means everyone is allowed (open policy). Entries are
/// matched case-insensitively against both the chat and the sender JID,
/// with one `*` wildcard supported per entry.
#[must_use]
pub fn is_allowed(chat_jid: &str, sender_jid: &str, allowlist: &[String]) -> bool {
    if allowlist.is_empty() {
        return true;
    }
    allowlist
        .iter()
        .any(|pattern| matches(pattern, chat_jid) || matches(pattern, sender_jid))
}

fn matches(pattern: &str, jid: &str) -> bool {
    let pattern = pattern.to_lowercase();
    let jid = jid.to_lowercase();
    match pattern.split_once('*') {
        None => pattern == jid,
        Some((prefix, suffix)) => {
            jid.len() >= prefix.len() + suffix.len()
                && jid.starts_with(prefix)
                && jid.ends_with(suffix)
        },
    }
}
