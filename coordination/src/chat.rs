//! Chat-facing types: incoming messages, vote parsing and the outgoing broadcaster

use crate::weighting::BadgeSet;

/// A chat message as delivered by the chat listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub username: String,
    pub text: String,
    pub badges: BadgeSet,
}

impl ChatMessage {
    pub fn new(username: impl Into<String>, text: impl Into<String>, badges: BadgeSet) -> Self {
        Self {
            username: username.into(),
            text: text.into(),
            badges,
        }
    }

    /// Build a message from the raw badge tags the chat service attaches,
    /// e.g. `["subscriber/12", "vip/1"]`
    pub fn from_tags<I, S>(username: impl Into<String>, text: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(username, text, BadgeSet::from_tags(tags))
    }

    /// The 1-based choice this message votes for, if it is a vote at all
    pub fn vote_index(&self) -> Option<usize> {
        parse_vote_index(&self.text)
    }
}

/// Parse `#2`, `2` or `2 let's go` into a 1-based choice index.
///
/// Only the first whitespace-delimited token is considered and only one
/// leading `#` is stripped. Zero and anything that is not a base-10 integer
/// yield `None`.
pub fn parse_vote_index(text: &str) -> Option<usize> {
    let token = text.split_whitespace().next()?;
    let digits = token.strip_prefix('#').unwrap_or(token);
    match digits.parse::<usize>() {
        Ok(0) | Err(_) => None,
        Ok(index) => Some(index),
    }
}

/// Outgoing chat connection used to announce poll choices
pub trait ChatBroadcaster: Send + Sync {
    fn send_message(&self, message: &str);

    /// Messages are only sent while this is true
    fn is_connected(&self) -> bool {
        true
    }
}

/// Broadcaster for hosts without a chat connection
#[derive(Debug, Clone, Copy, Default)]
pub struct NoChat;

impl ChatBroadcaster for NoChat {
    fn send_message(&self, _message: &str) {}

    fn is_connected(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weighting::Badge;

    #[test]
    fn test_parse_vote_index() {
        assert_eq!(parse_vote_index("#2"), Some(2));
        assert_eq!(parse_vote_index("3"), Some(3));
        assert_eq!(parse_vote_index("  #1 pls pick this"), Some(1));
        assert_eq!(parse_vote_index("#0"), None);
        assert_eq!(parse_vote_index("##2"), None);
        assert_eq!(parse_vote_index("-1"), None);
        assert_eq!(parse_vote_index("two"), None);
        assert_eq!(parse_vote_index("gg #2"), None);
        assert_eq!(parse_vote_index(""), None);
        assert_eq!(parse_vote_index("   "), None);
    }

    #[test]
    fn test_message_from_tags() {
        let msg = ChatMessage::from_tags("Alice", "#1", ["broadcaster/1", "subscriber/24", "bits/100"]);
        assert!(msg.badges.contains(Badge::Moderator));
        assert!(msg.badges.contains(Badge::Subscriber));
        assert!(!msg.badges.contains(Badge::Vip));
        assert_eq!(msg.vote_index(), Some(1));
    }
}
