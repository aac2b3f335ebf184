//! Chat message parsing for recorded games.
//!
//! Chat lines — pre-game lobby chat in the header and in-game chat in the
//! body — embed the sender name and an optional directed-group tag inside
//! the message text itself:
//!
//! ```text
//! <All>PlayerOne: gg wp
//! <Rating> PlayerTwo: hi
//! PlayerThree: no group tag here
//! ```
//!
//! Standard directed messages put the `<Group>` tag flush against the
//! name; the Voobly rating service instead emits the literal `<Rating> `
//! prefix with a space before the name, so it gets its own case. Senders
//! that match no roster entry are kept: people who joined the multiplayer
//! lobby and left before the game started appear only in chat.

use serde::Serialize;

/// The Voobly rating prefix, space included.
const RATING_PREFIX: &str = "<Rating> ";

/// A single chat message sent before or during the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// When this message was sent, in milliseconds since game start.
    /// Pre-game messages are at time 0.
    pub time_ms: u32,

    /// Sender name, as embedded in the raw line. Empty if the line had no
    /// `Name: ` prefix.
    pub name: String,

    /// Message text with the name and group tag stripped.
    pub text: String,

    /// Directed-group tag including brackets (`<All>`, `<Team>`,
    /// `<Rating>`), or empty when undirected.
    pub group: String,
}

impl ChatMessage {
    /// Parses a raw chat line into its embedded parts.
    ///
    /// Lines without a `:` separator yield an empty sender name and the
    /// whole line as text.
    ///
    /// # Example
    ///
    /// ```
    /// use mgx_parser::chat::ChatMessage;
    ///
    /// let msg = ChatMessage::from_line(65_000, "<All>PlayerOne: gg wp");
    /// assert_eq!(msg.group, "<All>");
    /// assert_eq!(msg.name, "PlayerOne");
    /// assert_eq!(msg.text, "gg wp");
    /// assert_eq!(msg.time_ms, 65_000);
    /// ```
    #[must_use]
    pub fn from_line(time_ms: u32, line: &str) -> Self {
        let mut group = String::new();
        let mut rest = line;

        if rest.starts_with('<') {
            if let Some(stripped) = rest.strip_prefix(RATING_PREFIX) {
                group = RATING_PREFIX.trim_end().to_string();
                rest = stripped;
            } else if let Some(end) = rest.find('>') {
                group = rest[..=end].to_string();
                rest = &rest[end + 1..];
            }
        }

        let (name, text) = match rest.find(':') {
            Some(colon) => {
                let name = rest[..colon].trim_start();
                let text = rest[colon + 1..].trim_start();
                (name.to_string(), text.to_string())
            }
            None => (String::new(), rest.to_string()),
        };

        ChatMessage {
            time_ms,
            name,
            text,
            group,
        }
    }

    /// Returns whether this message was directed at a group.
    #[must_use]
    pub fn is_directed(&self) -> bool {
        !self.group.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directed_message() {
        let msg = ChatMessage::from_line(65_000, "<All>PlayerOne: gg wp");
        assert_eq!(msg.time_ms, 65_000);
        assert_eq!(msg.group, "<All>");
        assert_eq!(msg.name, "PlayerOne");
        assert_eq!(msg.text, "gg wp");
        assert!(msg.is_directed());
    }

    #[test]
    fn test_rating_message() {
        let msg = ChatMessage::from_line(0, "<Rating> PlayerTwo: hi");
        assert_eq!(msg.group, "<Rating>");
        assert_eq!(msg.name, "PlayerTwo");
        assert_eq!(msg.text, "hi");
    }

    #[test]
    fn test_undirected_message() {
        let msg = ChatMessage::from_line(1000, "PlayerThree: hello there");
        assert_eq!(msg.group, "");
        assert_eq!(msg.name, "PlayerThree");
        assert_eq!(msg.text, "hello there");
        assert!(!msg.is_directed());
    }

    #[test]
    fn test_no_colon() {
        let msg = ChatMessage::from_line(0, "a bare system line");
        assert_eq!(msg.name, "");
        assert_eq!(msg.text, "a bare system line");
        assert_eq!(msg.group, "");
    }

    #[test]
    fn test_team_group() {
        let msg = ChatMessage::from_line(42, "<Team>Ally: flank left");
        assert_eq!(msg.group, "<Team>");
        assert_eq!(msg.name, "Ally");
        assert_eq!(msg.text, "flank left");
    }

    #[test]
    fn test_unterminated_group_falls_through() {
        // No closing '>' means the '<' is just message text
        let msg = ChatMessage::from_line(0, "<oops no close: text");
        assert_eq!(msg.group, "");
        assert_eq!(msg.name, "<oops no close");
        assert_eq!(msg.text, "text");
    }

    #[test]
    fn test_colon_in_message_body() {
        let msg = ChatMessage::from_line(0, "<All>Name: see 10:30 on the map");
        assert_eq!(msg.name, "Name");
        assert_eq!(msg.text, "see 10:30 on the map");
    }

    #[test]
    fn test_non_ascii_name_and_text() {
        let msg = ChatMessage::from_line(0, "<All>玩家一: 你好");
        assert_eq!(msg.name, "玩家一");
        assert_eq!(msg.text, "你好");
    }

    #[test]
    fn test_empty_line() {
        let msg = ChatMessage::from_line(0, "");
        assert_eq!(msg.name, "");
        assert_eq!(msg.text, "");
        assert_eq!(msg.group, "");
    }
}
