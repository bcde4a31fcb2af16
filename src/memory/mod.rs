//! Conversation memory.
//!
//! Each session owns a [`MemoryBuffer`]; [`SessionStore`] hands them out
//! by session id so concurrent users never share one.

pub mod buffer;
pub mod sessions;

pub use buffer::MemoryBuffer;
pub use sessions::{SessionMemory, SessionStore};

use crate::types::ConversationTurn;

/// Format turns oldest-first for inclusion in a prompt.
///
/// Returns an empty string when there are no turns.
pub fn format_turns_for_prompt(turns: &[ConversationTurn]) -> String {
    turns
        .iter()
        .map(|t| format!("User: {}\nAssistant: {}", t.query, t.answer))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_turns() {
        let turns = vec![
            ConversationTurn::new("Who is HOD?", "Dr. X"),
            ConversationTurn::new("Email?", "x@scet.ac.in"),
        ];
        assert_eq!(
            format_turns_for_prompt(&turns),
            "User: Who is HOD?\nAssistant: Dr. X\n\nUser: Email?\nAssistant: x@scet.ac.in"
        );
        assert_eq!(format_turns_for_prompt(&[]), "");
    }
}
