use crate::types::{AppError, ConversationTurn, Result};
use std::collections::VecDeque;

/// Rough token count used for the memory budget (4 chars ≈ 1 token).
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

fn turn_tokens(turn: &ConversationTurn) -> usize {
    estimate_tokens(&turn.query) + estimate_tokens(&turn.answer)
}

/// Bounded FIFO log of one session's turns.
///
/// Holds at most `max_turns` turns and, beyond the newest turn, at most
/// `max_tokens` estimated tokens. Oldest turns go first.
#[derive(Debug, Clone)]
pub struct MemoryBuffer {
    max_turns: usize,
    max_tokens: usize,
    turns: VecDeque<ConversationTurn>,
}

impl MemoryBuffer {
    /// A `max_tokens` of 0 disables the token bound.
    pub fn new(max_turns: usize, max_tokens: usize) -> Self {
        Self {
            max_turns: max_turns.max(1),
            max_tokens,
            turns: VecDeque::new(),
        }
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push_back(turn);
        self.trim_if_needed();
    }

    /// The most recent `n` turns, oldest first.
    pub fn recent(&self, n: usize) -> Vec<ConversationTurn> {
        let skip = self.turns.len().saturating_sub(n);
        self.turns.iter().skip(skip).cloned().collect()
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.back()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn estimated_tokens(&self) -> usize {
        self.turns.iter().map(turn_tokens).sum()
    }

    /// Serialize the turns for an application that wants to keep them.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.turns).map_err(|e| AppError::Internal(e.to_string()))
    }

    /// Restore turns written by [`to_json`](Self::to_json), applying this
    /// buffer's bounds.
    pub fn restore_json(&mut self, json: &str) -> Result<()> {
        let turns: Vec<ConversationTurn> = serde_json::from_str(json)
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;
        self.turns.clear();
        for turn in turns {
            self.push(turn);
        }
        Ok(())
    }

    fn trim_if_needed(&mut self) {
        while self.turns.len() > self.max_turns {
            self.turns.pop_front();
        }
        if self.max_tokens == 0 {
            return;
        }
        while self.estimated_tokens() > self.max_tokens && self.turns.len() > 1 {
            self.turns.pop_front();
        }
    }
}
