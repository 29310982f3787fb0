//! Shared Conversation Memory
//!
//! The turn history a session loop owns and hands to whichever agent
//! session is active. Cloning a [`SharedMemory`] clones the handle, not the
//! turns.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, RwLock};

use crate::message::{Message, Role};

#[derive(Clone, Debug, Default)]
pub struct SharedMemory {
    turns: Arc<RwLock<Vec<Message>>>,
    turn_lock: Arc<Mutex<()>>,
}

impl SharedMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed exchange
    pub async fn record_turn(&self, input: impl Into<String>, output: impl Into<String>) {
        let mut turns = self.turns.write().await;
        turns.push(Message::user(input));
        turns.push(Message::assistant(output));
    }

    /// Copy of all turns, oldest first
    pub async fn snapshot(&self) -> Vec<Message> {
        self.turns.read().await.clone()
    }

    /// Drop every turn. Sessions holding this handle stay valid.
    pub async fn clear(&self) {
        self.turns.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.turns.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.turns.read().await.is_empty()
    }

    /// Serialize turns: hold the guard for the whole invocation so two
    /// turns never interleave their writes.
    pub async fn begin_turn(&self) -> MutexGuard<'_, ()> {
        self.turn_lock.lock().await
    }

    /// Number of completed user turns
    pub async fn user_turns(&self) -> usize {
        self.turns
            .read()
            .await
            .iter()
            .filter(|m| m.role == Role::User)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_and_clear() {
        let memory = SharedMemory::new();
        memory.record_turn("What is 2+2?", "4").await;
        assert_eq!(memory.len().await, 2);
        assert_eq!(memory.user_turns().await, 1);

        memory.clear().await;
        assert!(memory.is_empty().await);
    }

    #[tokio::test]
    async fn test_handles_share_turns() {
        let memory = SharedMemory::new();
        let other = memory.clone();
        other.record_turn("hi", "hello").await;

        let turns = memory.snapshot().await;
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[1].content, "hello");
    }
}
