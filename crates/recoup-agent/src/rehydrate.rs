use std::sync::Arc;

use recoup_core::{Lookup, RoomId};
use recoup_memory::{Memory, MemoryStore};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::message::{Message, Role};

/// Turns a room's stored memories back into conversation messages.
pub struct MemoryRehydrator {
    store: Arc<dyn MemoryStore>,
}

impl MemoryRehydrator {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }

    /// Messages of a room, oldest first. No room, no memories and a failed
    /// fetch all produce an empty list.
    pub async fn rehydrate(&self, room_id: Option<&RoomId>) -> Vec<Message> {
        match room_id {
            Some(room_id) => self
                .rehydrate_lookup(room_id)
                .await
                .found("memories")
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// Like [`rehydrate`](Self::rehydrate) but keeps a failed fetch visible.
    #[instrument(skip(self), fields(room_id = %room_id))]
    pub async fn rehydrate_lookup(&self, room_id: &RoomId) -> Lookup<Vec<Message>> {
        self.store.fetch_memories(room_id).await.map(|mut memories| {
            // storage may hand rows back in any order
            memories.sort_by_key(|m| m.created_at);
            let messages: Vec<Message> = memories.iter().map(message_from_memory).collect();
            debug!(count = messages.len(), "rehydrated memories");
            messages
        })
    }
}

/// Unwrap a memory's stored envelope into a [`Message`].
///
/// The envelope is expected to already be message-shaped. Missing pieces are
/// filled in rather than dropping the row: the memory id stands in for a
/// missing message id, an unknown role becomes `user`, non-string content is
/// kept as its JSON text. Remaining envelope fields go to `metadata`.
pub fn message_from_memory(memory: &Memory) -> Message {
    let Value::Object(envelope) = &memory.content else {
        return Message::user(memory.id.clone(), value_text(&memory.content));
    };

    let mut extra = envelope.clone();
    let id = extra
        .remove("id")
        .and_then(|v| v.as_str().map(String::from))
        .unwrap_or_else(|| memory.id.clone());
    let role = extra
        .remove("role")
        .and_then(|v| v.as_str().and_then(|s| s.parse::<Role>().ok()))
        .unwrap_or(Role::User);
    let content = extra
        .remove("content")
        .map(|v| value_text(&v))
        .unwrap_or_default();

    Message {
        id,
        role,
        content,
        metadata: (!extra.is_empty()).then_some(Value::Object(extra)),
    }
}

fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
