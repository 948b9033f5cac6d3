//! Read contracts the session-start pipeline needs from its collaborators.
//!
//! Every read returns a [`Lookup`] so an implementation can report a failed
//! backend separately from an empty one. None of them return `Err`: the
//! pipeline is not allowed to fail because a collaborator did.

use async_trait::async_trait;
use recoup_core::{ArtistId, Lookup, RoomId};
use tracing::warn;

use crate::manager::MemoryManager;
use crate::types::Memory;

/// Stored chat turns of a room.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn fetch_memories(&self, room_id: &RoomId) -> Lookup<Vec<Memory>>;
}

/// Which artist a room belongs to.
#[async_trait]
pub trait RoomDirectory: Send + Sync {
    async fn resolve_artist_id(&self, room_id: &RoomId) -> Lookup<ArtistId>;
}

/// Rendered knowledge-base text for an artist.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    async fn fetch_knowledge_base(&self, artist_id: &ArtistId) -> Lookup<String>;
}

#[async_trait]
impl MemoryStore for MemoryManager {
    async fn fetch_memories(&self, room_id: &RoomId) -> Lookup<Vec<Memory>> {
        match self.list_memories(room_id) {
            Ok(memories) if memories.is_empty() => Lookup::NotFound,
            Ok(memories) => Lookup::Found(memories),
            Err(e) => {
                warn!(room_id = %room_id, error = %e, "failed to load memories");
                Lookup::Failed(e.to_string())
            }
        }
    }
}

#[async_trait]
impl RoomDirectory for MemoryManager {
    async fn resolve_artist_id(&self, room_id: &RoomId) -> Lookup<ArtistId> {
        match self.get_room(room_id) {
            Ok(room) => room.and_then(|r| r.artist_id).into(),
            Err(e) => {
                warn!(room_id = %room_id, error = %e, "failed to resolve artist for room");
                Lookup::Failed(e.to_string())
            }
        }
    }
}
