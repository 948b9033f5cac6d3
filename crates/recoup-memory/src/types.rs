use chrono::{DateTime, Utc};
use recoup_core::{ArtistId, RoomId};
use serde::{Deserialize, Serialize};

/// A stored chat turn.
///
/// `content` is the message envelope (`{id, role, content, ...}`) written by
/// the chat layer. Rows are never updated after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub room_id: RoomId,
    pub artist_id: Option<ArtistId>,
    pub content: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// A conversation thread, optionally tied to one artist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub account_id: Option<String>,
    pub artist_id: Option<ArtistId>,
    pub topic: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Room {
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            account_id: None,
            artist_id: None,
            topic: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_artist(mut self, artist_id: ArtistId) -> Self {
        self.artist_id = Some(artist_id);
        self
    }
}

/// One knowledge file attached to an artist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: i64,
    pub artist_id: ArtistId,
    /// Display name, used as the section header in the prompt.
    pub name: String,
    pub mime_type: String,
    pub url: Option<String>,
    /// Inline body. Takes precedence over `url` when present.
    pub content: Option<String>,
    pub created_at: String,
}

/// Insert payload for [`KnowledgeEntry`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewKnowledgeEntry {
    pub artist_id: ArtistId,
    pub name: String,
    pub mime_type: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}
