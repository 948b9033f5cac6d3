//! Picks the message list a chat session starts with.
//!
//! Candidate sources are tried in a fixed priority order and the first one
//! that applies supplies the whole initial list. Sources are never merged.
//!
//! Default order:
//!   1. OAuth continuation (callback parameters from an authorization redirect)
//!   2. Free-text query string
//!   3. Stored memories of the room
//!   4. Nothing: a blank session

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use recoup_core::{ArtistId, RoomId};
use recoup_memory::MemoryStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::message::{Message, MessageIdGen};
use crate::oauth::Continuation;
use crate::rehydrate::MemoryRehydrator;

/// Everything known about a session at the moment it starts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInitContext {
    #[serde(default)]
    pub room_id: Option<RoomId>,
    #[serde(default)]
    pub artist_id: Option<ArtistId>,
    /// Free-text prompt handed in through the URL (`?q=...`).
    #[serde(default, alias = "q")]
    pub query: Option<String>,
    /// Parameters appended by an authorization callback.
    #[serde(default, alias = "oauth")]
    pub oauth_continuation: Option<HashMap<String, String>>,
}

impl SessionInitContext {
    pub fn for_room(room_id: impl Into<RoomId>) -> Self {
        Self {
            room_id: Some(room_id.into()),
            ..Self::default()
        }
    }

    pub fn with_artist(mut self, artist_id: impl Into<ArtistId>) -> Self {
        self.artist_id = Some(artist_id.into());
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_oauth(mut self, params: HashMap<String, String>) -> Self {
        self.oauth_continuation = Some(params);
        self
    }
}

/// Which source produced the initial messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialSourceKind {
    OauthContinuation,
    QueryString,
    StoredMemories,
    Blank,
}

/// One candidate source of initial messages.
///
/// `resolve` returns `None` when the source does not apply to this session,
/// which hands the decision to the next source in line. `Some(vec![])` is a
/// definitive (empty) answer.
#[async_trait]
pub trait InitialSource: Send + Sync {
    fn kind(&self) -> InitialSourceKind;
    async fn resolve(&self, ctx: &SessionInitContext) -> Option<Vec<Message>>;
}

pub struct OauthContinuationSource {
    ids: Arc<dyn MessageIdGen>,
}

impl OauthContinuationSource {
    pub fn new(ids: Arc<dyn MessageIdGen>) -> Self {
        Self { ids }
    }
}

#[async_trait]
impl InitialSource for OauthContinuationSource {
    fn kind(&self) -> InitialSourceKind {
        InitialSourceKind::OauthContinuation
    }

    async fn resolve(&self, ctx: &SessionInitContext) -> Option<Vec<Message>> {
        let continuation = Continuation::from_params(ctx.oauth_continuation.as_ref()?)?;
        Some(vec![continuation.into_message(self.ids.as_ref())])
    }
}

pub struct QueryStringSource {
    ids: Arc<dyn MessageIdGen>,
}

impl QueryStringSource {
    pub fn new(ids: Arc<dyn MessageIdGen>) -> Self {
        Self { ids }
    }
}

#[async_trait]
impl InitialSource for QueryStringSource {
    fn kind(&self) -> InitialSourceKind {
        InitialSourceKind::QueryString
    }

    async fn resolve(&self, ctx: &SessionInitContext) -> Option<Vec<Message>> {
        let query = ctx.query.as_deref().filter(|q| !q.trim().is_empty())?;
        Some(vec![Message::user(self.ids.next_id(), query)])
    }
}

pub struct StoredMemorySource {
    rehydrator: MemoryRehydrator,
}

impl StoredMemorySource {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self {
            rehydrator: MemoryRehydrator::new(store),
        }
    }
}

#[async_trait]
impl InitialSource for StoredMemorySource {
    fn kind(&self) -> InitialSourceKind {
        InitialSourceKind::StoredMemories
    }

    async fn resolve(&self, ctx: &SessionInitContext) -> Option<Vec<Message>> {
        let room_id = ctx.room_id.as_ref()?;
        Some(self.rehydrator.rehydrate(Some(room_id)).await)
    }
}

/// Result of composing: the chosen source and its messages.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub source: InitialSourceKind,
    pub messages: Vec<Message>,
}

/// First-match-wins policy over an ordered list of [`InitialSource`]s.
pub struct InitialMessageComposer {
    sources: Vec<Box<dyn InitialSource>>,
}

impl InitialMessageComposer {
    pub fn new(sources: Vec<Box<dyn InitialSource>>) -> Self {
        Self { sources }
    }

    /// OAuth continuation, then query string, then stored memories.
    pub fn with_default_policy(store: Arc<dyn MemoryStore>, ids: Arc<dyn MessageIdGen>) -> Self {
        Self::new(vec![
            Box::new(OauthContinuationSource::new(ids.clone())),
            Box::new(QueryStringSource::new(ids)),
            Box::new(StoredMemorySource::new(store)),
        ])
    }

    /// Source kinds in the order they are consulted.
    pub fn policy(&self) -> Vec<InitialSourceKind> {
        self.sources.iter().map(|s| s.kind()).collect()
    }

    #[instrument(skip_all, fields(room_id = ?ctx.room_id))]
    pub async fn compose(&self, ctx: &SessionInitContext) -> Composition {
        for source in &self.sources {
            if let Some(messages) = source.resolve(ctx).await {
                debug!(source = ?source.kind(), count = messages.len(), "initial messages chosen");
                return Composition {
                    source: source.kind(),
                    messages,
                };
            }
        }
        debug!("no initial message source applied, blank session");
        Composition {
            source: InitialSourceKind::Blank,
            messages: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Role, SequentialIds};
    use chrono::Utc;
    use recoup_core::Lookup;
    use recoup_memory::Memory;
    use serde_json::json;

    struct OneMemory;

    #[async_trait]
    impl MemoryStore for OneMemory {
        async fn fetch_memories(&self, room_id: &RoomId) -> Lookup<Vec<Memory>> {
            Lookup::Found(vec![Memory {
                id: "mem-1".into(),
                room_id: room_id.clone(),
                artist_id: None,
                content: json!({"id": "old", "role": "user", "content": "earlier turn"}),
                created_at: Utc::now(),
            }])
        }
    }

    fn composer() -> InitialMessageComposer {
        InitialMessageComposer::with_default_policy(
            Arc::new(OneMemory),
            Arc::new(SequentialIds::new("gen")),
        )
    }

    fn youtube_ok() -> HashMap<String, String> {
        HashMap::from([("youtube_auth".to_string(), "success".to_string())])
    }

    #[test]
    fn default_policy_order() {
        assert_eq!(
            composer().policy(),
            vec![
                InitialSourceKind::OauthContinuation,
                InitialSourceKind::QueryString,
                InitialSourceKind::StoredMemories,
            ]
        );
    }

    #[tokio::test]
    async fn oauth_beats_query_and_memories() {
        let ctx = SessionInitContext::for_room("r1")
            .with_query("Tell me about my fans")
            .with_oauth(youtube_ok());
        let out = composer().compose(&ctx).await;

        assert_eq!(out.source, InitialSourceKind::OauthContinuation);
        assert_eq!(out.messages.len(), 1);
        assert!(out.messages[0].content.contains("connected my YouTube account"));
    }

    #[tokio::test]
    async fn query_string_yields_single_user_message() {
        let ctx = SessionInitContext::default().with_query("Tell me about my fans");
        let out = composer().compose(&ctx).await;

        assert_eq!(out.source, InitialSourceKind::QueryString);
        assert_eq!(
            out.messages,
            vec![Message::new("gen-1", Role::User, "Tell me about my fans")]
        );
    }

    #[tokio::test]
    async fn blank_query_falls_through_to_memories() {
        let ctx = SessionInitContext::for_room("r1").with_query("   ");
        let out = composer().compose(&ctx).await;

        assert_eq!(out.source, InitialSourceKind::StoredMemories);
        assert_eq!(out.messages[0].content, "earlier turn");
    }

    #[tokio::test]
    async fn unrecognized_oauth_params_fall_through() {
        let params = HashMap::from([("state".to_string(), "xyz".to_string())]);
        let ctx = SessionInitContext::default()
            .with_oauth(params)
            .with_query("hi");
        let out = composer().compose(&ctx).await;
        assert_eq!(out.source, InitialSourceKind::QueryString);
    }

    #[tokio::test]
    async fn empty_oauth_error_falls_through_to_query() {
        let params = HashMap::from([("youtube_auth_error".to_string(), String::new())]);
        let ctx = SessionInitContext::for_room("r1")
            .with_oauth(params)
            .with_query("Tell me about my fans");
        let out = composer().compose(&ctx).await;

        assert_eq!(out.source, InitialSourceKind::QueryString);
        assert_eq!(out.messages[0].content, "Tell me about my fans");
    }

    #[tokio::test]
    async fn nothing_supplied_is_blank() {
        let out = composer().compose(&SessionInitContext::default()).await;
        assert_eq!(out.source, InitialSourceKind::Blank);
        assert!(out.messages.is_empty());
    }

    #[test]
    fn context_deserializes_from_camel_case() {
        let ctx: SessionInitContext = serde_json::from_value(json!({
            "roomId": "r1",
            "artistId": "a1",
            "q": "hello",
            "oauth": {"youtube_auth": "success"}
        }))
        .unwrap();
        assert_eq!(ctx.room_id, Some(RoomId::from("r1")));
        assert_eq!(ctx.artist_id, Some(ArtistId::from("a1")));
        assert_eq!(ctx.query.as_deref(), Some("hello"));
        assert!(ctx.oauth_continuation.is_some());
    }
}
