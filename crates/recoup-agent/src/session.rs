//! Session start: everything the model layer needs before the first turn.
//!
//! Runs once per inbound request, strictly in sequence:
//! compose initial messages, sanitize them, resolve the system prompt.

use std::sync::Arc;

use recoup_memory::{KnowledgeBase, MemoryStore, RoomDirectory};
use serde::Serialize;
use tracing::{info, instrument};

use crate::compose::{InitialMessageComposer, InitialSourceKind, SessionInitContext};
use crate::message::{Message, MessageIdGen};
use crate::prompt::{BasePrompt, SystemPromptResolver};
use crate::sanitize::sanitize_messages;

/// Hand-off to the model-invocation layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStart {
    pub system_prompt: String,
    pub messages: Vec<Message>,
    /// Which source supplied `messages`.
    pub source: InitialSourceKind,
}

pub struct SessionInitializer {
    composer: InitialMessageComposer,
    prompts: SystemPromptResolver,
}

impl SessionInitializer {
    pub fn new(composer: InitialMessageComposer, prompts: SystemPromptResolver) -> Self {
        Self { composer, prompts }
    }

    /// Wire the default source policy against one set of collaborators.
    pub fn with_collaborators(
        base: BasePrompt,
        memories: Arc<dyn MemoryStore>,
        rooms: Arc<dyn RoomDirectory>,
        knowledge: Arc<dyn KnowledgeBase>,
        ids: Arc<dyn MessageIdGen>,
    ) -> Self {
        Self::new(
            InitialMessageComposer::with_default_policy(memories, ids),
            SystemPromptResolver::new(base, rooms, knowledge),
        )
    }

    pub fn base_prompt(&self) -> &BasePrompt {
        self.prompts.base()
    }

    /// Always produces a usable result; collaborator failures only thin it out.
    #[instrument(skip_all, fields(room_id = ?ctx.room_id, artist_id = ?ctx.artist_id))]
    pub async fn start(&self, ctx: &SessionInitContext) -> SessionStart {
        let composed = self.composer.compose(ctx).await;
        let messages = sanitize_messages(composed.messages);
        let system_prompt = self
            .prompts
            .resolve(ctx.room_id.as_ref(), ctx.artist_id.as_ref())
            .await;

        info!(
            source = ?composed.source,
            messages = messages.len(),
            prompt_chars = system_prompt.len(),
            "session started"
        );

        SessionStart {
            system_prompt,
            messages,
            source: composed.source,
        }
    }
}
