pub mod compose;
pub mod message;
pub mod oauth;
pub mod prompt;
pub mod rehydrate;
pub mod sanitize;
pub mod session;

pub use compose::{InitialMessageComposer, InitialSource, InitialSourceKind, SessionInitContext};
pub use message::{Message, MessageIdGen, Role, SequentialIds, UuidIds};
pub use prompt::{BasePrompt, SystemPromptResolver};
pub use rehydrate::MemoryRehydrator;
pub use sanitize::sanitize_messages;
pub use session::{SessionInitializer, SessionStart};
