pub mod db;
pub mod error;
pub mod knowledge;
pub mod manager;
pub mod store;
pub mod types;

pub use error::MemoryError;
pub use knowledge::KnowledgeRenderer;
pub use manager::MemoryManager;
pub use store::{KnowledgeBase, MemoryStore, RoomDirectory};
pub use types::{KnowledgeEntry, Memory, NewKnowledgeEntry, Room};
