pub mod config;
pub mod error;
pub mod types;

pub use error::{RecoupError, Result};
pub use types::{ArtistId, Lookup, RoomId};
