pub mod error;
pub mod health;
pub mod memories;
pub mod session;
