//! # celeste-shared
//!
//! Types and helpers shared by the Celeste store and server crates: the
//! secret codec used to keep the user's API key out of plain sight, the chat
//! message model, and project-wide constants.

pub mod constants;
pub mod crypto;
pub mod error;
pub mod types;

pub use crypto::SecretCodec;
pub use error::CryptoError;
pub use types::{ChatMessage, Role};
