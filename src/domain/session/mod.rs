//! Conversation state owned by the calling layer

mod context;

pub use context::{SessionContext, DEFAULT_MAX_HISTORY};
