/// Chat export model, loading, indexing and re-export
pub mod export;
pub mod index;
pub mod loader;
pub mod model;

pub use export::{to_ndjson, write_chat_slice};
pub use index::{ChatTimeIndex, ScrubWindow};
pub use loader::{extract_tip_amount, ChatLoader, LoadOptions, LoadedChat, TimestampUnit};
pub use model::{format_time_text, Author, ChatMessage, MessagePayload, TierInfo};
