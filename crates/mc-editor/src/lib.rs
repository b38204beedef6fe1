pub mod clipboard;
pub mod commands;
pub mod sync;
pub mod tree;

pub use clipboard::ClipboardContent;
pub use commands::{CommandStack, DEFAULT_UNDO_DEPTH};
pub use sync::{Edit, EditOutcome, EngineConfig, SyncEngine};
pub use tree::{RowId, TreeProjection};
