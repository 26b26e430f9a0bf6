/// Undo/redo history for pixpad documents.
///
/// Provides an `UndoManager` that records every document change as a
/// serialized chunk on an undo stream, groups chunks into user-visible steps,
/// and replays whole groups onto the opposite stream. `UndoTransaction` wraps
/// the composite editing commands and rolls them back when they are not
/// committed.
mod actions;
pub mod chunk;
pub mod config;
pub mod manager;
pub mod stream;
pub mod transaction;

pub use actions::{Field, FieldPatch};
pub use chunk::{Chunk, ChunkKind};
pub use config::HistoryConfig;
pub use manager::UndoManager;
pub use stream::UndoStream;
pub use transaction::UndoTransaction;
