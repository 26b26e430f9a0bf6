use anyhow::Result;
use pixpad_core::Document;
use serde::{Deserialize, Serialize};

use super::Action;
use crate::chunk::{ChunkKind, ChunkWriter};

/// Start of a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Open;

/// End of a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Close;

impl Action for Open {
    const KIND: ChunkKind = ChunkKind::Open;

    fn invert(self, _doc: &mut Document, out: &mut ChunkWriter<'_>) -> Result<()> {
        out.push(&Close)
    }
}

impl Action for Close {
    const KIND: ChunkKind = ChunkKind::Close;

    fn invert(self, _doc: &mut Document, out: &mut ChunkWriter<'_>) -> Result<()> {
        out.push(&Open)
    }
}
