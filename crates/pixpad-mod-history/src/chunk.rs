/// Self-describing history records.
///
/// A chunk is a kind tag, a label, and a bincode-encoded payload holding the
/// pre-mutation state of whatever the kind describes.
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::actions::Action;
use crate::stream::UndoStream;

/// Bytes accounted per chunk on top of its payload.
pub const CHUNK_HEADER_SIZE: usize = 16;

/// Every recordable operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChunkKind {
    Open,
    Close,
    Field,
    Image,
    Flip,
    Dirty,
    AddImage,
    RemoveImage,
    ReplaceImage,
    AddCel,
    RemoveCel,
    AddLayer,
    RemoveLayer,
    MoveLayer,
    SetLayerName,
    SetCurrentLayer,
    AddPalette,
    RemovePalette,
    SetPaletteColors,
    RemapPalette,
    SetMask,
    SetImageType,
    SetSpriteSize,
    SetCurrentFrame,
    SetTotalFrames,
    SetFrameDuration,
}

impl ChunkKind {
    pub fn name(self) -> &'static str {
        match self {
            ChunkKind::Open => "open",
            ChunkKind::Close => "close",
            ChunkKind::Field => "field",
            ChunkKind::Image => "image",
            ChunkKind::Flip => "flip",
            ChunkKind::Dirty => "dirty",
            ChunkKind::AddImage => "add_image",
            ChunkKind::RemoveImage => "remove_image",
            ChunkKind::ReplaceImage => "replace_image",
            ChunkKind::AddCel => "add_cel",
            ChunkKind::RemoveCel => "remove_cel",
            ChunkKind::AddLayer => "add_layer",
            ChunkKind::RemoveLayer => "remove_layer",
            ChunkKind::MoveLayer => "move_layer",
            ChunkKind::SetLayerName => "set_layer_name",
            ChunkKind::SetCurrentLayer => "set_current_layer",
            ChunkKind::AddPalette => "add_palette",
            ChunkKind::RemovePalette => "remove_palette",
            ChunkKind::SetPaletteColors => "set_palette_colors",
            ChunkKind::RemapPalette => "remap_palette",
            ChunkKind::SetMask => "set_mask",
            ChunkKind::SetImageType => "set_image_type",
            ChunkKind::SetSpriteSize => "set_sprite_size",
            ChunkKind::SetCurrentFrame => "set_current_frame",
            ChunkKind::SetTotalFrames => "set_total_frames",
            ChunkKind::SetFrameDuration => "set_frame_duration",
        }
    }

    /// Change in group nesting caused by a chunk of this kind.
    pub fn nesting_delta(self) -> i64 {
        match self {
            ChunkKind::Open => 1,
            ChunkKind::Close => -1,
            _ => 0,
        }
    }
}

/// One recorded, reversible micro-operation.
#[derive(Debug, Clone)]
pub struct Chunk {
    kind: ChunkKind,
    label: Arc<str>,
    data: Vec<u8>,
}

impl Chunk {
    /// Encodes `action` as a chunk of its kind.
    pub(crate) fn encode<A: Action>(label: Arc<str>, action: &A) -> Result<Self> {
        let data = bincode::serialize(action)
            .with_context(|| format!("Failed to encode {} chunk", A::KIND.name()))?;
        Ok(Self {
            kind: A::KIND,
            label,
            data,
        })
    }

    /// Decodes the payload as action `A`.
    pub(crate) fn decode<A: Action>(&self) -> Result<A> {
        if self.kind != A::KIND {
            anyhow::bail!(
                "chunk is {} but was decoded as {}",
                self.kind.name(),
                A::KIND.name()
            );
        }
        bincode::deserialize(&self.data)
            .with_context(|| format!("Failed to decode {} chunk", self.kind.name()))
    }

    pub fn kind(&self) -> ChunkKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn shared_label(&self) -> Arc<str> {
        Arc::clone(&self.label)
    }

    /// Header plus encoded payload length.
    pub fn byte_size(&self) -> usize {
        CHUNK_HEADER_SIZE + self.data.len()
    }
}

/// Pushes chunks onto one stream under one label.
pub(crate) struct ChunkWriter<'a> {
    stream: &'a mut UndoStream,
    label: Option<Arc<str>>,
}

impl<'a> ChunkWriter<'a> {
    pub(crate) fn new(stream: &'a mut UndoStream, label: Option<Arc<str>>) -> Self {
        Self { stream, label }
    }

    /// Encodes and pushes `action`. Without a label the kind's name is used.
    pub(crate) fn push<A: Action>(&mut self, action: &A) -> Result<()> {
        let label = self
            .label
            .clone()
            .unwrap_or_else(|| Arc::from(A::KIND.name()));
        let chunk = Chunk::encode(label, action)?;
        self.stream.push(chunk);
        Ok(())
    }
}
