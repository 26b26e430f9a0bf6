//! Recordable operations.
//!
//! Every chunk kind has one payload type implementing [`Action`]. A payload
//! is built by a `capture` constructor *before* the document changes, and
//! restored by [`Action::invert`], which first pushes a payload describing
//! the current state onto the opposite stream and then applies its own.
//! Undo and redo therefore run the same code with the streams swapped.

pub(crate) mod cel;
pub(crate) mod field;
pub(crate) mod group;
pub(crate) mod image;
pub(crate) mod layer;
pub(crate) mod mask;
pub(crate) mod palette;
pub(crate) mod snapshot;
pub(crate) mod sprite;
pub(crate) mod stock;

use anyhow::Result;
use pixpad_core::Document;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::chunk::{Chunk, ChunkKind, ChunkWriter};

pub use field::{Field, FieldPatch};

pub(crate) trait Action: Serialize + DeserializeOwned {
    const KIND: ChunkKind;

    /// Pushes the mirror of this action onto `out`, then restores the state
    /// this action captured. Unresolved object IDs make this a no-op.
    fn invert(self, doc: &mut Document, out: &mut ChunkWriter<'_>) -> Result<()>;
}

fn replay<A: Action>(chunk: &Chunk, doc: &mut Document, out: &mut ChunkWriter<'_>) -> Result<()> {
    chunk.decode::<A>()?.invert(doc, out)
}

/// Decodes `chunk` and inverts it onto `out`.
pub(crate) fn invert_chunk(
    chunk: &Chunk,
    doc: &mut Document,
    out: &mut ChunkWriter<'_>,
) -> Result<()> {
    match chunk.kind() {
        ChunkKind::Open => replay::<group::Open>(chunk, doc, out),
        ChunkKind::Close => replay::<group::Close>(chunk, doc, out),
        ChunkKind::Field => replay::<field::SetField>(chunk, doc, out),
        ChunkKind::Image => replay::<image::ImagePatch>(chunk, doc, out),
        ChunkKind::Flip => replay::<image::FlipImage>(chunk, doc, out),
        ChunkKind::Dirty => replay::<image::DirtyPatch>(chunk, doc, out),
        ChunkKind::AddImage => replay::<stock::AddImage>(chunk, doc, out),
        ChunkKind::RemoveImage => replay::<stock::RemoveImage>(chunk, doc, out),
        ChunkKind::ReplaceImage => replay::<stock::ReplaceImage>(chunk, doc, out),
        ChunkKind::AddCel => replay::<cel::AddCel>(chunk, doc, out),
        ChunkKind::RemoveCel => replay::<cel::RemoveCel>(chunk, doc, out),
        ChunkKind::AddLayer => replay::<layer::AddLayer>(chunk, doc, out),
        ChunkKind::RemoveLayer => replay::<layer::RemoveLayer>(chunk, doc, out),
        ChunkKind::MoveLayer => replay::<layer::MoveLayer>(chunk, doc, out),
        ChunkKind::SetLayerName => replay::<layer::SetLayerName>(chunk, doc, out),
        ChunkKind::SetCurrentLayer => replay::<layer::SetCurrentLayer>(chunk, doc, out),
        ChunkKind::AddPalette => replay::<palette::AddPalette>(chunk, doc, out),
        ChunkKind::RemovePalette => replay::<palette::RemovePalette>(chunk, doc, out),
        ChunkKind::SetPaletteColors => replay::<palette::SetPaletteColors>(chunk, doc, out),
        ChunkKind::RemapPalette => replay::<palette::RemapPalette>(chunk, doc, out),
        ChunkKind::SetMask => replay::<mask::SetMask>(chunk, doc, out),
        ChunkKind::SetImageType => replay::<sprite::SetImageType>(chunk, doc, out),
        ChunkKind::SetSpriteSize => replay::<sprite::SetSpriteSize>(chunk, doc, out),
        ChunkKind::SetCurrentFrame => replay::<sprite::SetCurrentFrame>(chunk, doc, out),
        ChunkKind::SetTotalFrames => replay::<sprite::SetTotalFrames>(chunk, doc, out),
        ChunkKind::SetFrameDuration => replay::<sprite::SetFrameDuration>(chunk, doc, out),
    }
}
