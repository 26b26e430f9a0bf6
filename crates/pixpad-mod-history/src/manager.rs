/// Undo/redo engine for one document.
///
/// Recorders are called right before the document changes and push a chunk
/// holding the pre-change state onto the undo stream. `do_undo`/`do_redo`
/// replay one whole group at a time, inverting each chunk onto the opposite
/// stream.
use std::sync::Arc;

use anyhow::Result;
use pixpad_core::{Dirty, Document, FlipOrientation, ObjectId, Rect};

use crate::actions::cel::{AddCel, RemoveCel};
use crate::actions::field::SetField;
use crate::actions::group::{Close, Open};
use crate::actions::image::{DirtyPatch, FlipImage, ImagePatch};
use crate::actions::layer::{AddLayer, MoveLayer, RemoveLayer, SetCurrentLayer, SetLayerName};
use crate::actions::mask::SetMask;
use crate::actions::palette::{AddPalette, RemapPalette, RemovePalette, SetPaletteColors};
use crate::actions::sprite::{
    SetCurrentFrame, SetFrameDuration, SetImageType, SetSpriteSize, SetTotalFrames,
};
use crate::actions::stock::{AddImage, RemoveImage, ReplaceImage};
use crate::actions::{self, Action, Field};
use crate::chunk::ChunkWriter;
use crate::config::HistoryConfig;
use crate::stream::UndoStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Undo,
    Redo,
}

impl Direction {
    fn name(self) -> &'static str {
        match self {
            Direction::Undo => "undo",
            Direction::Redo => "redo",
        }
    }
}

/// Manages undo/redo history for a single document.
///
/// The manager never gates recording itself: callers check
/// [`UndoManager::is_enabled`] before calling any `record_*` method.
pub struct UndoManager {
    undo: UndoStream,
    redo: UndoStream,
    /// Chunks applied minus chunks reverted.
    diff_count: i64,
    /// `diff_count` at the last save.
    diff_saved: i64,
    enabled: bool,
    /// Label given to newly pushed chunks.
    label: Option<Arc<str>>,
    retention_limit: usize,
}

impl std::fmt::Debug for UndoManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UndoManager")
            .field("undo_len", &self.undo.len())
            .field("redo_len", &self.redo.len())
            .field("undo_bytes", &self.undo.byte_size())
            .field("diff_count", &self.diff_count)
            .field("diff_saved", &self.diff_saved)
            .field("enabled", &self.enabled)
            .field("retention_limit", &self.retention_limit)
            .finish()
    }
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl UndoManager {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            undo: UndoStream::new(),
            redo: UndoStream::new(),
            diff_count: 0,
            diff_saved: 0,
            enabled: config.enabled,
            label: None,
            retention_limit: config.retention_limit,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Label recorded with the next chunks.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn set_label(&mut self, label: &str) {
        self.label = Some(Arc::from(label));
    }

    pub fn retention_limit(&self) -> usize {
        self.retention_limit
    }

    /// Changes the undo stream size limit. Takes effect at the next record.
    pub fn set_retention_limit(&mut self, bytes: usize) {
        self.retention_limit = bytes;
    }

    pub fn undo_stream(&self) -> &UndoStream {
        &self.undo
    }

    pub fn redo_stream(&self) -> &UndoStream {
        &self.redo
    }

    /// Bytes held by both streams.
    pub fn mem_size(&self) -> usize {
        self.undo.byte_size() + self.redo.byte_size()
    }

    fn record<A: Action>(&mut self, action: A) -> Result<()> {
        ChunkWriter::new(&mut self.undo, self.label.clone()).push(&action)?;
        self.update_history();
        Ok(())
    }

    /// Counts the new chunk, drops the redo branch once no group is open,
    /// and enforces the retention limit.
    fn update_history(&mut self) {
        self.diff_count += 1;

        if self.undo.is_balanced() && !self.redo.is_empty() {
            tracing::debug!("discarding {} redo chunks", self.redo.len());
            self.redo.clear();
        }

        while self.undo.complete_groups() > 1 && self.undo.byte_size() > self.retention_limit {
            let discarded = self.undo.discard_oldest_group();
            tracing::debug!(
                "retention limit {} exceeded, dropped oldest group ({discarded} chunks)",
                self.retention_limit
            );
            if discarded == 0 {
                break;
            }
        }
    }

    // -- Grouping --

    /// Starts a group labelled `label`.
    pub fn open(&mut self, label: &str) -> Result<()> {
        self.set_label(label);
        self.record(Open)
    }

    /// Ends the innermost open group. Without an open group this does
    /// nothing.
    pub fn close(&mut self) -> Result<()> {
        if self.undo.depth() <= 0 {
            tracing::warn!("close() called without a matching open()");
            return Ok(());
        }
        self.record(Close)
    }

    // -- Recorders --

    pub fn record_field(&mut self, doc: &Document, object: ObjectId, field: Field) -> Result<()> {
        self.record(SetField::capture(doc, object, field)?)
    }

    /// Snapshots `rect` of `image` before its pixels are overwritten.
    pub fn record_image_patch(
        &mut self,
        doc: &Document,
        image: ObjectId,
        rect: Rect,
    ) -> Result<()> {
        self.record(ImagePatch::capture(doc, image, rect)?)
    }

    pub fn record_flip(
        &mut self,
        doc: &Document,
        image: ObjectId,
        rect: Rect,
        orientation: FlipOrientation,
    ) -> Result<()> {
        self.record(FlipImage::capture(doc, image, rect, orientation)?)
    }

    /// Snapshots the pixels of `image` listed in `dirty` before `dirty` is
    /// written over them.
    pub fn record_dirty(&mut self, doc: &Document, image: ObjectId, dirty: &Dirty) -> Result<()> {
        self.record(DirtyPatch::capture(doc, image, dirty)?)
    }

    /// Records that stock slot `index` was just filled.
    pub fn record_add_image(&mut self, doc: &Document, index: usize) -> Result<()> {
        doc.stock_image(index)?;
        self.record(AddImage::capture(doc, index))
    }

    pub fn record_remove_image(&mut self, doc: &Document, index: usize) -> Result<()> {
        self.record(RemoveImage::capture(doc, index)?)
    }

    pub fn record_replace_image(&mut self, doc: &Document, index: usize) -> Result<()> {
        self.record(ReplaceImage::capture(doc, index)?)
    }

    /// Records that `cel` was just added to `layer`.
    pub fn record_add_cel(&mut self, doc: &Document, layer: ObjectId, cel: ObjectId) -> Result<()> {
        doc.layer(layer)?;
        doc.get::<pixpad_core::Cel>(cel)?;
        self.record(AddCel::capture(layer, cel))
    }

    pub fn record_remove_cel(
        &mut self,
        doc: &Document,
        layer: ObjectId,
        cel: ObjectId,
    ) -> Result<()> {
        self.record(RemoveCel::capture(doc, layer, cel)?)
    }

    /// Records that `layer` was just inserted into `parent`.
    pub fn record_add_layer(
        &mut self,
        doc: &Document,
        parent: ObjectId,
        layer: ObjectId,
    ) -> Result<()> {
        doc.layer(parent)?;
        doc.layer(layer)?;
        self.record(AddLayer::capture(parent, layer))
    }

    pub fn record_remove_layer(&mut self, doc: &Document, layer: ObjectId) -> Result<()> {
        self.record(RemoveLayer::capture(doc, layer)?)
    }

    pub fn record_move_layer(&mut self, doc: &Document, layer: ObjectId) -> Result<()> {
        self.record(MoveLayer::capture(doc, layer)?)
    }

    pub fn record_set_layer_name(&mut self, doc: &Document, layer: ObjectId) -> Result<()> {
        self.record(SetLayerName::capture(doc, layer)?)
    }

    pub fn record_set_current_layer(&mut self, doc: &Document) -> Result<()> {
        self.record(SetCurrentLayer::capture(doc))
    }

    /// Records that `palette` was just added to the sprite.
    pub fn record_add_palette(&mut self, doc: &Document, palette: ObjectId) -> Result<()> {
        doc.palette(palette)?;
        self.record(AddPalette::capture(doc, palette))
    }

    pub fn record_remove_palette(&mut self, doc: &Document, palette: ObjectId) -> Result<()> {
        self.record(RemovePalette::capture(doc, palette)?)
    }

    /// Snapshots palette entries `from..=to`.
    pub fn record_set_palette_colors(
        &mut self,
        doc: &Document,
        palette: ObjectId,
        from: usize,
        to: usize,
    ) -> Result<()> {
        self.record(SetPaletteColors::capture(doc, palette, from, to)?)
    }

    /// Records a permutation about to be applied to the indexed images of
    /// frames `from_frame..=to_frame`.
    pub fn record_remap_palette(
        &mut self,
        doc: &Document,
        from_frame: u32,
        to_frame: u32,
        mapping: &[u8],
    ) -> Result<()> {
        self.record(RemapPalette::capture(doc, from_frame, to_frame, mapping)?)
    }

    pub fn record_set_mask(&mut self, doc: &Document) -> Result<()> {
        self.record(SetMask::capture(doc)?)
    }

    pub fn record_set_image_type(&mut self, doc: &Document) -> Result<()> {
        self.record(SetImageType::capture(doc))
    }

    pub fn record_set_sprite_size(&mut self, doc: &Document) -> Result<()> {
        self.record(SetSpriteSize::capture(doc))
    }

    pub fn record_set_current_frame(&mut self, doc: &Document) -> Result<()> {
        self.record(SetCurrentFrame::capture(doc))
    }

    pub fn record_set_total_frames(&mut self, doc: &Document) -> Result<()> {
        self.record(SetTotalFrames::capture(doc))
    }

    pub fn record_set_frame_duration(&mut self, doc: &Document, frame: u32) -> Result<()> {
        self.record(SetFrameDuration::capture(doc, frame)?)
    }

    // -- Queries --

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn next_undo_label(&self) -> Option<&str> {
        self.undo.head().map(|c| c.label())
    }

    pub fn next_redo_label(&self) -> Option<&str> {
        self.redo.head().map(|c| c.label())
    }

    pub fn is_saved_state(&self) -> bool {
        self.diff_count == self.diff_saved
    }

    pub fn mark_saved_state(&mut self) {
        self.diff_saved = self.diff_count;
    }

    // -- Replay --

    /// Reverts the most recent group. Returns the number of chunks replayed
    /// (0 when there is nothing to undo).
    pub fn do_undo(&mut self, doc: &mut Document) -> usize {
        self.replay(doc, Direction::Undo)
    }

    /// Re-applies the most recently undone group. Returns the number of
    /// chunks replayed.
    pub fn do_redo(&mut self, doc: &mut Document) -> usize {
        self.replay(doc, Direction::Redo)
    }

    fn replay(&mut self, doc: &mut Document, direction: Direction) -> usize {
        let (source, target) = match direction {
            Direction::Undo => (&mut self.undo, &mut self.redo),
            Direction::Redo => (&mut self.redo, &mut self.undo),
        };

        let mut level = 0i64;
        let mut replayed = 0;
        while let Some(chunk) = source.pop_head() {
            replayed += 1;
            let label = chunk.shared_label();
            tracing::debug!(
                "{}: {} (label: {})",
                direction.name(),
                chunk.kind().name(),
                label
            );

            let mut out = ChunkWriter::new(target, Some(Arc::clone(&label)));
            if let Err(e) = actions::invert_chunk(&chunk, doc, &mut out) {
                tracing::warn!(
                    "Skipping {} chunk during {}: {e:#}",
                    chunk.kind().name(),
                    direction.name()
                );
            }
            self.label = Some(label);

            match direction {
                Direction::Undo => self.diff_count -= 1,
                Direction::Redo => self.diff_count += 1,
            }

            level += chunk.kind().nesting_delta();
            if level == 0 {
                break;
            }
        }
        replayed
    }

    /// Drops every redoable chunk.
    pub fn clear_redo(&mut self) {
        self.redo.clear();
    }

    /// Drops the whole history.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}
