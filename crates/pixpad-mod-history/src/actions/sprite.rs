use anyhow::Result;
use pixpad_core::{Document, ObjectId, PixelFormat};
use serde::{Deserialize, Serialize};

use super::Action;
use crate::chunk::{ChunkKind, ChunkWriter};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SetImageType {
    sprite: ObjectId,
    format: PixelFormat,
}

impl SetImageType {
    pub(crate) fn capture(doc: &Document) -> Self {
        Self {
            sprite: doc.sprite().id,
            format: doc.sprite().format,
        }
    }
}

impl Action for SetImageType {
    const KIND: ChunkKind = ChunkKind::SetImageType;

    fn invert(self, doc: &mut Document, out: &mut ChunkWriter<'_>) -> Result<()> {
        let Some(sprite) = doc.find_sprite_mut(self.sprite) else {
            return Ok(());
        };
        out.push(&SetImageType {
            sprite: self.sprite,
            format: sprite.format,
        })?;
        sprite.format = self.format;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SetSpriteSize {
    sprite: ObjectId,
    width: u32,
    height: u32,
}

impl SetSpriteSize {
    pub(crate) fn capture(doc: &Document) -> Self {
        Self {
            sprite: doc.sprite().id,
            width: doc.sprite().width,
            height: doc.sprite().height,
        }
    }
}

impl Action for SetSpriteSize {
    const KIND: ChunkKind = ChunkKind::SetSpriteSize;

    fn invert(self, doc: &mut Document, out: &mut ChunkWriter<'_>) -> Result<()> {
        let Some(sprite) = doc.find_sprite_mut(self.sprite) else {
            return Ok(());
        };
        out.push(&SetSpriteSize {
            sprite: self.sprite,
            width: sprite.width,
            height: sprite.height,
        })?;
        sprite.width = self.width;
        sprite.height = self.height;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SetCurrentFrame {
    sprite: ObjectId,
    frame: u32,
}

impl SetCurrentFrame {
    pub(crate) fn capture(doc: &Document) -> Self {
        Self {
            sprite: doc.sprite().id,
            frame: doc.sprite().current_frame,
        }
    }
}

impl Action for SetCurrentFrame {
    const KIND: ChunkKind = ChunkKind::SetCurrentFrame;

    fn invert(self, doc: &mut Document, out: &mut ChunkWriter<'_>) -> Result<()> {
        let Some(sprite) = doc.find_sprite_mut(self.sprite) else {
            return Ok(());
        };
        out.push(&SetCurrentFrame {
            sprite: self.sprite,
            frame: sprite.current_frame,
        })?;
        sprite.current_frame = self.frame;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SetTotalFrames {
    sprite: ObjectId,
    frames: u32,
}

impl SetTotalFrames {
    pub(crate) fn capture(doc: &Document) -> Self {
        Self {
            sprite: doc.sprite().id,
            frames: doc.sprite().total_frames(),
        }
    }
}

impl Action for SetTotalFrames {
    const KIND: ChunkKind = ChunkKind::SetTotalFrames;

    fn invert(self, doc: &mut Document, out: &mut ChunkWriter<'_>) -> Result<()> {
        let Some(sprite) = doc.find_sprite_mut(self.sprite) else {
            return Ok(());
        };
        out.push(&SetTotalFrames {
            sprite: self.sprite,
            frames: sprite.total_frames(),
        })?;
        sprite.set_total_frames(self.frames);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SetFrameDuration {
    sprite: ObjectId,
    frame: u32,
    duration: u32,
}

impl SetFrameDuration {
    pub(crate) fn capture(doc: &Document, frame: u32) -> Result<Self> {
        if frame >= doc.sprite().total_frames() {
            anyhow::bail!(
                "frame {frame} out of range (sprite has {} frames)",
                doc.sprite().total_frames()
            );
        }
        Ok(Self {
            sprite: doc.sprite().id,
            frame,
            duration: doc.sprite().frame_duration(frame),
        })
    }
}

impl Action for SetFrameDuration {
    const KIND: ChunkKind = ChunkKind::SetFrameDuration;

    fn invert(self, doc: &mut Document, out: &mut ChunkWriter<'_>) -> Result<()> {
        let Some(sprite) = doc.find_sprite_mut(self.sprite) else {
            return Ok(());
        };
        if self.frame >= sprite.total_frames() {
            return Ok(());
        }
        out.push(&SetFrameDuration {
            sprite: self.sprite,
            frame: self.frame,
            duration: sprite.frame_duration(self.frame),
        })?;
        sprite.set_frame_duration(self.frame, self.duration);
        Ok(())
    }
}
