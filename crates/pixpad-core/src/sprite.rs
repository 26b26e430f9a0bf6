use crate::id::ObjectId;
use crate::image::PixelFormat;

/// Shortest frame duration, in milliseconds.
pub const MIN_FRAME_DURATION: u32 = 1;
/// Longest frame duration, in milliseconds.
pub const MAX_FRAME_DURATION: u32 = 65535;

/// Top-level animation: canvas size, frames, and the objects that make it up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    pub id: ObjectId,
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    /// Root folder layer.
    pub root: ObjectId,
    pub stock: ObjectId,
    pub mask: ObjectId,
    /// Palette IDs, sorted by starting frame.
    pub palettes: Vec<ObjectId>,
    pub current_frame: u32,
    pub current_layer: Option<ObjectId>,
    durations: Vec<u32>,
}

impl Sprite {
    /// Creates a one-frame sprite around already-registered parts.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ObjectId,
        format: PixelFormat,
        width: u32,
        height: u32,
        root: ObjectId,
        stock: ObjectId,
        mask: ObjectId,
        frame_duration: u32,
    ) -> Self {
        Self {
            id,
            format,
            width,
            height,
            root,
            stock,
            mask,
            palettes: Vec::new(),
            current_frame: 0,
            current_layer: None,
            durations: vec![frame_duration.clamp(MIN_FRAME_DURATION, MAX_FRAME_DURATION)],
        }
    }

    pub fn total_frames(&self) -> u32 {
        self.durations.len() as u32
    }

    /// Changes the frame count (at least 1). New frames copy the duration of
    /// the last existing frame.
    pub fn set_total_frames(&mut self, frames: u32) {
        let frames = frames.max(1) as usize;
        let last = self.durations.last().copied().unwrap_or(100);
        self.durations.resize(frames, last);
        if self.current_frame >= frames as u32 {
            self.current_frame = frames as u32 - 1;
        }
    }

    /// Duration of `frame` in milliseconds, 0 for frames out of range.
    pub fn frame_duration(&self, frame: u32) -> u32 {
        self.durations.get(frame as usize).copied().unwrap_or(0)
    }

    /// Sets the duration of `frame`, clamped to the valid range. Frames out
    /// of range are ignored.
    pub fn set_frame_duration(&mut self, frame: u32, duration: u32) {
        if let Some(slot) = self.durations.get_mut(frame as usize) {
            *slot = duration.clamp(MIN_FRAME_DURATION, MAX_FRAME_DURATION);
        }
    }

    pub fn durations(&self) -> &[u32] {
        &self.durations
    }
}
