/// JSON command scripts replayed against a sprite.
///
/// A script is a JSON array of objects tagged by `"op"`. Every editing
/// command runs inside its own [`UndoTransaction`], so each one becomes a
/// single undo step and a failing command leaves the sprite untouched.
use std::path::Path;

use anyhow::{Context, Result};
use pixpad_core::{rgba, Cel, Dirty, Document, FlipOrientation, ObjectId, Rect};
use pixpad_mod_history::{UndoManager, UndoTransaction};
use serde::Deserialize;

/// A color given either as a packed pixel value or as `#rrggbb` /
/// `#rrggbbaa`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Color {
    Packed(u32),
    Hex(String),
}

impl Color {
    /// The packed value written into images and palettes.
    pub fn value(&self) -> Result<u32> {
        match self {
            Color::Packed(value) => Ok(*value),
            Color::Hex(text) => {
                let hex = text
                    .strip_prefix('#')
                    .with_context(|| format!("color {text:?} must start with '#'"))?;
                if hex.len() != 6 && hex.len() != 8 {
                    anyhow::bail!("color {text:?} must be #rrggbb or #rrggbbaa");
                }
                let channel = |i: usize| {
                    hex.get(i..i + 2)
                        .and_then(|c| u8::from_str_radix(c, 16).ok())
                        .with_context(|| format!("invalid hex digits in color {text:?}"))
                };
                let alpha = if hex.len() == 8 { channel(6)? } else { 255 };
                Ok(rgba(channel(0)?, channel(2)?, channel(4)?, alpha))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Horizontal,
    Vertical,
    Both,
}

impl From<Axis> for FlipOrientation {
    fn from(axis: Axis) -> Self {
        match axis {
            Axis::Horizontal => FlipOrientation::Horizontal,
            Axis::Vertical => FlipOrientation::Vertical,
            Axis::Both => FlipOrientation::Both,
        }
    }
}

/// One script entry. Pixel commands draw on `layer` (by name, default: the
/// current layer) at `frame` (default: the current frame), with coordinates
/// in sprite space.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    NewLayer {
        name: String,
    },
    RemoveLayer {
        layer: String,
    },
    RenameLayer {
        layer: String,
        name: String,
    },
    NewFrame,
    RemoveFrame {
        frame: u32,
    },
    SetFrameDuration {
        frame: u32,
        duration: u32,
    },
    PutPixel {
        x: i32,
        y: i32,
        color: Color,
        #[serde(default)]
        layer: Option<String>,
        #[serde(default)]
        frame: Option<u32>,
    },
    FillRect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        color: Color,
        #[serde(default)]
        layer: Option<String>,
        #[serde(default)]
        frame: Option<u32>,
    },
    Flip {
        axis: Axis,
        #[serde(default)]
        layer: Option<String>,
        #[serde(default)]
        frame: Option<u32>,
    },
    SetPaletteColor {
        index: usize,
        color: Color,
    },
    Undo,
    Redo,
    MarkSaved,
}

impl Command {
    /// Undo label for editing commands; `None` for history commands.
    pub fn label(&self) -> Option<&'static str> {
        Some(match self {
            Command::NewLayer { .. } => "New Layer",
            Command::RemoveLayer { .. } => "Remove Layer",
            Command::RenameLayer { .. } => "Rename Layer",
            Command::NewFrame => "New Frame",
            Command::RemoveFrame { .. } => "Remove Frame",
            Command::SetFrameDuration { .. } => "Frame Duration",
            Command::PutPixel { .. } => "Pencil",
            Command::FillRect { .. } => "Fill Rectangle",
            Command::Flip { .. } => "Flip",
            Command::SetPaletteColor { .. } => "Palette Change",
            Command::Undo | Command::Redo | Command::MarkSaved => return None,
        })
    }
}

/// Reads a script file.
pub fn load(path: &Path) -> Result<Vec<Command>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    parse(&contents).with_context(|| format!("Failed to parse script {}", path.display()))
}

pub fn parse(json: &str) -> Result<Vec<Command>> {
    Ok(serde_json::from_str(json)?)
}

/// Counters gathered while running a script.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub applied: usize,
    pub undone: usize,
    pub redone: usize,
}

/// Runs `commands` in order, stopping at the first failing one.
pub fn run(
    commands: &[Command],
    doc: &mut Document,
    history: &mut UndoManager,
) -> Result<RunStats> {
    let mut stats = RunStats::default();
    for (i, command) in commands.iter().enumerate() {
        match command {
            Command::Undo => {
                if history.do_undo(doc) == 0 {
                    tracing::info!("Nothing to undo");
                } else {
                    stats.undone += 1;
                }
            }
            Command::Redo => {
                if history.do_redo(doc) == 0 {
                    tracing::info!("Nothing to redo");
                } else {
                    stats.redone += 1;
                }
            }
            Command::MarkSaved => history.mark_saved_state(),
            _ => {
                apply(command, doc, history)
                    .with_context(|| format!("command #{} failed", i + 1))?;
                stats.applied += 1;
            }
        }
    }
    Ok(stats)
}

fn apply(command: &Command, doc: &mut Document, history: &mut UndoManager) -> Result<()> {
    let label = command.label().unwrap_or("Command");
    let mut tx = UndoTransaction::new(doc, history, label)?;
    match command {
        Command::NewLayer { name } => {
            tx.new_layer(name)?;
        }
        Command::RemoveLayer { layer } => {
            let id = layer_by_name(tx.document(), layer)?;
            tx.remove_layer(id)?;
        }
        Command::RenameLayer { layer, name } => {
            let id = layer_by_name(tx.document(), layer)?;
            tx.rename_layer(id, name)?;
        }
        Command::NewFrame => tx.new_frame()?,
        Command::RemoveFrame { frame } => tx.remove_frame(*frame)?,
        Command::SetFrameDuration { frame, duration } => {
            if *frame >= tx.document().sprite().total_frames() {
                anyhow::bail!("frame {frame} does not exist");
            }
            tx.set_frame_duration(*frame, *duration)?;
        }
        Command::PutPixel {
            x,
            y,
            color,
            layer,
            frame,
        } => {
            let (image, cx, cy) = target_image(tx.document(), layer.as_deref(), *frame)?;
            let (px, py) = local_point(*x - cx, *y - cy)?;
            let mut dirty = Dirty::new(tx.document().image(image)?.format());
            dirty.put_pixel(px, py, color.value()?);
            tx.paint_dirty(image, &dirty)?;
        }
        Command::FillRect {
            x,
            y,
            width,
            height,
            color,
            layer,
            frame,
        } => {
            let (image, cx, cy) = target_image(tx.document(), layer.as_deref(), *frame)?;
            let (px, py) = local_point(*x - cx, *y - cy)?;
            let rect = Rect::new(px, py, *width, *height);
            let img = tx.document().image(image)?;
            let bpp = img.format().bytes_per_pixel();
            let value = color.value()?.to_le_bytes();
            let pixels: Vec<u8> = std::iter::repeat(&value[..bpp])
                .take(rect.area())
                .flatten()
                .copied()
                .collect();
            tx.patch_image(image, rect, &pixels)?;
        }
        Command::Flip { axis, layer, frame } => {
            let (image, _, _) = target_image(tx.document(), layer.as_deref(), *frame)?;
            let bounds = tx.document().image(image)?.bounds();
            tx.flip_image(image, bounds, (*axis).into())?;
        }
        Command::SetPaletteColor { index, color } => {
            let frame = tx.document().sprite().current_frame;
            let palette = tx
                .document()
                .palette_at(frame)
                .context("sprite has no palette")?;
            if *index >= pixpad_core::palette::PALETTE_SIZE {
                anyhow::bail!("palette index {index} out of range");
            }
            tx.set_palette_colors(palette, *index, &[color.value()?])?;
        }
        Command::Undo | Command::Redo | Command::MarkSaved => {}
    }
    tx.commit()
}

fn layer_by_name(doc: &Document, name: &str) -> Result<ObjectId> {
    doc.find_layer_by_name(name)?
        .with_context(|| format!("no layer named {name:?}"))
}

/// Resolves the image a pixel command draws on, with its cel's position.
fn target_image(
    doc: &Document,
    layer: Option<&str>,
    frame: Option<u32>,
) -> Result<(ObjectId, i32, i32)> {
    let layer = match layer {
        Some(name) => layer_by_name(doc, name)?,
        None => doc.sprite().current_layer.context("no current layer")?,
    };
    let name = &doc.layer(layer)?.name;
    if !doc.layer(layer)?.is_image() {
        anyhow::bail!("layer {name:?} is a folder");
    }
    let frame = frame.unwrap_or(doc.sprite().current_frame);
    let cel = doc
        .cel_at(layer, frame)
        .with_context(|| format!("layer {name:?} has no cel on frame {frame}"))?;
    let position = doc.get::<Cel>(cel)?;
    Ok((doc.cel_image(cel)?, position.x, position.y))
}

fn local_point(x: i32, y: i32) -> Result<(u32, u32)> {
    let px = u32::try_from(x).with_context(|| format!("x {x} is left of the cel"))?;
    let py = u32::try_from(y).with_context(|| format!("y {y} is above the cel"))?;
    Ok((px, py))
}

/// Multi-line summary of where the history stands.
pub fn history_summary(history: &UndoManager) -> String {
    let undo = history.undo_stream();
    let redo = history.redo_stream();
    format!(
        "next undo: {}\nnext redo: {}\n\
         undo stream: {} chunks, {} bytes\n\
         redo stream: {} chunks, {} bytes\n\
         saved: {}",
        history.next_undo_label().unwrap_or("-"),
        history.next_redo_label().unwrap_or("-"),
        undo.len(),
        undo.byte_size(),
        redo.len(),
        redo.byte_size(),
        if history.is_saved_state() { "yes" } else { "no" },
    )
}
