/// Document model for the pixpad sprite editor.
///
/// Every mutable entity (layers, cels, images, the image stock, palettes and
/// the selection mask) lives in a per-document [`Registry`] and is referenced
/// by a stable [`ObjectId`] instead of by address, so the undo engine can
/// destroy and re-create objects without leaving dangling references.
pub mod cel;
pub mod dirty;
pub mod document;
pub mod id;
pub mod image;
pub mod layer;
pub mod mask;
pub mod palette;
pub mod sprite;
pub mod stock;

pub use cel::Cel;
pub use dirty::{Dirty, DirtyRow, DirtyRun};
pub use document::Document;
pub use id::{Identified, Object, ObjectId, Registry};
pub use image::{FlipOrientation, Image, PixelFormat, Rect};
pub use layer::{Layer, LayerKind};
pub use mask::Mask;
pub use palette::{rgba, Palette};
pub use sprite::Sprite;
pub use stock::Stock;
