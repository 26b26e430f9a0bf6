use crate::id::ObjectId;
use crate::image::PixelFormat;

/// Indexed collection of images shared by cels.
///
/// Slots hold image IDs; an empty slot (`None`) keeps the indices of the
/// following images stable after a removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stock {
    pub format: PixelFormat,
    images: Vec<Option<ObjectId>>,
}

impl Stock {
    pub fn new(format: PixelFormat) -> Self {
        Self {
            format,
            images: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<ObjectId> {
        self.images.get(index).copied().flatten()
    }

    /// Iterates over occupied slots as `(index, image id)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, ObjectId)> + '_ {
        self.images
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|id| (i, id)))
    }

    /// Appends an image and returns its index.
    pub fn push(&mut self, image: ObjectId) -> usize {
        self.images.push(Some(image));
        self.images.len() - 1
    }

    /// Stores `image` at `index`, growing the slot list if needed.
    /// Returns the previous occupant.
    pub fn set(&mut self, index: usize, image: Option<ObjectId>) -> Option<ObjectId> {
        if index >= self.images.len() {
            self.images.resize(index + 1, None);
        }
        std::mem::replace(&mut self.images[index], image)
    }

    /// Empties slot `index` and trims trailing empty slots.
    pub fn remove(&mut self, index: usize) -> Option<ObjectId> {
        let previous = self.images.get_mut(index).and_then(Option::take);
        while let Some(None) = self.images.last() {
            self.images.pop();
        }
        previous
    }
}
