/// Stable object identities and the registry that resolves them.
///
/// IDs are allocated monotonically per registry and never reused while the
/// registry lives. An object that is destroyed and later re-created from a
/// snapshot gets its original ID back through [`Registry::assign_id`].
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cel::Cel;
use crate::image::Image;
use crate::layer::Layer;
use crate::mask::Mask;
use crate::palette::Palette;
use crate::stock::Stock;

/// Process-local identifier of a live document object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(u32);

impl ObjectId {
    /// Returns the raw numeric value.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Any object that can be stored in a [`Registry`].
#[derive(Debug, Clone)]
pub enum Object {
    Layer(Layer),
    Cel(Cel),
    Image(Image),
    Stock(Stock),
    Palette(Palette),
    Mask(Mask),
}

impl Object {
    /// Human-readable kind name, used in log output.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Object::Layer(_) => "layer",
            Object::Cel(_) => "cel",
            Object::Image(_) => "image",
            Object::Stock(_) => "stock",
            Object::Palette(_) => "palette",
            Object::Mask(_) => "mask",
        }
    }
}

/// Typed access to registry entries.
pub trait Identified: Sized {
    fn from_object(object: &Object) -> Option<&Self>;
    fn from_object_mut(object: &mut Object) -> Option<&mut Self>;
    fn into_object(self) -> Object;
    fn try_from_object(object: Object) -> Option<Self>;
}

macro_rules! identified {
    ($($variant:ident),* $(,)?) => {
        $(
            impl Identified for $variant {
                fn from_object(object: &Object) -> Option<&Self> {
                    match object {
                        Object::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }

                fn from_object_mut(object: &mut Object) -> Option<&mut Self> {
                    match object {
                        Object::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }

                fn into_object(self) -> Object {
                    Object::$variant(self)
                }

                fn try_from_object(object: Object) -> Option<Self> {
                    match object {
                        Object::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            }
        )*
    };
}

identified!(Layer, Cel, Image, Stock, Palette, Mask);

/// Maps object IDs to the live objects of one document.
#[derive(Debug, Clone)]
pub struct Registry {
    next_id: u32,
    objects: HashMap<ObjectId, Object>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Creates an empty registry. The first allocated ID is 1.
    pub fn new() -> Self {
        Self {
            next_id: 1,
            objects: HashMap::new(),
        }
    }

    /// Allocates an ID without storing an object under it.
    ///
    /// Used for objects owned directly by the document (the sprite).
    pub fn reserve(&mut self) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Stores `object` under the next unused ID and returns that ID.
    pub fn register<T: Identified>(&mut self, object: T) -> ObjectId {
        let id = self.reserve();
        self.objects.insert(id, object.into_object());
        id
    }

    /// Stores `object` under a specific, previously issued ID.
    ///
    /// Returns whatever object was stored under `id` before, which is
    /// normally `None`.
    pub fn assign_id<T: Identified>(&mut self, id: ObjectId, object: T) -> Option<Object> {
        self.next_id = self.next_id.max(id.0 + 1);
        let object = object.into_object();
        tracing::debug!("re-creating {} {id}", object.kind_name());
        let previous = self.objects.insert(id, object);
        if let Some(old) = &previous {
            tracing::warn!("{} {id} replaced while still alive", old.kind_name());
        }
        previous
    }

    /// Removes the object registered under `id`.
    pub fn unregister(&mut self, id: ObjectId) -> Option<Object> {
        self.objects.remove(&id)
    }

    /// Removes and returns the object under `id` if it has type `T`.
    ///
    /// Objects of another type are left in place.
    pub fn take<T: Identified>(&mut self, id: ObjectId) -> Option<T> {
        if self.get::<T>(id).is_none() {
            return None;
        }
        self.objects.remove(&id).and_then(T::try_from_object)
    }

    /// Returns the live object under `id`, if any.
    pub fn find(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(&id)
    }

    /// Returns the object under `id` if it exists and has type `T`.
    pub fn get<T: Identified>(&self, id: ObjectId) -> Option<&T> {
        self.objects.get(&id).and_then(T::from_object)
    }

    /// Mutable counterpart of [`Registry::get`].
    pub fn get_mut<T: Identified>(&mut self, id: ObjectId) -> Option<&mut T> {
        self.objects.get_mut(&id).and_then(T::from_object_mut)
    }

    /// Whether an object is registered under `id`.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether no objects are registered.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::PixelFormat;

    #[test]
    fn test_register_assigns_monotonic_ids() {
        let mut reg = Registry::new();
        let a = reg.register(Cel::new(0, 0));
        let b = reg.register(Cel::new(1, 0));
        assert_eq!(a.get(), 1);
        assert_eq!(b.get(), 2);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_find_after_unregister_is_none() {
        let mut reg = Registry::new();
        let id = reg.register(Cel::new(0, 0));
        assert!(reg.find(id).is_some());
        assert!(reg.unregister(id).is_some());
        assert!(reg.find(id).is_none());
        assert!(reg.unregister(id).is_none());
    }

    #[test]
    fn test_ids_not_reused_after_unregister() {
        let mut reg = Registry::new();
        let a = reg.register(Cel::new(0, 0));
        reg.unregister(a);
        let b = reg.register(Cel::new(0, 0));
        assert_ne!(a, b);
    }

    #[test]
    fn test_assign_id_restores_original_identity() {
        let mut reg = Registry::new();
        let id = reg.register(Image::new(PixelFormat::Indexed, 2, 2));
        reg.unregister(id);

        reg.assign_id(id, Image::new(PixelFormat::Indexed, 2, 2));
        assert!(reg.get::<Image>(id).is_some());

        // Fresh IDs keep moving forward past the re-assigned one.
        let next = reg.register(Cel::new(0, 0));
        assert!(next > id);
    }

    #[test]
    fn test_typed_get_rejects_wrong_kind() {
        let mut reg = Registry::new();
        let id = reg.register(Cel::new(3, 1));
        assert!(reg.get::<Image>(id).is_none());
        assert_eq!(reg.get::<Cel>(id).map(|c| c.frame), Some(3));
        assert!(reg.take::<Image>(id).is_none());
        assert!(reg.contains(id));
        assert!(reg.take::<Cel>(id).is_some());
        assert!(!reg.contains(id));
    }

    #[test]
    fn test_reserve_does_not_store() {
        let mut reg = Registry::new();
        let id = reg.reserve();
        assert!(reg.find(id).is_none());
        assert!(reg.is_empty());
    }
}
