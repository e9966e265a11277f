//! The sealed slot-value union.
//!
//! Generalizes the graph's resource typing to the set of GPU handles a
//! render-graph node can pass between stages: raw buffers/images, the
//! packed octree buffers, the material palette, acceleration
//! structures, and descriptor sets, plus the `Vec<T>`/`[T; N]`
//! container form of any of those. The outward `Registered`/`Sealed`
//! bound is a closed, sealed set the same way a tagged union would be
//! in a language with real sum types; a container's storage is type-
//! erased internally, but only ever holds a `T` that was already
//! sealed on its own, so a node still cannot smuggle an arbitrary type
//! through a slot.

use std::any::Any;

use crate::accel::{Blas, Tlas};
use crate::backend::{Buffer, Image};
use crate::shader::sdi::ShaderInterface;
use crate::svo::MaterialPalette;

/// Internal tagged storage for a slot's value. Never constructed
/// directly by node code; see [`Registered`].
///
/// `List` backs the container forms (`Vec<T>`, `[T; N]`) of any
/// individually-registered `T`; the outer `Registered`/`Sealed` bound
/// still only admits types this module already knows how to wrap, so
/// the type erasure here never lets a node smuggle an arbitrary type
/// through a slot.
pub enum Variant {
    Buffer(Buffer),
    Image(Image),
    MaterialPalette(MaterialPalette),
    Blas(Blas),
    Tlas(Tlas),
    ShaderInterface(ShaderInterface),
    List(Box<dyn Any + Send>),
}

impl std::fmt::Debug for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buffer(v) => f.debug_tuple("Buffer").field(v).finish(),
            Self::Image(v) => f.debug_tuple("Image").field(v).finish(),
            Self::MaterialPalette(v) => f.debug_tuple("MaterialPalette").field(v).finish(),
            Self::Blas(v) => f.debug_tuple("Blas").field(v).finish(),
            Self::Tlas(v) => f.debug_tuple("Tlas").field(v).finish(),
            Self::ShaderInterface(v) => f.debug_tuple("ShaderInterface").field(v).finish(),
            Self::List(_) => f.write_str("List(..)"),
        }
    }
}

/// A type that can be stored in and retrieved from a graph slot.
///
/// Sealed: the set of registrable types is closed to the ones this
/// crate defines. A node cannot smuggle an arbitrary type through a
/// slot; it can only exchange the GPU handles the graph already knows
/// how to barrier and recycle.
pub trait Registered: private::Sealed {}

impl<T: private::Sealed> Registered for T {}

mod private {
    use super::Variant;

    pub trait Sealed: Sized {
        fn upcast(self) -> Variant;
        fn downcast(value: &Variant) -> Option<&Self>;
        fn downcast_mut(value: &mut Variant) -> Option<&mut Self>;
    }
}

use private::Sealed;

macro_rules! impl_registered {
    ($ty:ty, $variant:ident) => {
        impl Sealed for $ty {
            fn upcast(self) -> Variant {
                Variant::$variant(self)
            }

            fn downcast(value: &Variant) -> Option<&Self> {
                match value {
                    Variant::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn downcast_mut(value: &mut Variant) -> Option<&mut Self> {
                match value {
                    Variant::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

impl_registered!(Buffer, Buffer);
impl_registered!(Image, Image);
impl_registered!(MaterialPalette, MaterialPalette);
impl_registered!(Blas, Blas);
impl_registered!(Tlas, Tlas);
impl_registered!(ShaderInterface, ShaderInterface);

/// Blanket: the container form of any registered `T` is registered
/// too, stored type-erased behind [`Variant::List`] and recovered by
/// `downcast`/`downcast_mut` on the concrete `Vec<T>`.
impl<T: Sealed + Send + 'static> Sealed for std::vec::Vec<T> {
    fn upcast(self) -> Variant {
        Variant::List(Box::new(self))
    }

    fn downcast(value: &Variant) -> Option<&Self> {
        match value {
            Variant::List(v) => v.downcast_ref::<Self>(),
            _ => None,
        }
    }

    fn downcast_mut(value: &mut Variant) -> Option<&mut Self> {
        match value {
            Variant::List(v) => v.downcast_mut::<Self>(),
            _ => None,
        }
    }
}

/// Blanket: same as the `Vec<T>` impl, for a fixed-size array of any
/// registered `T`.
impl<T: Sealed + Send + 'static, const N: usize> Sealed for [T; N] {
    fn upcast(self) -> Variant {
        Variant::List(Box::new(self))
    }

    fn downcast(value: &Variant) -> Option<&Self> {
        match value {
            Variant::List(v) => v.downcast_ref::<Self>(),
            _ => None,
        }
    }

    fn downcast_mut(value: &mut Variant) -> Option<&mut Self> {
        match value {
            Variant::List(v) => v.downcast_mut::<Self>(),
            _ => None,
        }
    }
}

pub(crate) fn upcast<T: Registered>(value: T) -> Variant {
    Sealed::upcast(value)
}

pub(crate) fn downcast<T: Registered>(value: &Variant) -> Option<&T> {
    Sealed::downcast(value)
}

pub(crate) fn downcast_mut<T: Registered>(value: &mut Variant) -> Option<&mut T> {
    Sealed::downcast_mut(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Buffer;

    #[test]
    fn a_vec_of_a_registered_type_round_trips() {
        let variant = upcast(vec![Buffer::null(), Buffer::null()]);
        let back = downcast::<std::vec::Vec<Buffer>>(&variant).unwrap();
        assert_eq!(back.len(), 2);
    }

    #[test]
    fn a_fixed_array_of_a_registered_type_round_trips() {
        let variant = upcast([Buffer::null(), Buffer::null(), Buffer::null()]);
        let back = downcast::<[Buffer; 3]>(&variant).unwrap();
        assert_eq!(back.len(), 3);
    }

    #[test]
    fn downcast_mut_sees_in_place_edits() {
        let mut variant = upcast(vec![Buffer::null()]);
        downcast_mut::<std::vec::Vec<Buffer>>(&mut variant)
            .unwrap()
            .push(Buffer::null());
        assert_eq!(downcast::<std::vec::Vec<Buffer>>(&variant).unwrap().len(), 2);
    }
}
