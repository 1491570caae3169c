//! Core types for the overlap kernel.

pub mod collection;
pub mod kind;
pub mod object;
pub mod variation;

pub use collection::{ObjectCollection, SubsetView};
pub use kind::{Kind, KindMap, VariationAxis};
pub use object::{DecorationError, ObjectRecord, ObjectRef};
pub use variation::VariationName;
