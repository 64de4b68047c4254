//! Type-tree driven field access for Unity serialized asset containers.
//!
//! Containers are parsed and written by [`rabex`]. This crate adds what a patcher
//! needs on top: checked access to object payloads, layout lookup through embedded
//! type trees or `rabex`'s bundled type tree database, and the mutable
//! [`FieldTree`] used to rewrite individual fields.
//!
//! # Example
//!
//! ```no_run
//! use unity_assets::{embedded_layouts, AssetFile};
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = AssetFile::open("sharedassets0.assets")?;
//! let layouts = embedded_layouts();
//!
//! let mut replacements = HashMap::new();
//! for object in file.objects().iter().filter(|o| o.class_id == 83) {
//!     let layout = Arc::new(file.layout_for(layouts.as_ref(), object.path_id)?);
//!     let mut tree = file.decode(layout, object.path_id)?;
//!     tree.set_int("m_LoadType", 1)?;
//!     replacements.insert(object.path_id, tree.to_bytes()?);
//! }
//! file.write_to("sharedassets0.assets", &replacements)?;
//! # Ok(())
//! # }
//! ```

pub mod asset_file;
pub mod endian;
pub mod error;
pub mod field;
pub mod layout;
pub mod typetree;

pub use asset_file::{AssetFile, ObjectEntry};
pub use endian::Endian;
pub use error::{Error, Result};
pub use field::{FieldId, FieldNode, FieldTree, FieldValue, Scalar};
pub use layout::{embedded_layouts, LayoutDatabase, StaticLayouts};
pub use rabex;
pub use typetree::{TypeTree, TypeTreeBuilder, TypeTreeNode};
