//! Class layouts for decoding objects.
//!
//! A container either embeds the type tree of every class it stores or relies on
//! the reader to know them. `rabex` resolves both cases: the embedded tree first,
//! then a [`TypeTreeProvider`] keyed by class id and the container's Unity version.
//! [`LayoutDatabase`] puts an object-safe face on that lookup so a session can hold
//! any provider behind an `Arc`.

use crate::error::{Error, Result};
use crate::typetree::TypeTree;
use rabex::files::SerializedFile;
use rabex::objects::ClassId;
use rabex::typetree::typetree_cache::sync::TypeTreeCache;
use rabex::typetree::{TypeTreeNode as RawNode, TypeTreeProvider};
use rabex::UnityVersion;
use std::borrow::Cow;
use std::sync::Arc;

/// Source of class layouts for the objects of a container.
pub trait LayoutDatabase: Send + Sync {
    /// The layout of object `path_id`: embedded type tree first, then this database.
    fn layout_for(&self, file: &SerializedFile, path_id: i64) -> Result<TypeTree>;
}

impl<P: TypeTreeProvider + Send + Sync> LayoutDatabase for P {
    fn layout_for(&self, file: &SerializedFile, path_id: i64) -> Result<TypeTree> {
        let object = file
            .objects()
            .find(|o| o.m_PathID == path_id)
            .ok_or(Error::ObjectNotFound(path_id))?;
        let node = file
            .get_typetree_for(object, self)
            .map_err(|e| Error::MissingLayout {
                unity_version: file
                    .m_UnityVersion
                    .as_ref()
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
                class: format!("{:?}", object.m_ClassID),
                reason: e.to_string(),
            })?;
        TypeTree::from_node(&node)
    }
}

/// The type tree database bundled with `rabex`, covering released Unity versions.
pub fn embedded_layouts() -> Arc<dyn LayoutDatabase> {
    Arc::new(TypeTreeCache::embedded())
}

/// Layouts registered in code, regardless of Unity version.
///
/// Empty by default, in which case only embedded type trees resolve.
#[derive(Debug, Clone, Default)]
pub struct StaticLayouts {
    layouts: Vec<(ClassId, RawNode)>,
}

impl StaticLayouts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, class: ClassId, layout: &TypeTree) -> Self {
        self.layouts.retain(|(c, _)| *c != class);
        self.layouts.push((class, layout.to_node()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}

impl TypeTreeProvider for StaticLayouts {
    fn get_typetree_node(
        &self,
        class_id: ClassId,
        _target_version: UnityVersion,
    ) -> Option<Cow<'_, RawNode>> {
        self.layouts
            .iter()
            .find(|(class, _)| *class == class_id)
            .map(|(_, node)| Cow::Borrowed(node))
    }
}
