//! Type trees: the per-class field layouts that drive object decoding.
//!
//! [`TypeTree`] keeps a flat, depth-first list of nodes where each node's `level`
//! encodes its depth, and precomputes child indices for traversal. Layouts come
//! from `rabex` (embedded in the container or from its type tree cache) and are
//! converted with [`TypeTree::from_node`].

use crate::error::{Error, Result};
use rabex::typetree::TypeTreeNode as RawNode;

/// `meta_flag` bit requesting 4-byte alignment after the node's value.
pub const META_FLAG_ALIGN: i32 = 0x4000;

/// `type_flags` bit marking the `Array` node of a vector-like field.
pub const TYPE_FLAG_ARRAY: u8 = 0x01;

/// One field in a type tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeTreeNode {
    pub version: u16,
    pub level: u8,
    pub type_flags: u8,
    pub type_name: String,
    pub name: String,
    pub byte_size: i32,
    pub meta_flag: i32,
}

impl TypeTreeNode {
    pub fn new(level: u8, type_name: impl Into<String>, name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        Self {
            version: 1,
            level,
            type_flags: 0,
            byte_size: primitive_size(&type_name).map(|s| s as i32).unwrap_or(-1),
            type_name,
            name: name.into(),
            meta_flag: 0,
        }
    }

    pub fn is_array(&self) -> bool {
        self.type_flags & TYPE_FLAG_ARRAY != 0
    }

    pub fn is_aligned(&self) -> bool {
        self.meta_flag & META_FLAG_ALIGN != 0
    }
}

/// Width in bytes of a primitive type name, or `None` for composite types.
pub fn primitive_size(type_name: &str) -> Option<usize> {
    match type_name {
        "bool" | "SInt8" | "UInt8" | "char" => Some(1),
        "SInt16" | "short" | "UInt16" | "unsigned short" => Some(2),
        "SInt32" | "int" | "UInt32" | "unsigned int" | "float" | "Type*" => Some(4),
        "SInt64" | "long long" | "UInt64" | "unsigned long long" | "double" | "FileSize" => {
            Some(8)
        }
        _ => None,
    }
}

/// A complete class layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeTree {
    nodes: Vec<TypeTreeNode>,
    children: Vec<Vec<usize>>,
}

impl TypeTree {
    /// Build a tree from a flat node list.
    ///
    /// Fails if the list is empty or the levels do not describe a single rooted tree.
    pub fn from_nodes(nodes: Vec<TypeTreeNode>) -> Result<Self> {
        let children = compute_children(&nodes)?;
        Ok(Self { nodes, children })
    }

    /// Flatten a `rabex` type tree node and its descendants.
    pub fn from_node(root: &RawNode) -> Result<Self> {
        let mut nodes = Vec::new();
        flatten(root, 0, &mut nodes)?;
        Self::from_nodes(nodes)
    }

    /// The nested `rabex` representation of this tree.
    pub fn to_node(&self) -> RawNode {
        self.raw_node(0)
    }

    fn raw_node(&self, index: usize) -> RawNode {
        let node = &self.nodes[index];
        RawNode {
            m_Level: node.level.into(),
            m_Type: node.type_name.clone(),
            m_Name: node.name.clone(),
            m_ByteSize: node.byte_size,
            m_Version: node.version.into(),
            m_TypeFlags: node.type_flags.into(),
            m_MetaFlag: Some(node.meta_flag),
            children: self.children[index]
                .iter()
                .map(|&child| self.raw_node(child))
                .collect(),
            ..Default::default()
        }
    }

    pub fn nodes(&self) -> &[TypeTreeNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> &TypeTreeNode {
        &self.nodes[index]
    }

    pub fn children(&self, index: usize) -> &[usize] {
        &self.children[index]
    }

    /// The class name recorded on the root node (e.g. `"Texture2D"`).
    pub fn class_name(&self) -> &str {
        &self.nodes[0].type_name
    }
}

fn flatten(raw: &RawNode, level: u8, out: &mut Vec<TypeTreeNode>) -> Result<()> {
    let type_name = raw.m_Type.clone();
    out.push(TypeTreeNode {
        version: 1,
        level,
        type_flags: if type_name == "Array" { TYPE_FLAG_ARRAY } else { 0 },
        byte_size: i32::try_from(raw.m_ByteSize).unwrap_or(-1),
        meta_flag: raw.m_MetaFlag.unwrap_or(0),
        name: raw.m_Name.clone(),
        type_name,
    });
    if raw.children.is_empty() {
        return Ok(());
    }
    let next = level
        .checked_add(1)
        .ok_or_else(|| Error::malformed(format!("type tree deeper than {} levels", u8::MAX)))?;
    for child in &raw.children {
        flatten(child, next, out)?;
    }
    Ok(())
}

fn compute_children(nodes: &[TypeTreeNode]) -> Result<Vec<Vec<usize>>> {
    let Some(root) = nodes.first() else {
        return Err(Error::malformed("empty type tree"));
    };
    if root.level != 0 {
        return Err(Error::malformed("type tree root is not at level 0"));
    }

    let mut children = vec![Vec::new(); nodes.len()];
    // Stack of node indices for the current ancestry chain.
    let mut stack: Vec<usize> = vec![0];
    for (i, node) in nodes.iter().enumerate().skip(1) {
        if node.level == 0 {
            return Err(Error::malformed("type tree has more than one root"));
        }
        while let Some(&top) = stack.last() {
            if nodes[top].level >= node.level {
                stack.pop();
            } else {
                break;
            }
        }
        let Some(&parent) = stack.last() else {
            return Err(Error::malformed(format!("orphan type tree node '{}'", node.name)));
        };
        if node.level != nodes[parent].level + 1 {
            return Err(Error::malformed(format!(
                "type tree node '{}' skips a level",
                node.name
            )));
        }
        children[parent].push(i);
        stack.push(i);
    }
    Ok(children)
}

/// Incremental construction of type trees with Unity's conventional shapes.
///
/// ```
/// use unity_assets::TypeTreeBuilder;
///
/// let tree = TypeTreeBuilder::new("AudioClip")
///     .string("m_Name")
///     .field("int", "m_Channels")
///     .begin("StreamedResource", "m_Resource")
///     .string("m_Source")
///     .field("UInt64", "m_Offset")
///     .end()
///     .build()
///     .unwrap();
/// assert_eq!(tree.class_name(), "AudioClip");
/// ```
pub struct TypeTreeBuilder {
    nodes: Vec<TypeTreeNode>,
    depth: u8,
}

impl TypeTreeBuilder {
    pub fn new(class_name: &str) -> Self {
        Self {
            nodes: vec![TypeTreeNode::new(0, class_name, "Base")],
            depth: 0,
        }
    }

    /// Add a primitive or opaque field at the current depth.
    pub fn field(mut self, type_name: &str, name: &str) -> Self {
        self.nodes
            .push(TypeTreeNode::new(self.depth + 1, type_name, name));
        self
    }

    /// Add a primitive field followed by 4-byte alignment.
    pub fn aligned_field(mut self, type_name: &str, name: &str) -> Self {
        let mut node = TypeTreeNode::new(self.depth + 1, type_name, name);
        node.meta_flag |= META_FLAG_ALIGN;
        self.nodes.push(node);
        self
    }

    /// Open a nested struct; close it with [`end`](Self::end).
    pub fn begin(mut self, type_name: &str, name: &str) -> Self {
        self.nodes
            .push(TypeTreeNode::new(self.depth + 1, type_name, name));
        self.depth += 1;
        self
    }

    pub fn end(mut self) -> Self {
        self.depth = self.depth.saturating_sub(1);
        self
    }

    /// Add a `string` field (length-prefixed, aligned).
    pub fn string(self, name: &str) -> Self {
        self.vector_like("string", name, "char")
    }

    /// Add a `vector` of a primitive element type.
    pub fn vector(self, element_type: &str, name: &str) -> Self {
        self.vector_like("vector", name, element_type)
    }

    /// Add a `TypelessData` byte blob (used for inline texture pixels).
    pub fn typeless_data(mut self, name: &str) -> Self {
        let level = self.depth + 1;
        let mut node = TypeTreeNode::new(level, "TypelessData", name);
        node.meta_flag |= META_FLAG_ALIGN;
        self.nodes.push(node);
        self.nodes.push(TypeTreeNode::new(level + 1, "int", "size"));
        self.nodes.push(TypeTreeNode::new(level + 1, "UInt8", "data"));
        self
    }

    /// Add a `PPtr<T>` reference (`m_FileID` + `m_PathID`).
    pub fn pptr(self, target_class: &str, name: &str) -> Self {
        self.begin(&format!("PPtr<{target_class}>"), name)
            .field("int", "m_FileID")
            .field("SInt64", "m_PathID")
            .end()
    }

    fn vector_like(mut self, type_name: &str, name: &str, element: &str) -> Self {
        let level = self.depth + 1;
        self.nodes.push(TypeTreeNode::new(level, type_name, name));
        let mut array = TypeTreeNode::new(level + 1, "Array", "Array");
        array.type_flags |= TYPE_FLAG_ARRAY;
        array.meta_flag |= META_FLAG_ALIGN;
        self.nodes.push(array);
        self.nodes.push(TypeTreeNode::new(level + 2, "int", "size"));
        self.nodes.push(TypeTreeNode::new(level + 2, element, "data"));
        self
    }

    pub fn build(self) -> Result<TypeTree> {
        TypeTree::from_nodes(self.nodes)
    }
}
