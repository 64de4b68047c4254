//! Dynamically-typed field trees decoded from object bytes.
//!
//! A [`FieldTree`] is an arena of [`FieldNode`]s addressed by [`FieldId`]. Every
//! node remembers the type tree node it was decoded with, so values can be
//! mutated in place and re-encoded with the exact primitive widths and alignment
//! of the original layout.
//!
//! Byte-element arrays (`vector<UInt8>`, `TypelessData`) are kept as a single
//! [`Scalar::Bytes`] value instead of one node per byte.

use crate::endian::{Endian, EndianReader, EndianWriter};
use crate::error::{Error, Result};
use crate::typetree::{primitive_size, TypeTree};
use std::sync::Arc;

/// Index of a node inside a [`FieldTree`].
pub type FieldId = usize;

/// A leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
}

/// The value held by a node.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(Scalar),
    Array(Vec<FieldId>),
    Struct(Vec<FieldId>),
}

/// One decoded field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldNode {
    pub name: String,
    pub type_name: String,
    pub value: FieldValue,
    parent: Option<FieldId>,
    template: usize,
}

impl FieldNode {
    pub fn parent(&self) -> Option<FieldId> {
        self.parent
    }
}

/// Decoded view over one object's serialized fields.
#[derive(Debug, Clone)]
pub struct FieldTree {
    layout: Arc<TypeTree>,
    nodes: Vec<FieldNode>,
    endian: Endian,
    trailing: Vec<u8>,
}

impl FieldTree {
    /// Decode `data` with `layout`.
    pub fn decode(layout: Arc<TypeTree>, data: &[u8], endian: Endian) -> Result<Self> {
        let mut tree = Self {
            layout,
            nodes: Vec::new(),
            endian,
            trailing: Vec::new(),
        };
        let mut reader = EndianReader::new(data, endian);
        tree.read_node(&mut reader, 0, None)?;

        if reader.remaining() > 0 {
            tracing::debug!(
                "Object of class {} has {} trailing bytes after decode",
                tree.layout.class_name(),
                reader.remaining()
            );
            tree.trailing = reader.read_bytes(reader.remaining() as usize)?;
        }
        Ok(tree)
    }

    /// Build a tree holding the zero value of every field in `layout`.
    ///
    /// Strings, byte blobs and arrays start empty.
    pub fn with_defaults(layout: Arc<TypeTree>, endian: Endian) -> Result<Self> {
        let mut tree = Self {
            layout,
            nodes: Vec::new(),
            endian,
            trailing: Vec::new(),
        };
        tree.default_node(0, None)?;
        Ok(tree)
    }

    /// Re-encode the tree with its original layout.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = EndianWriter::new(self.endian);
        self.write_node(&mut writer, self.root())?;
        writer.write_bytes(&self.trailing)?;
        Ok(writer.into_inner())
    }

    pub fn layout(&self) -> &Arc<TypeTree> {
        &self.layout
    }

    pub fn root(&self) -> FieldId {
        0
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: FieldId) -> &FieldNode {
        &self.nodes[id]
    }

    /// Children of a struct or elements of an array; empty for scalars.
    pub fn children(&self, id: FieldId) -> &[FieldId] {
        match &self.nodes[id].value {
            FieldValue::Array(ids) | FieldValue::Struct(ids) => ids,
            FieldValue::Scalar(_) => &[],
        }
    }

    /// Named child of a struct node.
    pub fn child(&self, id: FieldId, name: &str) -> Option<FieldId> {
        match &self.nodes[id].value {
            FieldValue::Struct(ids) => ids.iter().copied().find(|&c| self.nodes[c].name == name),
            _ => None,
        }
    }

    /// Resolve a dotted path such as `"m_Resource.m_Offset"` from the root.
    pub fn lookup(&self, path: &str) -> Option<FieldId> {
        path.split('.')
            .try_fold(self.root(), |id, segment| self.child(id, segment))
    }

    fn require(&self, path: &str) -> Result<FieldId> {
        self.lookup(path)
            .ok_or_else(|| Error::FieldNotFound(path.to_string()))
    }

    pub fn scalar(&self, path: &str) -> Result<&Scalar> {
        let id = self.require(path)?;
        match &self.nodes[id].value {
            FieldValue::Scalar(s) => Ok(s),
            _ => Err(Error::TypeMismatch {
                field: path.to_string(),
                expected: "scalar".to_string(),
            }),
        }
    }

    /// The object's `m_Name`, if the layout has one.
    pub fn name(&self) -> Option<&str> {
        match self.scalar("m_Name") {
            Ok(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_int(&self, path: &str) -> Result<i64> {
        match self.scalar(path)? {
            Scalar::Int(v) => Ok(*v),
            Scalar::UInt(v) => i64::try_from(*v).map_err(|_| Error::OutOfRange {
                field: path.to_string(),
                type_name: "i64".to_string(),
                value: *v as i128,
            }),
            Scalar::Bool(b) => Ok(i64::from(*b)),
            _ => Err(mismatch(path, "integer")),
        }
    }

    pub fn get_uint(&self, path: &str) -> Result<u64> {
        match self.scalar(path)? {
            Scalar::UInt(v) => Ok(*v),
            Scalar::Int(v) => u64::try_from(*v).map_err(|_| Error::OutOfRange {
                field: path.to_string(),
                type_name: "u64".to_string(),
                value: *v as i128,
            }),
            _ => Err(mismatch(path, "integer")),
        }
    }

    pub fn get_float(&self, path: &str) -> Result<f64> {
        match self.scalar(path)? {
            Scalar::Float(v) => Ok(*v),
            _ => Err(mismatch(path, "float")),
        }
    }

    pub fn get_bool(&self, path: &str) -> Result<bool> {
        match self.scalar(path)? {
            Scalar::Bool(v) => Ok(*v),
            _ => Err(mismatch(path, "bool")),
        }
    }

    pub fn get_str(&self, path: &str) -> Result<&str> {
        match self.scalar(path)? {
            Scalar::String(v) => Ok(v),
            _ => Err(mismatch(path, "string")),
        }
    }

    pub fn get_bytes(&self, path: &str) -> Result<&[u8]> {
        match self.scalar(path)? {
            Scalar::Bytes(v) => Ok(v),
            _ => Err(mismatch(path, "bytes")),
        }
    }

    /// Assign a scalar, checking it against the field's primitive type.
    ///
    /// Integers are accepted for any integer field whose width can hold them and are
    /// stored in the field's own signedness.
    pub fn set(&mut self, id: FieldId, value: Scalar) -> Result<()> {
        let node = &self.nodes[id];
        let template = self.layout.node(node.template);
        let current = match &node.value {
            FieldValue::Scalar(s) => s,
            _ => return Err(mismatch(&node.name, "scalar field")),
        };
        let coerced = coerce(&node.name, &template.type_name, current, value)?;
        self.nodes[id].value = FieldValue::Scalar(coerced);
        Ok(())
    }

    pub fn set_path(&mut self, path: &str, value: Scalar) -> Result<()> {
        let id = self.require(path)?;
        self.set(id, value)
    }

    pub fn set_int(&mut self, path: &str, value: i64) -> Result<()> {
        self.set_path(path, Scalar::Int(value))
    }

    pub fn set_uint(&mut self, path: &str, value: u64) -> Result<()> {
        self.set_path(path, Scalar::UInt(value))
    }

    pub fn set_float(&mut self, path: &str, value: f64) -> Result<()> {
        self.set_path(path, Scalar::Float(value))
    }

    pub fn set_bool(&mut self, path: &str, value: bool) -> Result<()> {
        self.set_path(path, Scalar::Bool(value))
    }

    pub fn set_string(&mut self, path: &str, value: impl Into<String>) -> Result<()> {
        self.set_path(path, Scalar::String(value.into()))
    }

    pub fn set_bytes(&mut self, path: &str, value: Vec<u8>) -> Result<()> {
        self.set_path(path, Scalar::Bytes(value))
    }

    /// Whether a node is followed by 4-byte alignment, either through its own
    /// meta flag or through the flag on its `Array` child.
    fn is_aligned(&self, template: usize) -> bool {
        let node = self.layout.node(template);
        if node.is_aligned() {
            return true;
        }
        match self.layout.children(template).first() {
            Some(&first) => {
                let child = self.layout.node(first);
                child.is_array() && child.is_aligned()
            }
            None => false,
        }
    }

    /// For array-shaped templates, the `(array, element)` template pair.
    fn array_parts(&self, template: usize) -> Option<(usize, usize)> {
        let node = self.layout.node(template);
        let array = if node.is_array() {
            template
        } else {
            let &first = self.layout.children(template).first()?;
            if !self.layout.node(first).is_array() {
                return None;
            }
            first
        };
        let element = *self.layout.children(array).get(1)?;
        Some((array, element))
    }

    fn is_byte_element(&self, template: usize) -> bool {
        let node = self.layout.node(template);
        self.layout.children(template).is_empty()
            && matches!(node.type_name.as_str(), "UInt8" | "SInt8" | "char")
    }

    fn read_node(
        &mut self,
        reader: &mut EndianReader<'_>,
        template: usize,
        parent: Option<FieldId>,
    ) -> Result<FieldId> {
        let layout = Arc::clone(&self.layout);
        let node = layout.node(template);
        let id = self.nodes.len();
        self.nodes.push(FieldNode {
            name: node.name.clone(),
            type_name: node.type_name.clone(),
            value: FieldValue::Struct(Vec::new()),
            parent,
            template,
        });

        let children = layout.children(template);
        let value = match node.type_name.as_str() {
            "string" => {
                let len = read_len(reader, &node.name)?;
                let bytes = reader.read_bytes(len)?;
                let s = String::from_utf8(bytes)
                    .map_err(|e| Error::decode(&node.name, format!("invalid UTF-8: {e}")))?;
                FieldValue::Scalar(Scalar::String(s))
            }
            "TypelessData" => {
                let len = read_len(reader, &node.name)?;
                FieldValue::Scalar(Scalar::Bytes(reader.read_bytes(len)?))
            }
            type_name if children.is_empty() && primitive_size(type_name).is_some() => {
                FieldValue::Scalar(read_primitive(reader, type_name)?)
            }
            _ => match self.array_parts(template) {
                Some((_, element)) => {
                    let count = read_len(reader, &node.name)?;
                    if self.is_byte_element(element) {
                        FieldValue::Scalar(Scalar::Bytes(reader.read_bytes(count)?))
                    } else {
                        if count as u64 > reader.remaining() {
                            return Err(Error::decode(
                                &node.name,
                                format!("array count {count} exceeds remaining data"),
                            ));
                        }
                        let mut ids = Vec::with_capacity(count);
                        for _ in 0..count {
                            ids.push(self.read_node(reader, element, Some(id))?);
                        }
                        FieldValue::Array(ids)
                    }
                }
                None => {
                    let mut ids = Vec::with_capacity(children.len());
                    for &child in children {
                        ids.push(self.read_node(reader, child, Some(id))?);
                    }
                    FieldValue::Struct(ids)
                }
            },
        };
        self.nodes[id].value = value;

        if self.is_aligned(template) {
            reader.align(4);
        }
        Ok(id)
    }

    fn default_node(&mut self, template: usize, parent: Option<FieldId>) -> Result<FieldId> {
        let layout = Arc::clone(&self.layout);
        let node = layout.node(template);
        let id = self.nodes.len();
        self.nodes.push(FieldNode {
            name: node.name.clone(),
            type_name: node.type_name.clone(),
            value: FieldValue::Struct(Vec::new()),
            parent,
            template,
        });

        let children = layout.children(template);
        let value = match node.type_name.as_str() {
            "string" => FieldValue::Scalar(Scalar::String(String::new())),
            "TypelessData" => FieldValue::Scalar(Scalar::Bytes(Vec::new())),
            type_name if children.is_empty() && primitive_size(type_name).is_some() => {
                let zeros = [0u8; 8];
                let mut reader = EndianReader::new(&zeros, self.endian);
                FieldValue::Scalar(read_primitive(&mut reader, type_name)?)
            }
            _ => match self.array_parts(template) {
                Some((_, element)) if self.is_byte_element(element) => {
                    FieldValue::Scalar(Scalar::Bytes(Vec::new()))
                }
                Some(_) => FieldValue::Array(Vec::new()),
                None => {
                    let mut ids = Vec::with_capacity(children.len());
                    for &child in children {
                        ids.push(self.default_node(child, Some(id))?);
                    }
                    FieldValue::Struct(ids)
                }
            },
        };
        self.nodes[id].value = value;
        Ok(id)
    }

    fn write_node(&self, writer: &mut EndianWriter, id: FieldId) -> Result<()> {
        let node = &self.nodes[id];
        let template = self.layout.node(node.template);
        match &node.value {
            FieldValue::Scalar(Scalar::String(s)) => {
                writer.write_i32(s.len() as i32)?;
                writer.write_bytes(s.as_bytes())?;
            }
            FieldValue::Scalar(Scalar::Bytes(b)) => {
                writer.write_i32(b.len() as i32)?;
                writer.write_bytes(b)?;
            }
            FieldValue::Scalar(s) => write_primitive(writer, &node.name, &template.type_name, s)?,
            FieldValue::Array(ids) => {
                writer.write_i32(ids.len() as i32)?;
                for &child in ids {
                    self.write_node(writer, child)?;
                }
            }
            FieldValue::Struct(ids) => {
                for &child in ids {
                    self.write_node(writer, child)?;
                }
            }
        }
        if self.is_aligned(node.template) {
            writer.align(4);
        }
        Ok(())
    }
}

fn mismatch(field: &str, expected: &str) -> Error {
    Error::TypeMismatch {
        field: field.to_string(),
        expected: expected.to_string(),
    }
}

fn read_len(reader: &mut EndianReader<'_>, field: &str) -> Result<usize> {
    let len = reader.read_i32()?;
    usize::try_from(len).map_err(|_| Error::decode(field, format!("negative length {len}")))
}

fn read_primitive(reader: &mut EndianReader<'_>, type_name: &str) -> Result<Scalar> {
    Ok(match type_name {
        "bool" => Scalar::Bool(reader.read_bool()?),
        "SInt8" => Scalar::Int(reader.read_i8()? as i64),
        "UInt8" | "char" => Scalar::UInt(reader.read_u8()? as u64),
        "SInt16" | "short" => Scalar::Int(reader.read_i16()? as i64),
        "UInt16" | "unsigned short" => Scalar::UInt(reader.read_u16()? as u64),
        "SInt32" | "int" | "Type*" => Scalar::Int(reader.read_i32()? as i64),
        "UInt32" | "unsigned int" => Scalar::UInt(reader.read_u32()? as u64),
        "SInt64" | "long long" => Scalar::Int(reader.read_i64()?),
        "UInt64" | "unsigned long long" | "FileSize" => Scalar::UInt(reader.read_u64()?),
        "float" => Scalar::Float(reader.read_f32()? as f64),
        "double" => Scalar::Float(reader.read_f64()?),
        other => return Err(Error::decode(other, "not a primitive type")),
    })
}

/// Integer bounds of a primitive type, with its signedness.
fn int_bounds(type_name: &str) -> Option<(i128, i128, bool)> {
    Some(match type_name {
        "SInt8" => (i8::MIN as i128, i8::MAX as i128, true),
        "UInt8" | "char" => (0, u8::MAX as i128, false),
        "SInt16" | "short" => (i16::MIN as i128, i16::MAX as i128, true),
        "UInt16" | "unsigned short" => (0, u16::MAX as i128, false),
        "SInt32" | "int" | "Type*" => (i32::MIN as i128, i32::MAX as i128, true),
        "UInt32" | "unsigned int" => (0, u32::MAX as i128, false),
        "SInt64" | "long long" => (i64::MIN as i128, i64::MAX as i128, true),
        "UInt64" | "unsigned long long" | "FileSize" => (0, u64::MAX as i128, false),
        _ => return None,
    })
}

fn coerce(field: &str, type_name: &str, current: &Scalar, value: Scalar) -> Result<Scalar> {
    if let Some((min, max, signed)) = int_bounds(type_name) {
        let wide = match value {
            Scalar::Int(v) => v as i128,
            Scalar::UInt(v) => v as i128,
            Scalar::Bool(b) => i128::from(b),
            _ => return Err(mismatch(field, type_name)),
        };
        if wide < min || wide > max {
            return Err(Error::OutOfRange {
                field: field.to_string(),
                type_name: type_name.to_string(),
                value: wide,
            });
        }
        return Ok(if signed {
            Scalar::Int(wide as i64)
        } else {
            Scalar::UInt(wide as u64)
        });
    }

    match (type_name, value) {
        ("bool", Scalar::Bool(b)) => Ok(Scalar::Bool(b)),
        ("float" | "double", Scalar::Float(f)) => Ok(Scalar::Float(f)),
        ("float" | "double", Scalar::Int(i)) => Ok(Scalar::Float(i as f64)),
        ("string", Scalar::String(s)) => Ok(Scalar::String(s)),
        (_, Scalar::Bytes(b)) if matches!(current, Scalar::Bytes(_)) => Ok(Scalar::Bytes(b)),
        _ => Err(mismatch(field, type_name)),
    }
}

fn write_primitive(
    writer: &mut EndianWriter,
    field: &str,
    type_name: &str,
    value: &Scalar,
) -> Result<()> {
    let int = || -> Result<i128> {
        match value {
            Scalar::Int(v) => Ok(*v as i128),
            Scalar::UInt(v) => Ok(*v as i128),
            Scalar::Bool(b) => Ok(i128::from(*b)),
            _ => Err(mismatch(field, type_name)),
        }
    };
    match type_name {
        "bool" => match value {
            Scalar::Bool(b) => writer.write_bool(*b),
            _ => Err(mismatch(field, type_name)),
        },
        "SInt8" => writer.write_i8(int()? as i8),
        "UInt8" | "char" => writer.write_u8(int()? as u8),
        "SInt16" | "short" => writer.write_i16(int()? as i16),
        "UInt16" | "unsigned short" => writer.write_u16(int()? as u16),
        "SInt32" | "int" | "Type*" => writer.write_i32(int()? as i32),
        "UInt32" | "unsigned int" => writer.write_u32(int()? as u32),
        "SInt64" | "long long" => writer.write_i64(int()? as i64),
        "UInt64" | "unsigned long long" | "FileSize" => writer.write_u64(int()? as u64),
        "float" | "double" => {
            let f = match value {
                Scalar::Float(f) => *f,
                _ => return Err(mismatch(field, type_name)),
            };
            if type_name == "float" {
                writer.write_f32(f as f32)
            } else {
                writer.write_f64(f)
            }
        }
        other => Err(mismatch(field, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typetree::TypeTreeBuilder;

    fn clip_layout() -> Arc<TypeTree> {
        Arc::new(
            TypeTreeBuilder::new("AudioClip")
                .string("m_Name")
                .field("int", "m_LoadType")
                .field("int", "m_Channels")
                .aligned_field("bool", "m_Preload")
                .field("float", "m_Length")
                .begin("StreamedResource", "m_Resource")
                .string("m_Source")
                .field("UInt64", "m_Offset")
                .field("UInt64", "m_Size")
                .end()
                .vector("UInt8", "m_Blob")
                .build()
                .unwrap(),
        )
    }

    fn clip_bytes() -> Vec<u8> {
        let mut w = EndianWriter::new(Endian::Little);
        w.write_i32(5).unwrap();
        w.write_bytes(b"intro").unwrap();
        w.align(4);
        w.write_i32(1).unwrap();
        w.write_i32(2).unwrap();
        w.write_bool(true).unwrap();
        w.align(4);
        w.write_f32(1.5).unwrap();
        w.write_i32(0).unwrap();
        w.write_u64(16).unwrap();
        w.write_u64(32).unwrap();
        w.write_i32(3).unwrap();
        w.write_bytes(&[9, 8, 7]).unwrap();
        w.align(4);
        w.into_inner()
    }

    #[test]
    fn test_decode_reads_values() {
        let tree = FieldTree::decode(clip_layout(), &clip_bytes(), Endian::Little).unwrap();
        assert_eq!(tree.name(), Some("intro"));
        assert_eq!(tree.get_int("m_Channels").unwrap(), 2);
        assert!(tree.get_bool("m_Preload").unwrap());
        assert_eq!(tree.get_float("m_Length").unwrap(), 1.5);
        assert_eq!(tree.get_str("m_Resource.m_Source").unwrap(), "");
        assert_eq!(tree.get_uint("m_Resource.m_Size").unwrap(), 32);
        assert_eq!(tree.get_bytes("m_Blob").unwrap(), &[9, 8, 7]);
    }

    #[test]
    fn test_unmodified_tree_reencodes_identically() {
        let bytes = clip_bytes();
        let tree = FieldTree::decode(clip_layout(), &bytes, Endian::Little).unwrap();
        assert_eq!(tree.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_mutation_changes_encoding() {
        let mut tree = FieldTree::decode(clip_layout(), &clip_bytes(), Endian::Little).unwrap();
        tree.set_string("m_Resource.m_Source", "level0.resS").unwrap();
        tree.set_uint("m_Resource.m_Offset", 1024).unwrap();

        let again =
            FieldTree::decode(clip_layout(), &tree.to_bytes().unwrap(), Endian::Little).unwrap();
        assert_eq!(again.get_str("m_Resource.m_Source").unwrap(), "level0.resS");
        assert_eq!(again.get_uint("m_Resource.m_Offset").unwrap(), 1024);
        assert_eq!(again.get_bytes("m_Blob").unwrap(), &[9, 8, 7]);
    }

    #[test]
    fn test_set_rejects_out_of_range() {
        let mut tree = FieldTree::decode(clip_layout(), &clip_bytes(), Endian::Little).unwrap();
        assert!(matches!(
            tree.set_int("m_Channels", i64::from(i32::MAX) + 1),
            Err(Error::OutOfRange { .. })
        ));
        assert!(matches!(
            tree.set_int("m_Resource.m_Offset", -1),
            Err(Error::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_set_rejects_wrong_kind() {
        let mut tree = FieldTree::decode(clip_layout(), &clip_bytes(), Endian::Little).unwrap();
        assert!(matches!(
            tree.set_string("m_Channels", "two"),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            tree.set_int("m_Resource", 1),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_defaults_encode_and_decode() {
        let mut tree = FieldTree::with_defaults(clip_layout(), Endian::Little).unwrap();
        assert_eq!(tree.name(), Some(""));
        assert_eq!(tree.get_uint("m_Resource.m_Offset").unwrap(), 0);
        tree.set_string("m_Name", "intro").unwrap();

        let bytes = tree.to_bytes().unwrap();
        assert_eq!(bytes.len() % 4, 0);
        let again = FieldTree::decode(clip_layout(), &bytes, Endian::Little).unwrap();
        assert_eq!(again.name(), Some("intro"));
        assert_eq!(again.get_bytes("m_Blob").unwrap(), &[] as &[u8]);
    }

    #[test]
    fn test_lookup_missing_path() {
        let tree = FieldTree::decode(clip_layout(), &clip_bytes(), Endian::Little).unwrap();
        assert!(tree.lookup("m_Resource.m_Missing").is_none());
        assert!(matches!(
            tree.get_int("m_Nope"),
            Err(Error::FieldNotFound(_))
        ));
    }

    #[test]
    fn test_struct_array_elements() {
        let layout = Arc::new(
            TypeTreeBuilder::new("Thing")
                .begin("vector", "m_Pairs")
                .begin("Array", "Array")
                .field("int", "size")
                .begin("pair", "data")
                .field("int", "first")
                .field("float", "second")
                .end()
                .end()
                .end()
                .build()
                .unwrap(),
        );
        // Mark the Array node as an array by rebuilding with the flag set.
        let mut nodes = layout.nodes().to_vec();
        nodes[2].type_flags = crate::typetree::TYPE_FLAG_ARRAY;
        let layout = Arc::new(TypeTree::from_nodes(nodes).unwrap());

        let mut w = EndianWriter::new(Endian::Little);
        w.write_i32(2).unwrap();
        w.write_i32(10).unwrap();
        w.write_f32(0.5).unwrap();
        w.write_i32(20).unwrap();
        w.write_f32(0.25).unwrap();
        let bytes = w.into_inner();

        let tree = FieldTree::decode(layout, &bytes, Endian::Little).unwrap();
        let pairs = tree.lookup("m_Pairs").unwrap();
        assert_eq!(tree.children(pairs).len(), 2);
        let second = tree.children(pairs)[1];
        let first_field = tree.child(second, "first").unwrap();
        assert_eq!(tree.node(first_field).value, FieldValue::Scalar(Scalar::Int(20)));
        assert_eq!(tree.node(second).parent(), Some(pairs));
        assert_eq!(tree.to_bytes().unwrap(), bytes);
    }
}
