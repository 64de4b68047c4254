//! Shared fixtures: a temporary install tree with real containers built through
//! `rabex`, and a mods directory next to it.

#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::fs;
use std::str::FromStr;
use tempfile::TempDir;
use unity_assets::rabex::files::serializedfile::build_common_offset_map;
use unity_assets::rabex::files::serializedfile::builder::SerializedFileBuilder;
use unity_assets::rabex::objects::{ClassId, ClassIdType};
use unity_assets::rabex::typetree::typetree_cache::sync::TypeTreeCache;
use unity_assets::rabex::UnityVersion;
use unity_assets::{StaticLayouts, TypeTree, TypeTreeBuilder};
use unity_mod_patcher::{PatchContext, PatcherConfig};

pub const UNITY_VERSION: &str = "2019.4.40f1";

pub fn audio_clip_layout() -> TypeTree {
    TypeTreeBuilder::new("AudioClip")
        .string("m_Name")
        .field("int", "m_LoadType")
        .field("int", "m_Channels")
        .field("int", "m_Frequency")
        .field("int", "m_BitsPerSample")
        .field("float", "m_Length")
        .aligned_field("bool", "m_IsTrackerFormat")
        .begin("StreamedResource", "m_Resource")
        .string("m_Source")
        .field("UInt64", "m_Offset")
        .field("UInt64", "m_Size")
        .end()
        .field("int", "m_CompressionFormat")
        .build()
        .unwrap()
}

pub fn texture_layout() -> TypeTree {
    TypeTreeBuilder::new("Texture2D")
        .string("m_Name")
        .field("int", "m_Width")
        .field("int", "m_Height")
        .field("int", "m_CompleteImageSize")
        .field("int", "m_TextureFormat")
        .field("int", "m_MipCount")
        .typeless_data("image data")
        .begin("StreamingInfo", "m_StreamData")
        .field("UInt64", "offset")
        .field("unsigned int", "size")
        .string("path")
        .end()
        .build()
        .unwrap()
}

pub fn sprite_layout() -> TypeTree {
    TypeTreeBuilder::new("Sprite")
        .string("m_Name")
        .begin("SpriteRenderData", "m_RD")
        .pptr("Texture2D", "texture")
        .end()
        .build()
        .unwrap()
}

#[derive(Serialize, Default)]
#[allow(non_snake_case)]
pub struct StreamedResource {
    pub m_Source: String,
    pub m_Offset: u64,
    pub m_Size: u64,
}

#[derive(Serialize, Default)]
#[allow(non_snake_case)]
pub struct AudioClip {
    pub m_Name: String,
    pub m_LoadType: i32,
    pub m_Channels: i32,
    pub m_Frequency: i32,
    pub m_BitsPerSample: i32,
    pub m_Length: f32,
    pub m_IsTrackerFormat: bool,
    pub m_Resource: StreamedResource,
    pub m_CompressionFormat: i32,
}

impl ClassIdType for AudioClip {
    const CLASS_ID: ClassId = ClassId::AudioClip;
}

#[derive(Serialize, Default)]
pub struct StreamingInfo {
    pub offset: u64,
    pub size: u32,
    pub path: String,
}

#[derive(Serialize, Default)]
#[allow(non_snake_case)]
pub struct Texture2D {
    pub m_Name: String,
    pub m_Width: i32,
    pub m_Height: i32,
    pub m_CompleteImageSize: i32,
    pub m_TextureFormat: i32,
    pub m_MipCount: i32,
    #[serde(rename = "image data")]
    pub image_data: Vec<u8>,
    pub m_StreamData: StreamingInfo,
}

impl ClassIdType for Texture2D {
    const CLASS_ID: ClassId = ClassId::Texture2D;
}

#[derive(Serialize, Default)]
#[allow(non_snake_case)]
pub struct TexturePPtr {
    pub m_FileID: i32,
    pub m_PathID: i64,
}

#[derive(Serialize, Default)]
pub struct SpriteRenderData {
    pub texture: TexturePPtr,
}

#[derive(Serialize, Default)]
#[allow(non_snake_case)]
pub struct Sprite {
    pub m_Name: String,
    pub m_RD: SpriteRenderData,
}

impl ClassIdType for Sprite {
    const CLASS_ID: ClassId = ClassId::Sprite;
}

pub enum ObjectData {
    AudioClip(AudioClip),
    Texture2D(Texture2D),
    Sprite(Sprite),
}

/// One object to place in a fixture container.
pub struct Object {
    pub path_id: i64,
    pub data: ObjectData,
}

pub fn audio_clip(path_id: i64, name: &str) -> Object {
    Object {
        path_id,
        data: ObjectData::AudioClip(AudioClip {
            m_Name: name.to_string(),
            m_LoadType: 1,
            m_Channels: 1,
            m_Frequency: 22_050,
            ..Default::default()
        }),
    }
}

pub fn texture(path_id: i64, name: &str, width: i32, height: i32) -> Object {
    Object {
        path_id,
        data: ObjectData::Texture2D(Texture2D {
            m_Name: name.to_string(),
            m_Width: width,
            m_Height: height,
            m_TextureFormat: 12,
            m_MipCount: 1,
            image_data: vec![0x55; 16],
            ..Default::default()
        }),
    }
}

/// A sprite whose texture is `(file_id, texture_path_id)`; file id 0 is this container.
pub fn sprite(path_id: i64, name: &str, file_id: i32, texture_path_id: i64) -> Object {
    Object {
        path_id,
        data: ObjectData::Sprite(Sprite {
            m_Name: name.to_string(),
            m_RD: SpriteRenderData {
                texture: TexturePPtr {
                    m_FileID: file_id,
                    m_PathID: texture_path_id,
                },
            },
        }),
    }
}

pub fn container_bytes(objects: Vec<Object>) -> Vec<u8> {
    let version = UnityVersion::from_str(UNITY_VERSION).unwrap();
    let layouts = StaticLayouts::new()
        .with(ClassId::AudioClip, &audio_clip_layout())
        .with(ClassId::Texture2D, &texture_layout())
        .with(ClassId::Sprite, &sprite_layout());
    let com = build_common_offset_map(&TypeTreeCache::embedded().inner, &version);
    let mut builder = SerializedFileBuilder::new(&version, &layouts, &com, true);
    for object in objects {
        match object.data {
            ObjectData::AudioClip(o) => builder.add_object_at(object.path_id, &o),
            ObjectData::Texture2D(o) => builder.add_object_at(object.path_id, &o),
            ObjectData::Sprite(o) => builder.add_object_at(object.path_id, &o),
        }
        .unwrap();
    }
    builder.write_vec().unwrap()
}

/// Point the object table entry of `path_id` far past the end of the file.
///
/// `path_id` must be distinctive enough that its bytes occur nowhere before the
/// object table.
pub fn corrupt_byte_start(bytes: &mut [u8], path_id: i64) {
    let needle = path_id.to_le_bytes();
    let at = bytes
        .windows(needle.len())
        .position(|w| w == needle)
        .unwrap()
        + needle.len();
    bytes[at..at + 8].copy_from_slice(&(u64::MAX - 100).to_le_bytes());
}

/// An Ogg Vorbis stream of exactly `total_len` bytes: identification page, padding,
/// and a final page whose granule position is `samples`.
pub fn fake_ogg(channels: u8, rate: u32, samples: i64, total_len: usize) -> Vec<u8> {
    fn page(out: &mut Vec<u8>, header_type: u8, granule: i64, packet: &[u8]) {
        out.extend_from_slice(b"OggS");
        out.push(0);
        out.push(header_type);
        out.extend_from_slice(&granule.to_le_bytes());
        out.extend_from_slice(&1u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.push(1);
        out.push(packet.len() as u8);
        out.extend_from_slice(packet);
    }

    let mut ident = vec![1u8];
    ident.extend_from_slice(b"vorbis");
    ident.extend_from_slice(&0u32.to_le_bytes());
    ident.push(channels);
    ident.extend_from_slice(&rate.to_le_bytes());
    ident.extend_from_slice(&0i32.to_le_bytes());
    ident.extend_from_slice(&160_000i32.to_le_bytes());
    ident.extend_from_slice(&0i32.to_le_bytes());
    ident.push(0xB8);
    ident.push(1);

    let mut out = Vec::new();
    page(&mut out, 2, 0, &ident);
    let last = [0u8; 8];
    out.resize(total_len - (27 + 1 + last.len()), 0);
    page(&mut out, 4, samples, &last);
    assert_eq!(out.len(), total_len);
    out
}

pub fn png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(color));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

/// `<tmp>/Game/Data` holds containers, `<tmp>/Mods` replacement files.
pub struct Install {
    _dir: TempDir,
    pub root: Utf8PathBuf,
    pub game: Utf8PathBuf,
    pub data: Utf8PathBuf,
    pub mods: Utf8PathBuf,
}

impl Install {
    pub fn new() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let game = root.join("Game");
        let data = game.join("Data");
        let mods = root.join("Mods");
        fs::create_dir_all(&data).unwrap();
        fs::create_dir_all(&mods).unwrap();
        Self {
            _dir: dir,
            root,
            game,
            data,
            mods,
        }
    }

    pub fn container(&self, name: &str, objects: Vec<Object>) -> Utf8PathBuf {
        let path = self.data.join(name);
        fs::write(&path, container_bytes(objects)).unwrap();
        path
    }

    pub fn file(&self, relative: &str, bytes: &[u8]) -> Utf8PathBuf {
        let path = self.data.join(relative);
        fs::write(&path, bytes).unwrap();
        path
    }

    pub fn add_mod(&self, name: &str, bytes: &[u8]) -> Utf8PathBuf {
        let path = self.mods.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, bytes).unwrap();
        path
    }

    pub fn context(&self) -> PatchContext {
        PatchContext::new(&self.game, &self.mods, PatcherConfig::default()).unwrap()
    }

    /// `<tmp>/Backups/Game`, the backup tree of this install.
    pub fn backup_root(&self) -> Utf8PathBuf {
        self.root.join("Backups").join("Game")
    }
}

pub fn read(path: &Utf8Path) -> Vec<u8> {
    fs::read(path).unwrap()
}
