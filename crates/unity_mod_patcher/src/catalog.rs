//! Mod catalog: replacement files discovered under a mods directory.
//!
//! Replacement files follow the `<prefix><logical asset name>.<ext>` convention,
//! where the two-character prefix (`RE` by default) is matched case-insensitively
//! and is optional. The extension decides between audio and image; image files are
//! further split into sprites and textures by keywords in their path.
//!
//! A [`Catalog`] keeps the scanned records as an immutable snapshot plus a pending
//! set. Entries leave the pending set only when a container that used them commits,
//! so each request is satisfied at most once per session.

use crate::error::Result;
use crate::kind::AssetKind;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use walkdir::WalkDir;

/// Audio extensions in resolution priority order.
pub const AUDIO_EXTENSIONS: [&str; 4] = ["ogg", "wav", "mp3", "m4a"];

/// Image extensions in resolution priority order.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "tga"];

const TEXTURE_KEYWORDS: [&str; 2] = ["texture", "material"];
const SPRITE_KEYWORDS: [&str; 2] = ["sprite", "icon"];

/// One replacement file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplacementRecord {
    /// Logical asset name: the file stem with the prefix removed.
    pub name: String,
    pub kind: AssetKind,
    pub source: Utf8PathBuf,
    pub byte_len: u64,
}

/// Records found by [`scan`], grouped by kind.
#[derive(Debug, Clone, Default)]
pub struct CatalogResult {
    pub audio: Vec<ReplacementRecord>,
    pub sprites: Vec<ReplacementRecord>,
    pub textures: Vec<ReplacementRecord>,
}

impl CatalogResult {
    pub fn total(&self) -> usize {
        self.audio.len() + self.sprites.len() + self.textures.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReplacementRecord> {
        self.audio
            .iter()
            .chain(self.sprites.iter())
            .chain(self.textures.iter())
    }

    fn push(&mut self, record: ReplacementRecord) {
        match record.kind {
            AssetKind::Audio => self.audio.push(record),
            AssetKind::Sprite => self.sprites.push(record),
            AssetKind::Texture => self.textures.push(record),
        }
    }
}

/// Position of an extension in the combined priority order, if supported.
fn extension_rank(ext: &str) -> Option<usize> {
    AUDIO_EXTENSIONS
        .iter()
        .chain(IMAGE_EXTENSIONS.iter())
        .position(|e| e.eq_ignore_ascii_case(ext))
}

/// Strip `prefix` (case-insensitive) from `stem` if present.
pub fn logical_name<'a>(stem: &'a str, prefix: &str) -> &'a str {
    match stem.get(..prefix.len()) {
        Some(head) if !prefix.is_empty() && head.eq_ignore_ascii_case(prefix) => {
            &stem[prefix.len()..]
        }
        _ => stem,
    }
}

/// Decide between sprite and texture from keywords in the path below the mods root.
///
/// Sprite keywords win over texture keywords; paths matching neither are sprites.
pub fn classify_image(relative: &Utf8Path) -> AssetKind {
    let lowered = relative.as_str().to_ascii_lowercase();
    let is_ui_token = lowered
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|token| token == "ui");
    if is_ui_token || SPRITE_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return AssetKind::Sprite;
    }
    if TEXTURE_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return AssetKind::Texture;
    }
    AssetKind::Sprite
}

fn kind_for(path: &Utf8Path, root: &Utf8Path) -> Option<AssetKind> {
    let ext = path.extension()?;
    if AUDIO_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
        return Some(AssetKind::Audio);
    }
    if IMAGE_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
        let relative = path.strip_prefix(root).unwrap_or(path);
        return Some(classify_image(relative));
    }
    None
}

/// Supported files under `root`, in deterministic (sorted) walk order.
fn walk_files(root: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(path) = Utf8PathBuf::from_path_buf(entry.into_path()) else {
            tracing::warn!("Skipping non UTF-8 path under {}", root);
            continue;
        };
        if path.extension().and_then(extension_rank).is_some() {
            files.push(path);
        }
    }
    Ok(files)
}

/// Walk `root` and build typed replacement records.
///
/// When several files map to the same logical name and media family (audio or
/// image), the one with the highest-priority extension wins.
pub fn scan(root: &Utf8Path, prefix: &str) -> Result<CatalogResult> {
    let mut best: HashMap<(String, bool), (usize, ReplacementRecord)> = HashMap::new();
    let mut order = Vec::new();

    for path in walk_files(root)? {
        let (Some(stem), Some(ext)) = (path.file_stem(), path.extension()) else {
            continue;
        };
        let name = logical_name(stem, prefix);
        if name.is_empty() {
            tracing::warn!("Ignoring replacement with empty asset name: {}", path);
            continue;
        }
        let (Some(kind), Some(rank)) = (kind_for(&path, root), extension_rank(ext)) else {
            continue;
        };
        let byte_len = std::fs::metadata(&path)?.len();
        let record = ReplacementRecord {
            name: name.to_string(),
            kind,
            source: path.clone(),
            byte_len,
        };

        let key = (record.name.clone(), kind.is_image());
        match best.get(&key).map(|(existing, _)| *existing) {
            Some(existing) if existing <= rank => {
                tracing::debug!("Shadowed replacement {} for {}", path, key.0);
            }
            Some(_) => {
                best.insert(key, (rank, record));
            }
            None => {
                order.push(key.clone());
                best.insert(key, (rank, record));
            }
        }
    }

    let mut result = CatalogResult::default();
    for key in order {
        if let Some((_, record)) = best.remove(&key) {
            result.push(record);
        }
    }
    tracing::info!(
        "Scanned mods root={} audio={} sprites={} textures={}",
        root,
        result.audio.len(),
        result.sprites.len(),
        result.textures.len()
    );
    Ok(result)
}

/// Replacement records with at-most-once consumption.
#[derive(Debug, Clone)]
pub struct Catalog {
    root: Utf8PathBuf,
    prefix: String,
    records: Vec<ReplacementRecord>,
    pending: BTreeSet<usize>,
}

impl Catalog {
    /// Scan `root` and mark every record pending.
    pub fn load(root: &Utf8Path, prefix: &str) -> Result<Self> {
        let result = scan(root, prefix)?;
        Ok(Self::from_result(root, prefix, result))
    }

    pub fn from_result(root: &Utf8Path, prefix: &str, result: CatalogResult) -> Self {
        let records: Vec<_> = result.iter().cloned().collect();
        let pending = (0..records.len()).collect();
        Self {
            root: root.to_path_buf(),
            prefix: prefix.to_string(),
            records,
            pending,
        }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn records(&self) -> &[ReplacementRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Pending records with their catalog index.
    pub fn pending(&self) -> impl Iterator<Item = (usize, &ReplacementRecord)> {
        self.pending.iter().map(|&i| (i, &self.records[i]))
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn pending_count_for(&self, name: &str) -> usize {
        self.pending()
            .filter(|(_, record)| record.name == name)
            .count()
    }

    pub fn is_pending(&self, index: usize) -> bool {
        self.pending.contains(&index)
    }

    /// Remove a record from the pending set. Returns `false` if it was already consumed.
    pub fn consume(&mut self, index: usize) -> bool {
        self.pending.remove(&index)
    }

    /// Find the replacement file for a logical asset name.
    ///
    /// Looks for `<prefix><name>.<ext>` directly under the root in extension
    /// priority order, then walks the whole tree comparing prefix-stripped stems
    /// case-insensitively. Ties go to the higher-priority extension, then to the
    /// first path in sorted order.
    pub fn resolve(&self, asset_name: &str) -> Result<Option<Utf8PathBuf>> {
        for ext in AUDIO_EXTENSIONS.iter().chain(IMAGE_EXTENSIONS.iter()) {
            let candidate = self
                .root
                .join(format!("{}{}.{}", self.prefix, asset_name, ext));
            if candidate.is_file() {
                return Ok(Some(candidate));
            }
        }

        let mut best: Option<(usize, Utf8PathBuf)> = None;
        for path in walk_files(&self.root)? {
            let (Some(stem), Some(ext)) = (path.file_stem(), path.extension()) else {
                continue;
            };
            if !logical_name(stem, &self.prefix).eq_ignore_ascii_case(asset_name) {
                continue;
            }
            let Some(rank) = extension_rank(ext) else {
                continue;
            };
            if best.as_ref().map_or(true, |(r, _)| rank < *r) {
                best = Some((rank, path));
            }
        }
        Ok(best.map(|(_, path)| path))
    }
}
