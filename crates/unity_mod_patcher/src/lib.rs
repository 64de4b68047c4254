//! Asset replacement for Unity games.
//!
//! This crate scans a mods directory for replacement audio and images, finds the
//! records they name inside a game's serialized asset containers, and rewrites those
//! containers in place. It supports:
//!
//! - **Audio clips**: WAV, Ogg Vorbis, MP3 and M4A streamed into companion `.resS` blobs
//! - **Textures and sprites**: images decoded, resized and stored inline as RGBA32
//! - **Atomic commits**: every file is staged next to its target and renamed over it
//! - **Rollback**: every touched file is backed up first and restored on failure
//!
//! # Example
//!
//! ```no_run
//! use unity_mod_patcher::{run_session, PatchContext, PatcherConfig};
//! use camino::Utf8Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let game = Utf8Path::new("C:/Games/Example/Example_Data");
//! let mods = Utf8Path::new("C:/Games/Example/Mods");
//!
//! let mut ctx = PatchContext::new(game, mods, PatcherConfig::default())?;
//! match run_session(&mut ctx) {
//!     Ok(report) => println!("{report}"),
//!     Err(failure) => eprintln!("patch failed: {failure}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod backup;
pub mod catalog;
pub mod config;
pub mod container;
pub mod context;
pub mod error;
pub mod kind;
pub mod lock;
pub mod resource;
pub mod session;
pub mod staging;
pub mod strategy;

// Re-export main types
pub use backup::{BackupManager, PruneReport, RecoveryReport};
pub use catalog::{Catalog, CatalogResult, ReplacementRecord};
pub use config::PatcherConfig;
pub use container::{AssetRecord, ContainerFile};
pub use context::PatchContext;
pub use error::{Error, Result};
pub use kind::AssetKind;
pub use session::{run_session, PatchOutcome, PatchReport, RecoveryStatus, SessionFailure};
pub use strategy::{ReplacementStrategy, StrategyOutcome};
