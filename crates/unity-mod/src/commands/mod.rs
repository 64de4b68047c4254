mod patch;
mod prune;
mod recover;
mod scan;

pub use patch::{patch_game, PatchArgs};
pub use prune::{prune_backups, PruneArgs};
pub use recover::{recover_game, RecoverArgs};
pub use scan::{scan_mods, ScanArgs};
