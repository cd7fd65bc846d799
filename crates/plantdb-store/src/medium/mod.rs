//! The filesystem the store runs on.
//!
//! Everything the store persists goes through [`Medium`], so the same update
//! protocol runs against a real directory or an in-memory volume with injected
//! faults.

mod fs;
mod memory;

pub use fs::FsMedium;
pub use memory::{Fault, FaultOp, MemoryMedium};

use std::fmt::Debug;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VolumeStats {
    pub total_bytes: u64,
    pub free_bytes: u64,
}

impl VolumeStats {
    pub const fn used_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.free_bytes)
    }
}

/// Blocking file operations. `rename` must be atomic with respect to power
/// loss: afterwards either the old or the new name resolves, never neither.
pub trait Medium: Send + Sync + Debug {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Creates or truncates `path`, writes `bytes` and syncs before returning.
    fn write_synced(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    fn remove(&self, path: &Path) -> io::Result<()>;

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// `Ok(None)` when nothing exists at `path`.
    fn entry_kind(&self, path: &Path) -> io::Result<Option<EntryKind>>;

    /// Entries of `path` in a stable order.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    fn volume_stats(&self, path: &Path) -> io::Result<VolumeStats>;
}
