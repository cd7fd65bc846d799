use crate::medium::Medium;
use std::io;
use std::path::PathBuf;
use tracing::{debug, error, warn};

/// Persisted count of successful mutations, used by listeners to detect
/// stale cached listings. Never a source of truth for content.
#[derive(Debug)]
pub(crate) struct ChangeCounter {
    path: PathBuf,
    value: u32,
}

impl ChangeCounter {
    /// Reads the stored value; an absent or short file counts as 0.
    pub(crate) fn load(medium: &dyn Medium, path: PathBuf) -> Self {
        let value = match medium.read(&path) {
            Ok(bytes) => match bytes.get(..4).and_then(|b| <[u8; 4]>::try_from(b).ok()) {
                Some(raw) => u32::from_le_bytes(raw),
                None => {
                    warn!(path = %path.display(), len = bytes.len(), "short change counter file");
                    0
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read change counter");
                0
            }
        };
        debug!(value, "loaded change counter");
        Self { path, value }
    }

    pub(crate) const fn get(&self) -> u32 {
        self.value
    }

    /// Advances and flushes the counter. A failed flush is logged; the
    /// mutation it records has already been committed.
    pub(crate) fn bump(&mut self, medium: &dyn Medium) {
        self.value = self.value.wrapping_add(1);
        if let Err(e) = medium.write_synced(&self.path, &self.value.to_le_bytes()) {
            error!(path = %self.path.display(), error = %e, "failed to persist change counter");
        }
    }
}
