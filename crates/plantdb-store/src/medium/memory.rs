use super::{DirEntry, EntryKind, Medium, VolumeStats};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

const DEFAULT_CAPACITY: u64 = 8 * 1024 * 1024;

/// Operation a [`Fault`] applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultOp {
    Read,
    Write,
    Remove,
    Rename,
    /// The write reports success but the last byte lands flipped.
    CorruptWrite,
}

/// A deterministic failure rule for [`MemoryMedium`].
///
/// Matches any path whose file name contains `pattern`; fires `remaining`
/// times, or forever when `None`.
#[derive(Debug, Clone)]
pub struct Fault {
    op: FaultOp,
    pattern: String,
    error: io::ErrorKind,
    remaining: Option<u32>,
}

impl Fault {
    pub fn new(op: FaultOp, pattern: &str) -> Self {
        Self {
            op,
            pattern: pattern.to_string(),
            error: io::ErrorKind::Other,
            remaining: None,
        }
    }

    pub fn rename(pattern: &str) -> Self {
        Self::new(FaultOp::Rename, pattern)
    }

    pub fn write(pattern: &str) -> Self {
        Self::new(FaultOp::Write, pattern)
    }

    pub fn corrupt_write(pattern: &str) -> Self {
        Self::new(FaultOp::CorruptWrite, pattern)
    }

    pub fn remove(pattern: &str) -> Self {
        Self::new(FaultOp::Remove, pattern)
    }

    pub fn read(pattern: &str) -> Self {
        Self::new(FaultOp::Read, pattern)
    }

    #[must_use]
    pub const fn with_error(mut self, kind: io::ErrorKind) -> Self {
        self.error = kind;
        self
    }

    #[must_use]
    pub const fn times(mut self, n: u32) -> Self {
        self.remaining = Some(n);
        self
    }

    fn matches(&self, op: FaultOp, path: &Path) -> bool {
        self.op == op
            && self.remaining != Some(0)
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.contains(&self.pattern))
    }
}

#[derive(Debug)]
struct State {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
    faults: Vec<Fault>,
    capacity: u64,
}

impl State {
    fn used(&self) -> u64 {
        self.files.values().map(|v| v.len() as u64).sum()
    }

    // Consumes one firing of the first matching fault.
    fn trip(&mut self, op: FaultOp, path: &Path) -> Option<io::ErrorKind> {
        let fault = self.faults.iter_mut().find(|f| f.matches(op, path))?;
        if let Some(n) = fault.remaining.as_mut() {
            *n -= 1;
        }
        Some(fault.error)
    }

    fn require_parent(&self, path: &Path) -> io::Result<()> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !self.dirs.contains(parent) => {
                Err(not_found(parent))
            }
            _ => Ok(()),
        }
    }
}

/// An ordered in-memory volume with fault injection.
#[derive(Debug)]
pub struct MemoryMedium {
    state: Mutex<State>,
}

impl Default for MemoryMedium {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    /// A volume that refuses writes past `capacity` bytes of file data.
    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            state: Mutex::new(State {
                files: BTreeMap::new(),
                dirs: BTreeSet::new(),
                faults: Vec::new(),
                capacity,
            }),
        }
    }

    pub fn inject(&self, fault: Fault) {
        self.lock().faults.push(fault);
    }

    pub fn clear_faults(&self) {
        self.lock().faults.clear();
    }

    /// Every file and its contents, for comparing whole-volume state.
    pub fn snapshot(&self) -> BTreeMap<PathBuf, Vec<u8>> {
        self.lock().files.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} not found", path.display()),
    )
}

fn injected(kind: io::ErrorKind, path: &Path) -> io::Error {
    io::Error::new(kind, format!("injected fault on {}", path.display()))
}

impl Medium for MemoryMedium {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let mut state = self.lock();
        if let Some(kind) = state.trip(FaultOp::Read, path) {
            return Err(injected(kind, path));
        }
        state.files.get(path).cloned().ok_or_else(|| not_found(path))
    }

    fn write_synced(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.lock();
        if let Some(kind) = state.trip(FaultOp::Write, path) {
            return Err(injected(kind, path));
        }
        state.require_parent(path)?;
        if state.dirs.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{} is a directory", path.display()),
            ));
        }
        let replaced = state.files.get(path).map_or(0, |v| v.len() as u64);
        if state.used() - replaced + bytes.len() as u64 > state.capacity {
            return Err(io::Error::new(
                io::ErrorKind::StorageFull,
                "no space left on volume",
            ));
        }
        let mut data = bytes.to_vec();
        if state.trip(FaultOp::CorruptWrite, path).is_some() {
            if let Some(last) = data.last_mut() {
                *last ^= 0xFF;
            }
        }
        state.files.insert(path.to_path_buf(), data);
        Ok(())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        let mut state = self.lock();
        if let Some(kind) = state.trip(FaultOp::Remove, path) {
            return Err(injected(kind, path));
        }
        state
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut state = self.lock();
        if let Some(kind) = state.trip(FaultOp::Rename, from) {
            return Err(injected(kind, from));
        }
        state.require_parent(to)?;
        let data = state.files.remove(from).ok_or_else(|| not_found(from))?;
        state.files.insert(to.to_path_buf(), data);
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut state = self.lock();
        for dir in path.ancestors() {
            if dir.as_os_str().is_empty() {
                break;
            }
            if state.files.contains_key(dir) {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} is a file", dir.display()),
                ));
            }
            state.dirs.insert(dir.to_path_buf());
        }
        Ok(())
    }

    fn entry_kind(&self, path: &Path) -> io::Result<Option<EntryKind>> {
        let state = self.lock();
        if state.files.contains_key(path) {
            Ok(Some(EntryKind::File))
        } else if state.dirs.contains(path) {
            Ok(Some(EntryKind::Dir))
        } else {
            Ok(None)
        }
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let state = self.lock();
        if !state.dirs.contains(path) {
            return Err(not_found(path));
        }
        let child_name = |p: &PathBuf| -> Option<String> {
            (p.parent() == Some(path))
                .then(|| p.file_name()?.to_str().map(str::to_owned))
                .flatten()
        };
        let mut entries: Vec<DirEntry> = state
            .files
            .keys()
            .filter_map(|p| {
                child_name(p).map(|name| DirEntry {
                    name,
                    kind: EntryKind::File,
                })
            })
            .chain(state.dirs.iter().filter_map(|p| {
                child_name(p).map(|name| DirEntry {
                    name,
                    kind: EntryKind::Dir,
                })
            }))
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn volume_stats(&self, _path: &Path) -> io::Result<VolumeStats> {
        let state = self.lock();
        Ok(VolumeStats {
            total_bytes: state.capacity,
            free_bytes: state.capacity.saturating_sub(state.used()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn medium_with_dir() -> (MemoryMedium, PathBuf) {
        let medium = MemoryMedium::new();
        let dir = PathBuf::from("/vol/plants");
        medium.create_dir_all(&dir).unwrap();
        (medium, dir)
    }

    #[test]
    fn write_requires_parent_directory() {
        let medium = MemoryMedium::new();
        let err = medium
            .write_synced(Path::new("/missing/p_0001.bin"), b"x")
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn read_dir_lists_direct_children_in_order() {
        let (medium, dir) = medium_with_dir();
        medium.write_synced(&dir.join("p_0002.bin"), b"b").unwrap();
        medium.write_synced(&dir.join("p_0001.bin"), b"a").unwrap();
        medium.create_dir_all(&dir.join("nested/deeper")).unwrap();
        medium
            .write_synced(&dir.join("nested/p_0003.bin"), b"c")
            .unwrap();

        let entries = medium.read_dir(&dir).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["nested", "p_0001.bin", "p_0002.bin"]);
        assert_eq!(entries[0].kind, EntryKind::Dir);
    }

    #[test]
    fn counted_fault_fires_then_clears() {
        let (medium, dir) = medium_with_dir();
        let from = dir.join("p_0001.tmp");
        let to = dir.join("p_0001.bin");
        medium.write_synced(&from, b"x").unwrap();
        medium.inject(Fault::rename(".tmp").times(1));

        assert!(medium.rename(&from, &to).is_err());
        medium.rename(&from, &to).unwrap();
        assert_eq!(medium.read(&to).unwrap(), b"x");
    }

    #[test]
    fn corrupt_write_flips_last_byte() {
        let (medium, dir) = medium_with_dir();
        let path = dir.join("p_0001.tmp");
        medium.inject(Fault::corrupt_write("p_0001"));
        medium.write_synced(&path, &[1, 2, 3]).unwrap();
        assert_eq!(medium.read(&path).unwrap(), [1, 2, 0xFC]);
    }

    #[test]
    fn capacity_limits_writes() {
        let medium = MemoryMedium::with_capacity(4);
        medium.create_dir_all(Path::new("/v")).unwrap();
        medium.write_synced(Path::new("/v/a"), b"abc").unwrap();
        // Overwriting reuses the old file's space.
        medium.write_synced(Path::new("/v/a"), b"abcd").unwrap();
        let err = medium.write_synced(Path::new("/v/b"), b"e").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::StorageFull);

        let stats = medium.volume_stats(Path::new("/v")).unwrap();
        assert_eq!(stats.total_bytes, 4);
        assert_eq!(stats.free_bytes, 0);
        assert_eq!(stats.used_bytes(), 4);
    }
}
