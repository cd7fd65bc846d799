use super::{DirEntry, EntryKind, Medium, VolumeStats};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

/// The host filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsMedium;

impl Medium for FsMedium {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write_synced(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut f = File::create(path)?;
        f.write_all(bytes)?;
        f.sync_all()
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn entry_kind(&self, path: &Path) -> io::Result<Option<EntryKind>> {
        match fs::metadata(path) {
            Ok(meta) if meta.is_dir() => Ok(Some(EntryKind::Dir)),
            Ok(_) => Ok(Some(EntryKind::File)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            // Names that are not UTF-8 can never match a record pattern.
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let kind = if entry.file_type()?.is_dir() {
                EntryKind::Dir
            } else {
                EntryKind::File
            };
            entries.push(DirEntry { name, kind });
        }
        // readdir order is filesystem-defined; pagination needs it repeatable.
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn volume_stats(&self, path: &Path) -> io::Result<VolumeStats> {
        Ok(VolumeStats {
            total_bytes: fs4::total_space(path)?,
            free_bytes: fs4::free_space(path)?,
        })
    }
}
