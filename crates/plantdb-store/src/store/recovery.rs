use super::PackStore;
use crate::medium::EntryKind;
use plantdb_core::error::Error;
use plantdb_format::{decode_record, Collection, RecordKind};
use std::path::Path;
use tracing::{info, warn};

impl PackStore {
    /// Settles temp files left by an interrupted commit.
    ///
    /// A temp file whose final file is missing and which verifies is
    /// promoted; every other temp file is removed.
    pub(super) fn recover(&self) -> Result<(), Error> {
        let _guard = self.lock();
        for collection in [Collection::Plants, Collection::Packs] {
            let dir = self.layout.dir(collection);
            for entry in self.medium.read_dir(&dir)? {
                if entry.kind != EntryKind::File {
                    continue;
                }
                let Some(id) = collection.parse_temp_file_name(&entry.name) else {
                    continue;
                };
                let temp = self.layout.temp_path(collection, id);
                let dest = self.layout.record_path(collection, id);
                self.settle(&temp, &dest, collection.record_kind());
            }
        }

        let temp = self.layout.manifest_temp_path();
        if self.medium.entry_kind(&temp)?.is_some() {
            self.settle(&temp, &self.layout.manifest_path(), RecordKind::Manifest);
        }
        Ok(())
    }

    /// Failures are logged and left for the next mount.
    fn settle(&self, temp: &Path, dest: &Path, kind: RecordKind) {
        let orphaned = match self.medium.entry_kind(dest) {
            Ok(entry) => entry.is_none(),
            Err(err) => {
                warn!(path = %dest.display(), error = %err, "cannot stat record; keeping temp file");
                return;
            }
        };
        let verified = orphaned
            && self
                .medium
                .read(temp)
                .is_ok_and(|bytes| decode_record(&bytes, kind).is_ok());
        if verified {
            match self.medium.rename(temp, dest) {
                Ok(()) => info!(path = %dest.display(), "promoted verified temp file"),
                Err(err) => warn!(path = %temp.display(), error = %err, "cannot promote temp file"),
            }
        } else {
            match self.medium.remove(temp) {
                Ok(()) => warn!(path = %temp.display(), orphaned, "discarded temp file"),
                Err(err) => warn!(path = %temp.display(), error = %err, "cannot discard temp file"),
            }
        }
    }
}
