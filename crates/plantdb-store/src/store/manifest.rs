//! `manifest.bin`: a snapshot of every readable record's id and version,
//! used to detect records that went missing or changed behind the store.

use super::PackStore;
use plantdb_core::error::Error;
use plantdb_core::types::{ManifestEntry, ManifestKind};
use plantdb_format::{decode_manifest, decode_pack, encode_manifest};
use plantdb_format::{Collection, RecordKind};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StaleEntry {
    pub listed: ManifestEntry,
    pub stored_version: u16,
}

/// Differences between `manifest.bin` and the records on the medium.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManifestReport {
    /// Listed but absent or unreadable.
    pub missing: Vec<ManifestEntry>,
    /// Stored with a different version than listed.
    pub stale: Vec<StaleEntry>,
    /// Readable but not listed.
    pub unlisted: Vec<ManifestEntry>,
}

impl ManifestReport {
    pub fn is_consistent(&self) -> bool {
        self.missing.is_empty() && self.stale.is_empty() && self.unlisted.is_empty()
    }
}

impl PackStore {
    /// Rewrites the manifest from the readable records; returns the entry count.
    pub fn write_manifest(&self) -> Result<usize, Error> {
        let _guard = self.lock_mounted()?;
        let entries = self.scan_entries()?;
        let bytes = encode_manifest(&entries)?;
        self.commit(
            &self.layout.manifest_temp_path(),
            &self.layout.manifest_path(),
            &bytes,
            RecordKind::Manifest,
        )?;
        info!(entries = entries.len(), "wrote manifest");
        Ok(entries.len())
    }

    pub fn read_manifest(&self) -> Result<Vec<ManifestEntry>, Error> {
        let _guard = self.lock_mounted()?;
        self.load_manifest()
    }

    /// Compares the stored manifest against a fresh scan.
    pub fn check_manifest(&self) -> Result<ManifestReport, Error> {
        let _guard = self.lock_mounted()?;
        let listed = self.load_manifest()?;
        let mut actual: BTreeMap<(ManifestKind, u16), ManifestEntry> = self
            .scan_entries()?
            .into_iter()
            .map(|e| (key(&e), e))
            .collect();

        let mut report = ManifestReport::default();
        for entry in listed {
            match actual.remove(&key(&entry)) {
                None => report.missing.push(entry),
                Some(found) if found.version != entry.version => report.stale.push(StaleEntry {
                    listed: entry,
                    stored_version: found.version,
                }),
                Some(_) => {}
            }
        }
        report.unlisted = actual.into_values().collect();
        if !report.is_consistent() {
            warn!(
                missing = report.missing.len(),
                stale = report.stale.len(),
                unlisted = report.unlisted.len(),
                "manifest out of date"
            );
        }
        Ok(report)
    }

    fn load_manifest(&self) -> Result<Vec<ManifestEntry>, Error> {
        let path = self.layout.manifest_path();
        let bytes = self.medium.read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound {
                    kind: RecordKind::Manifest.name(),
                    id: 0,
                }
            } else {
                e.into()
            }
        })?;
        Ok(decode_manifest(&bytes)?)
    }

    // Plants first, then packs, each in directory order.
    fn scan_entries(&self) -> Result<Vec<ManifestEntry>, Error> {
        let mut entries = Vec::new();
        for plant_id in self.candidate_ids(Collection::Plants)? {
            match self.load_plant(plant_id) {
                Ok(plant) => entries.push(ManifestEntry {
                    kind: ManifestKind::Plant,
                    id: plant_id,
                    version: plant.version,
                }),
                Err(e) => warn!(plant_id, error = %e, "leaving unreadable plant out of manifest"),
            }
        }
        for pack_id in self.candidate_ids(Collection::Packs)? {
            let pack = self
                .read_record(Collection::Packs, pack_id)
                .and_then(|bytes| decode_pack(&bytes).map_err(Error::from));
            match pack {
                Ok(pack) => entries.push(ManifestEntry {
                    kind: ManifestKind::Pack,
                    id: pack_id,
                    version: pack.version,
                }),
                Err(e) => warn!(pack_id, error = %e, "leaving unreadable pack out of manifest"),
            }
        }
        Ok(entries)
    }
}

fn key(entry: &ManifestEntry) -> (ManifestKind, u16) {
    (entry.kind, entry.id)
}
