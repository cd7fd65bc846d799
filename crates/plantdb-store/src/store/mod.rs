//! The record store: one lock, one change counter, files under one root.
//!
//! Every public operation that touches the medium holds the store lock for
//! its whole duration, so a version check and the write it guards can never
//! interleave with another mutation.

mod manifest;
mod packs;
mod recovery;

pub use manifest::{ManifestReport, StaleEntry};
pub use packs::{PackDeleteReport, PackInstallReport};

use crate::counter::ChangeCounter;
use crate::fao56;
use crate::medium::{EntryKind, FsMedium, Medium};
use crate::validate::validate_plant;
use plantdb_core::error::{Error, ValidationError};
use plantdb_core::result::InstallOutcome;
use plantdb_core::types::{
    PlantRecord, PlantSummary, StorageStats, StorageStatus, PACK_ID_BUILTIN, PLANT_ID_INVALID,
};
use plantdb_format::{decode_pack, decode_plant, decode_record, encode_plant};
use plantdb_format::{Collection, RecordKind, StoreLayout};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Which decoded plants a listing emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlantFilter {
    #[default]
    All,
    /// Plants owned by one pack; `Pack(0)` selects the built-in set.
    Pack(u16),
    /// Plants owned by any installed pack.
    Custom,
}

impl PlantFilter {
    pub const fn admits(self, plant: &PlantRecord) -> bool {
        match self {
            Self::All => true,
            Self::Pack(id) => plant.pack_id == id,
            Self::Custom => plant.pack_id != PACK_ID_BUILTIN,
        }
    }
}

/// One page of a plant listing.
///
/// `offset` counts file names matching the record pattern, whether or not
/// they decode; `max` bounds the emitted entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
    pub offset: usize,
    pub max: usize,
    pub filter: PlantFilter,
}

impl ListQuery {
    pub const fn new(offset: usize, max: usize) -> Self {
        Self {
            offset,
            max,
            filter: PlantFilter::All,
        }
    }

    #[must_use]
    pub const fn with_filter(mut self, filter: PlantFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// Result of [`PackStore::page_plants`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlantPage {
    pub entries: Vec<PlantSummary>,
    /// Record file names present, counted without decoding.
    pub total: usize,
    /// Offset that continues the scan, or `None` once every name was visited.
    pub next_offset: Option<usize>,
}

/// A derived value could not be computed; `value` is the engine default.
#[derive(Debug, Error)]
#[error("{cause} (using default {value})")]
pub struct Defaulted {
    pub value: f32,
    #[source]
    pub cause: Error,
}

#[derive(Debug)]
struct Inner {
    mounted: bool,
    counter: ChangeCounter,
}

#[derive(Debug)]
pub struct PackStore {
    layout: StoreLayout,
    medium: Arc<dyn Medium>,
    builtin_count: u16,
    inner: Mutex<Inner>,
}

impl PackStore {
    /// Mounts the store at `layout`, creating its directories, settling any
    /// temp files left by an interrupted write, and loading the change counter.
    pub fn open(
        layout: StoreLayout,
        medium: Arc<dyn Medium>,
        builtin_count: u16,
    ) -> Result<Self, Error> {
        for collection in [Collection::Plants, Collection::Packs] {
            medium.create_dir_all(&layout.dir(collection))?;
        }
        let counter = ChangeCounter::load(medium.as_ref(), layout.counter_path());
        let store = Self {
            layout,
            medium,
            builtin_count,
            inner: Mutex::new(Inner {
                mounted: true,
                counter,
            }),
        };
        store.recover()?;
        info!(
            root = %store.layout.root().display(),
            builtin_count,
            change_counter = store.change_counter(),
            "record store mounted"
        );
        Ok(store)
    }

    /// [`PackStore::open`] on the host filesystem.
    pub fn open_dir(root: impl Into<PathBuf>, builtin_count: u16) -> Result<Self, Error> {
        Self::open(StoreLayout::new(root), Arc::new(FsMedium), builtin_count)
    }

    pub const fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub const fn builtin_count(&self) -> u16 {
        self.builtin_count
    }

    pub fn is_mounted(&self) -> bool {
        self.lock().mounted
    }

    /// Refuses further operations; stats report `NotReady` from now on.
    pub fn unmount(&self) {
        self.lock().mounted = false;
        info!("record store unmounted");
    }

    pub fn change_counter(&self) -> u32 {
        self.lock().counter.get()
    }

    pub fn get_plant(&self, plant_id: u16) -> Result<PlantRecord, Error> {
        let _guard = self.lock_mounted()?;
        self.load_plant(plant_id)
    }

    /// Validates and installs `plant` unless an equal or newer version is stored.
    pub fn install_plant(&self, plant: &PlantRecord) -> Result<InstallOutcome, Error> {
        validate_plant(plant, self.builtin_count).inspect_err(|e| {
            warn!(plant_id = plant.plant_id, error = %e, "rejected plant");
        })?;
        let bytes = encode_plant(plant)?;

        let mut inner = self.lock_mounted()?;
        let outcome =
            self.replace_locked(Collection::Plants, plant.plant_id, plant.version, &bytes)?;
        if outcome.changed() {
            inner.counter.bump(self.medium.as_ref());
            info!(
                plant_id = plant.plant_id,
                version = plant.version,
                ?outcome,
                "installed plant"
            );
        }
        Ok(outcome)
    }

    pub fn delete_plant(&self, plant_id: u16) -> Result<(), Error> {
        if plant_id == 0 || plant_id == PLANT_ID_INVALID {
            return Err(ValidationError::ReservedPlantId(plant_id).into());
        }
        let mut inner = self.lock_mounted()?;
        let path = self.layout.record_path(Collection::Plants, plant_id);
        match self.medium.remove(&path) {
            Ok(()) => {
                inner.counter.bump(self.medium.as_ref());
                info!(plant_id, "deleted plant");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(plant_id, "delete of absent plant");
                Err(Error::NotFound {
                    kind: RecordKind::Plant.name(),
                    id: plant_id,
                })
            }
            Err(e) => {
                error!(plant_id, path = %path.display(), error = %e, "failed to delete plant");
                Err(e.into())
            }
        }
    }

    /// One page of plant summaries, in directory order.
    ///
    /// The skip budget is spent on every candidate name before anything is
    /// decoded; after that, unreadable files and filtered-out plants are
    /// passed over without being emitted.
    pub fn list_plants(&self, query: &ListQuery) -> Result<Vec<PlantSummary>, Error> {
        self.page_plants(query).map(|page| page.entries)
    }

    /// [`list_plants`](Self::list_plants) plus the name count and a
    /// continuation offset, all taken under one lock.
    pub fn page_plants(&self, query: &ListQuery) -> Result<PlantPage, Error> {
        let _guard = self.lock_mounted()?;
        let ids: Vec<u16> = self.candidate_ids(Collection::Plants)?.collect();
        let mut page = PlantPage {
            total: ids.len(),
            ..PlantPage::default()
        };
        if query.max == 0 {
            return Ok(page);
        }
        for (pos, &plant_id) in ids.iter().enumerate().skip(query.offset) {
            if page.entries.len() >= query.max {
                page.next_offset = Some(pos);
                break;
            }
            match self.load_plant(plant_id) {
                Ok(plant) if query.filter.admits(&plant) => page.entries.push(plant.summary()),
                Ok(_) => {}
                Err(e) => warn!(plant_id, error = %e, "skipping unreadable plant file"),
            }
        }
        Ok(page)
    }

    /// Plant files present by name; nothing is decoded.
    pub fn plant_count(&self) -> Result<usize, Error> {
        let _guard = self.lock_mounted()?;
        Ok(self.candidate_ids(Collection::Plants)?.count())
    }

    /// Capacity, counts and change counter. Never fails: an unmounted store
    /// reports `NotReady` and a medium failure reports `Error`.
    pub fn stats(&self) -> StorageStats {
        let inner = self.lock();
        let mut stats = StorageStats {
            builtin_count: self.builtin_count,
            ..StorageStats::default()
        };
        if !inner.mounted {
            stats.status = StorageStatus::NotReady;
            return stats;
        }
        stats.change_counter = inner.counter.get();

        match self.medium.volume_stats(self.layout.root()) {
            Ok(volume) => {
                stats.total_bytes = volume.total_bytes;
                stats.free_bytes = volume.free_bytes;
                stats.used_bytes = volume.used_bytes();
            }
            Err(e) => {
                error!(error = %e, "failed to read volume statistics");
                stats.status = StorageStatus::Error;
            }
        }

        let plants = self.candidate_ids(Collection::Plants);
        let packs = self.candidate_ids(Collection::Packs);
        match (plants, packs) {
            (Ok(plants), Ok(packs)) => {
                let ids: Vec<u16> = plants.collect();
                let custom = ids.iter().filter(|id| **id > self.builtin_count).count();
                stats.plant_count = saturate(ids.len());
                stats.custom_plant_count = saturate(custom);
                stats.pack_count = saturate(packs.count());
            }
            (Err(e), _) | (_, Err(e)) => {
                error!(error = %e, "failed to count records");
                stats.status = StorageStatus::Error;
            }
        }
        stats
    }

    /// FAO-56 Kc for `plant_id` at `day` days after planting.
    pub fn crop_coefficient(&self, plant_id: u16, day: u16) -> Result<f32, Defaulted> {
        self.plant_for_derivation(plant_id)
            .map(|plant| fao56::crop_coefficient(&plant, day))
            .map_err(|cause| Defaulted {
                value: fao56::DEFAULT_KC,
                cause,
            })
    }

    /// Root depth in millimetres for `plant_id` at `day` days after planting.
    pub fn root_depth_mm(&self, plant_id: u16, day: u16) -> Result<f32, Defaulted> {
        self.plant_for_derivation(plant_id)
            .map(|plant| fao56::root_depth_mm(&plant, day))
            .map_err(|cause| Defaulted {
                value: fao56::DEFAULT_ROOT_DEPTH_MM,
                cause,
            })
    }

    fn plant_for_derivation(&self, plant_id: u16) -> Result<PlantRecord, Error> {
        if plant_id == 0 {
            warn!("no plant configured (plant_id 0)");
            return Err(ValidationError::NoPlantSelected.into());
        }
        self.get_plant(plant_id).inspect_err(|e| {
            error!(plant_id, error = %e, "failed to load plant for derivation");
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_mounted(&self) -> Result<MutexGuard<'_, Inner>, Error> {
        let inner = self.lock();
        if inner.mounted {
            Ok(inner)
        } else {
            Err(Error::NotReady)
        }
    }

    fn read_record(&self, collection: Collection, id: u16) -> Result<Vec<u8>, Error> {
        let path = self.layout.record_path(collection, id);
        self.medium.read(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                Error::NotFound {
                    kind: collection.record_kind().name(),
                    id,
                }
            } else {
                error!(path = %path.display(), error = %e, "failed to read record");
                e.into()
            }
        })
    }

    fn load_plant(&self, plant_id: u16) -> Result<PlantRecord, Error> {
        let bytes = self.read_record(Collection::Plants, plant_id)?;
        Ok(decode_plant(&bytes)?)
    }

    /// Ids of record files in directory order, taken from their names.
    fn candidate_ids(
        &self,
        collection: Collection,
    ) -> Result<impl Iterator<Item = u16>, Error> {
        let entries = self.medium.read_dir(&self.layout.dir(collection))?;
        Ok(entries
            .into_iter()
            .filter(|e| e.kind == EntryKind::File)
            .filter_map(move |e| collection.parse_file_name(&e.name)))
    }

    /// Version of the readable record at `id`, if any. Must hold the lock.
    fn stored_version(&self, collection: Collection, id: u16) -> Result<Option<u16>, Error> {
        let bytes = match self.read_record(collection, id) {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        let decoded = match collection {
            Collection::Plants => decode_plant(&bytes).map(|p| p.version),
            Collection::Packs => decode_pack(&bytes).map(|p| p.version),
        };
        match decoded {
            Ok(version) => Ok(Some(version)),
            Err(e) => {
                warn!(
                    kind = collection.record_kind().name(),
                    id,
                    error = %e,
                    "stored record is unreadable; it will be replaced"
                );
                Ok(None)
            }
        }
    }

    /// Version-checked replace of one record. Must hold the lock.
    fn replace_locked(
        &self,
        collection: Collection,
        id: u16,
        version: u16,
        bytes: &[u8],
    ) -> Result<InstallOutcome, Error> {
        let kind = collection.record_kind();
        let stored = self.stored_version(collection, id)?;
        if let Some(stored) = stored {
            if stored >= version {
                info!(
                    kind = kind.name(),
                    id,
                    stored,
                    incoming = version,
                    "already current"
                );
                return Ok(InstallOutcome::AlreadyCurrent);
            }
            info!(kind = kind.name(), id, stored, incoming = version, "updating");
        }

        let temp = self.layout.temp_path(collection, id);
        let dest = self.layout.record_path(collection, id);
        self.commit(&temp, &dest, bytes, kind)?;
        Ok(if stored.is_some() {
            InstallOutcome::Updated
        } else {
            InstallOutcome::Installed
        })
    }

    /// Write to `temp`, verify by reread, drop `dest`, rename `temp` over it.
    ///
    /// Until the old file is removed, a failure leaves it untouched and the
    /// temp file is cleaned up. Once it is gone, a failed rename keeps the
    /// verified temp file so the next mount can promote it.
    fn commit(&self, temp: &Path, dest: &Path, bytes: &[u8], kind: RecordKind) -> Result<(), Error> {
        if let Err(e) = self.medium.write_synced(temp, bytes) {
            error!(path = %temp.display(), error = %e, "failed to write temp file");
            self.discard(temp);
            return Err(e.into());
        }

        let written = match self.medium.read(temp) {
            Ok(written) => written,
            Err(e) => {
                error!(path = %temp.display(), error = %e, "failed to reread temp file");
                self.discard(temp);
                return Err(e.into());
            }
        };
        let verdict = if written != bytes {
            Err("bytes on the medium differ from those written".to_string())
        } else {
            decode_record(&written, kind).map(|_| ()).map_err(|e| e.to_string())
        };
        if let Err(reason) = verdict {
            error!(path = %temp.display(), %reason, "verification failed");
            self.discard(temp);
            return Err(Error::Verification {
                path: temp.to_path_buf(),
                reason,
            });
        }

        match self.medium.remove(dest) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                error!(path = %dest.display(), error = %e, "failed to remove old record");
                self.discard(temp);
                return Err(e.into());
            }
        }

        if let Err(e) = self.medium.rename(temp, dest) {
            error!(
                from = %temp.display(),
                to = %dest.display(),
                error = %e,
                "failed to rename temp file"
            );
            if matches!(self.medium.entry_kind(dest), Ok(Some(_))) {
                self.discard(temp);
            }
            return Err(e.into());
        }
        debug!(path = %dest.display(), "committed record");
        Ok(())
    }

    fn discard(&self, temp: &Path) {
        match self.medium.remove(temp) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %temp.display(), error = %e, "failed to remove temp file"),
        }
    }
}

fn saturate(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}
