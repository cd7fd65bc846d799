//! Pack records and the plants they own.

use super::PackStore;
use crate::validate::{validate_pack, validate_plant};
use plantdb_core::error::{Error, ValidationError};
use plantdb_core::result::InstallOutcome;
use plantdb_core::types::{
    PackRecord, PackSummary, PlantRecord, PACK_ID_BUILTIN, PACK_ID_INVALID,
};
use plantdb_format::{decode_pack, encode_pack, encode_plant, Collection, RecordKind};
use serde::Serialize;
use std::io;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PackInstallReport {
    pub pack: InstallOutcome,
    pub installed: u16,
    pub updated: u16,
    pub already_current: u16,
}

impl PackInstallReport {
    fn new() -> Self {
        Self {
            pack: InstallOutcome::AlreadyCurrent,
            installed: 0,
            updated: 0,
            already_current: 0,
        }
    }

    fn record(&mut self, outcome: InstallOutcome) {
        let slot = match outcome {
            InstallOutcome::Installed => &mut self.installed,
            InstallOutcome::Updated => &mut self.updated,
            InstallOutcome::AlreadyCurrent => &mut self.already_current,
        };
        *slot = slot.saturating_add(1);
    }

    pub fn changed(&self) -> bool {
        self.pack.changed() || self.installed > 0 || self.updated > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PackDeleteReport {
    pub pack_removed: bool,
    pub plants_removed: u16,
}

impl PackStore {
    /// Installs every plant of a pack, then the pack record itself, under one
    /// lock acquisition. Each record follows the usual version rule.
    ///
    /// A failure part way through leaves the records already committed in
    /// place; the pack record is written last so a listing never shows a pack
    /// whose plants were not stored.
    pub fn install_pack(
        &self,
        pack: &PackRecord,
        plants: &[PlantRecord],
    ) -> Result<PackInstallReport, Error> {
        validate_pack(pack)?;
        for plant in plants {
            if plant.pack_id != pack.pack_id {
                return Err(ValidationError::PackMismatch {
                    plant_id: plant.plant_id,
                    expected: pack.pack_id,
                    found: plant.pack_id,
                }
                .into());
            }
            validate_plant(plant, self.builtin_count)?;
        }
        let pack_bytes = encode_pack(pack)?;
        let plant_bytes = plants
            .iter()
            .map(encode_plant)
            .collect::<Result<Vec<_>, _>>()?;

        let mut inner = self.lock_mounted()?;
        let mut report = PackInstallReport::new();
        let result = self.install_pack_locked(pack, plants, &pack_bytes, &plant_bytes, &mut report);
        if report.changed() {
            inner.counter.bump(self.medium.as_ref());
        }
        result?;
        info!(
            pack_id = pack.pack_id,
            version = pack.version,
            plants = plants.len(),
            ?report,
            "installed pack"
        );
        Ok(report)
    }

    /// Pack 0 is the built-in set and always exists.
    pub fn get_pack(&self, pack_id: u16) -> Result<PackRecord, Error> {
        let _guard = self.lock_mounted()?;
        if pack_id == PACK_ID_BUILTIN {
            return Ok(PackRecord::builtin(self.builtin_count));
        }
        let bytes = self.read_record(Collection::Packs, pack_id)?;
        Ok(decode_pack(&bytes)?)
    }

    /// Removes a pack record, and with `with_plants` every stored plant whose
    /// `pack_id` names it. Fails with `NotFound` when nothing was removed.
    pub fn delete_pack(&self, pack_id: u16, with_plants: bool) -> Result<PackDeleteReport, Error> {
        if pack_id == PACK_ID_BUILTIN || pack_id == PACK_ID_INVALID {
            return Err(ValidationError::ReservedPackId(pack_id).into());
        }
        let mut inner = self.lock_mounted()?;
        let mut report = PackDeleteReport::default();
        let result = self.delete_pack_locked(pack_id, with_plants, &mut report);

        if report.pack_removed || report.plants_removed > 0 {
            inner.counter.bump(self.medium.as_ref());
            info!(pack_id, ?report, "deleted pack");
        }
        result?;
        if report == PackDeleteReport::default() {
            return Err(Error::NotFound {
                kind: RecordKind::Pack.name(),
                id: pack_id,
            });
        }
        Ok(report)
    }

    /// One page of pack summaries. The built-in pack comes first and takes
    /// one slot of the offset; unreadable pack files are skipped.
    pub fn list_packs(&self, offset: usize, max: usize) -> Result<Vec<PackSummary>, Error> {
        let _guard = self.lock_mounted()?;
        let mut out = Vec::new();
        if max == 0 {
            return Ok(out);
        }
        if offset == 0 {
            out.push(PackRecord::builtin(self.builtin_count).summary());
        }
        let stored = self
            .candidate_ids(Collection::Packs)?
            .skip(offset.saturating_sub(1));
        for pack_id in stored {
            if out.len() >= max {
                break;
            }
            match self
                .read_record(Collection::Packs, pack_id)
                .and_then(|bytes| decode_pack(&bytes).map_err(Error::from))
            {
                Ok(pack) => out.push(pack.summary()),
                Err(e) => warn!(pack_id, error = %e, "skipping unreadable pack file"),
            }
        }
        Ok(out)
    }

    /// Stored pack files, not counting the built-in pack.
    pub fn pack_count(&self) -> Result<usize, Error> {
        let _guard = self.lock_mounted()?;
        Ok(self.candidate_ids(Collection::Packs)?.count())
    }

    // Records each committed outcome in `report` as it goes, so the caller
    // can tell whether anything changed even when a later step fails.
    fn install_pack_locked(
        &self,
        pack: &PackRecord,
        plants: &[PlantRecord],
        pack_bytes: &[u8],
        plant_bytes: &[Vec<u8>],
        report: &mut PackInstallReport,
    ) -> Result<(), Error> {
        for (plant, bytes) in plants.iter().zip(plant_bytes) {
            let outcome =
                self.replace_locked(Collection::Plants, plant.plant_id, plant.version, bytes)?;
            report.record(outcome);
        }
        report.pack =
            self.replace_locked(Collection::Packs, pack.pack_id, pack.version, pack_bytes)?;
        Ok(())
    }

    fn delete_pack_locked(
        &self,
        pack_id: u16,
        with_plants: bool,
        report: &mut PackDeleteReport,
    ) -> Result<(), Error> {
        if with_plants {
            let plant_ids: Vec<u16> = self.candidate_ids(Collection::Plants)?.collect();
            for plant_id in plant_ids {
                let owned = self
                    .load_plant(plant_id)
                    .is_ok_and(|plant| plant.pack_id == pack_id);
                if owned {
                    self.medium
                        .remove(&self.layout.record_path(Collection::Plants, plant_id))?;
                    report.plants_removed = report.plants_removed.saturating_add(1);
                }
            }
        }
        match self
            .medium
            .remove(&self.layout.record_path(Collection::Packs, pack_id))
        {
            Ok(()) => report.pack_removed = true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}
