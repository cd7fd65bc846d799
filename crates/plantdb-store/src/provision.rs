//! First-boot copy of the built-in species table into the store.

use crate::catalog::BuiltinCatalog;
use crate::options::{StoreOptions, DEFAULT_YIELD_EVERY};
use crate::store::PackStore;
use plantdb_core::error::Error;
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisionOptions {
    /// Species written between calls to [`std::thread::yield_now`]; 0 never yields.
    pub yield_every: u16,
}

impl Default for ProvisionOptions {
    fn default() -> Self {
        Self {
            yield_every: DEFAULT_YIELD_EVERY,
        }
    }
}

impl From<&StoreOptions> for ProvisionOptions {
    fn from(options: &StoreOptions) -> Self {
        Self {
            yield_every: options.yield_every,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ProvisionReport {
    pub provisioned: u16,
    pub skipped: u16,
    pub failed: u16,
}

/// Installs species `i` of `catalog` as plant `i + 1`, skipping ids whose
/// record already reads back cleanly. Safe to run on every start.
///
/// Per-species failures are counted, not returned; only an unmounted store
/// fails the run.
pub fn provision_builtin(
    store: &PackStore,
    catalog: &BuiltinCatalog,
    options: &ProvisionOptions,
) -> Result<ProvisionReport, Error> {
    if !store.is_mounted() {
        return Err(Error::NotReady);
    }
    let mut report = ProvisionReport::default();
    for (plant_id, species) in (1..=catalog.len()).zip(catalog.iter()) {
        if store.get_plant(plant_id).is_ok() {
            report.skipped += 1;
            continue;
        }
        match store.install_plant(&species.to_plant_record(plant_id)) {
            Ok(outcome) => {
                debug!(plant_id, name = %species.common_name, ?outcome, "provisioned species");
                report.provisioned += 1;
            }
            Err(e) => {
                warn!(plant_id, name = %species.common_name, error = %e, "failed to provision species");
                report.failed += 1;
            }
        }
        if options.yield_every > 0 && plant_id % options.yield_every == 0 {
            std::thread::yield_now();
        }
    }
    info!(
        provisioned = report.provisioned,
        skipped = report.skipped,
        failed = report.failed,
        "built-in provisioning finished"
    );
    Ok(report)
}

/// Cheap probe: the first and last built-in ids both read back.
pub fn defaults_provisioned(store: &PackStore, catalog: &BuiltinCatalog) -> bool {
    store.get_plant(1).is_ok() && store.get_plant(catalog.len()).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::medium::{Fault, Medium, MemoryMedium};
    use plantdb_format::StoreLayout;
    use std::sync::Arc;

    fn open(medium: &Arc<MemoryMedium>, catalog: &BuiltinCatalog) -> PackStore {
        let medium: Arc<dyn Medium> = medium.clone();
        PackStore::open(StoreLayout::new("/vol"), medium, catalog.len()).unwrap()
    }

    #[test]
    fn second_run_is_a_no_op() {
        let catalog = BuiltinCatalog::standard().unwrap();
        let medium = Arc::new(MemoryMedium::new());
        let store = open(&medium, &catalog);
        assert!(!defaults_provisioned(&store, &catalog));

        let first = provision_builtin(&store, &catalog, &ProvisionOptions::default()).unwrap();
        assert_eq!(first.provisioned, catalog.len());
        assert_eq!(first.failed, 0);
        assert!(defaults_provisioned(&store, &catalog));
        let after_first = medium.snapshot();

        let second = provision_builtin(&store, &catalog, &ProvisionOptions::default()).unwrap();
        assert_eq!(
            second,
            ProvisionReport {
                provisioned: 0,
                skipped: catalog.len(),
                failed: 0
            }
        );
        assert_eq!(medium.snapshot(), after_first);
    }

    #[test]
    fn failures_are_counted_and_retried_next_run() {
        let catalog = BuiltinCatalog::standard().unwrap();
        let medium = Arc::new(MemoryMedium::new());
        let store = open(&medium, &catalog);
        medium.inject(Fault::write("p_0002.tmp").times(1));

        let first = provision_builtin(&store, &catalog, &ProvisionOptions { yield_every: 0 })
            .unwrap();
        assert_eq!(first.failed, 1);
        assert_eq!(first.provisioned, catalog.len() - 1);
        assert!(store.get_plant(2).unwrap_err().is_not_found());

        let second = provision_builtin(&store, &catalog, &ProvisionOptions::default()).unwrap();
        assert_eq!(second.provisioned, 1);
        assert_eq!(second.skipped, catalog.len() - 1);
        assert_eq!(store.get_plant(2).unwrap().plant_id, 2);
    }

    #[test]
    fn corrupt_builtin_record_is_reprovisioned() {
        let catalog = BuiltinCatalog::standard().unwrap();
        let medium = Arc::new(MemoryMedium::new());
        let store = open(&medium, &catalog);
        provision_builtin(&store, &catalog, &ProvisionOptions::default()).unwrap();

        let path = store.layout().record_path(plantdb_format::Collection::Plants, 3);
        let mut bytes = medium.read(&path).unwrap();
        bytes[20] ^= 0x55;
        medium.write_synced(&path, &bytes).unwrap();

        let report = provision_builtin(&store, &catalog, &ProvisionOptions::default()).unwrap();
        assert_eq!(report.provisioned, 1);
        assert_eq!(store.get_plant(3).unwrap().version, 1);
    }

    #[test]
    fn unmounted_store_is_not_ready() {
        let catalog = BuiltinCatalog::standard().unwrap();
        let medium = Arc::new(MemoryMedium::new());
        let store = open(&medium, &catalog);
        store.unmount();
        assert!(matches!(
            provision_builtin(&store, &catalog, &ProvisionOptions::default()),
            Err(Error::NotReady)
        ));
    }
}
