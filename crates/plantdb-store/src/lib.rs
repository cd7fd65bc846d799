//! Versioned plant and pack record store.
//!
//! Records live as one checksummed file each under a store root:
//!
//! ```text
//! <root>/plants/p_XXXX.bin
//! <root>/packs/k_XXXX.bin
//! <root>/manifest.bin
//! <root>/counter.bin
//! <root>/options.json
//! ```
//!
//! Writes go to a `.tmp` sibling, are read back and verified, then renamed
//! over the old file. A record is only replaced by a strictly newer version.

pub mod catalog;
mod counter;
pub mod fao56;
pub mod medium;
pub mod options;
pub mod provision;
mod store;
pub mod validate;

pub use catalog::{BuiltinCatalog, BuiltinSpecies, CatalogError};
pub use medium::{FsMedium, Medium, MemoryMedium};
pub use options::{OptionsError, OptionsRecord, StoreOptions};
pub use provision::{defaults_provisioned, provision_builtin, ProvisionOptions, ProvisionReport};
pub use store::{
    Defaulted, ListQuery, ManifestReport, PackDeleteReport, PackInstallReport, PackStore,
    PlantFilter, PlantPage, StaleEntry,
};
