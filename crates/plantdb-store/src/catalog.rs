//! Read-only built-in species table.
//!
//! Values keep the compact ROM units (`*_x1000`, `*_x100`); conversion to a
//! [`PlantRecord`] happens once, when a species is provisioned.

use plantdb_core::types::{
    CropCoefficients, GrowthCycle, PlantRecord, StageDays, COMMON_NAME_LEN, PACK_ID_BUILTIN,
    PLANT_ID_INVALID, SCIENTIFIC_NAME_LEN,
};
use plantdb_format::bytes::truncate_str;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

const STANDARD_SPECIES: &str = include_str!("../data/builtin_species.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read species file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid species table")]
    Parse(#[from] serde_json::Error),

    #[error("species table is empty")]
    Empty,

    #[error("species table has {0} entries; ids stop at 0xFFFE")]
    TooLarge(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltinSpecies {
    pub common_name: String,
    pub scientific_name: String,
    #[serde(default)]
    pub category: String,
    pub kc_ini_x1000: u16,
    pub kc_dev_x1000: u16,
    pub kc_mid_x1000: u16,
    pub kc_end_x1000: u16,
    pub root_depth_min_m_x1000: u16,
    pub root_depth_max_m_x1000: u16,
    pub stage_days_ini: u8,
    pub stage_days_dev: u8,
    pub stage_days_mid: u16,
    pub stage_days_end: u8,
    pub growth_cycle: u8,
    pub depletion_fraction_p_x1000: u16,
    pub spacing_row_m_x1000: u16,
    pub spacing_plant_m_x1000: u16,
    pub density_plants_m2_x100: u16,
    pub canopy_cover_max_frac_x1000: u16,
    pub frost_tolerance_c: i8,
    pub temp_opt_min_c: u8,
    pub temp_opt_max_c: u8,
    pub irrigation_method: u8,
}

impl BuiltinSpecies {
    /// Built-in record for this species under `plant_id`, with user-adjustable
    /// fields at their defaults.
    ///
    /// ROM distances are metres x1000, which is numerically the millimetre
    /// value the record file stores.
    pub fn to_plant_record(&self, plant_id: u16) -> PlantRecord {
        let x1000 = |v: u16| f32::from(v) / 1000.0;
        PlantRecord {
            plant_id,
            pack_id: PACK_ID_BUILTIN,
            version: 1,
            common_name: truncate_str(&self.common_name, COMMON_NAME_LEN - 1).to_string(),
            scientific_name: truncate_str(&self.scientific_name, SCIENTIFIC_NAME_LEN - 1)
                .to_string(),
            kc: CropCoefficients {
                ini: x1000(self.kc_ini_x1000),
                dev: x1000(self.kc_dev_x1000),
                mid: x1000(self.kc_mid_x1000),
                end: x1000(self.kc_end_x1000),
            },
            root_depth_min_m: x1000(self.root_depth_min_m_x1000),
            root_depth_max_m: x1000(self.root_depth_max_m_x1000),
            stage_days: StageDays {
                ini: self.stage_days_ini,
                dev: self.stage_days_dev,
                mid: self.stage_days_mid,
                end: self.stage_days_end,
            },
            growth_cycle: GrowthCycle::from_u8(self.growth_cycle),
            depletion_fraction: x1000(self.depletion_fraction_p_x1000),
            spacing_row_m: x1000(self.spacing_row_m_x1000),
            spacing_plant_m: x1000(self.spacing_plant_m_x1000),
            density_plants_m2: f32::from(self.density_plants_m2_x100) / 100.0,
            canopy_cover_max: x1000(self.canopy_cover_max_frac_x1000),
            frost_tolerance_c: self.frost_tolerance_c,
            temp_opt_min_c: self.temp_opt_min_c,
            temp_opt_max_c: self.temp_opt_max_c,
            irrigation_method: self.irrigation_method,
            ..PlantRecord::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuiltinCatalog {
    species: Vec<BuiltinSpecies>,
}

impl BuiltinCatalog {
    /// The table compiled into this build.
    pub fn standard() -> Result<Self, CatalogError> {
        Self::from_json(STANDARD_SPECIES)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Self::new(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn new(species: Vec<BuiltinSpecies>) -> Result<Self, CatalogError> {
        if species.is_empty() {
            return Err(CatalogError::Empty);
        }
        if species.len() >= usize::from(PLANT_ID_INVALID) {
            return Err(CatalogError::TooLarge(species.len()));
        }
        Ok(Self { species })
    }

    /// Number of species; also the highest built-in plant id.
    pub fn len(&self) -> u16 {
        // `new` bounds the table below 0xFFFF entries.
        u16::try_from(self.species.len()).unwrap_or(PLANT_ID_INVALID - 1)
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&BuiltinSpecies> {
        self.species.get(index)
    }

    /// Species provisioned under `plant_id` (ids start at 1).
    pub fn by_plant_id(&self, plant_id: u16) -> Option<&BuiltinSpecies> {
        self.species.get(usize::from(plant_id).checked_sub(1)?)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BuiltinSpecies> {
        self.species.iter()
    }

    /// Exact match on common or scientific name, ignoring ASCII case.
    pub fn find(&self, name: &str) -> Option<&BuiltinSpecies> {
        self.species.iter().find(|s| {
            s.common_name.eq_ignore_ascii_case(name) || s.scientific_name.eq_ignore_ascii_case(name)
        })
    }

    /// First species whose common or scientific name contains `needle`,
    /// ignoring case.
    pub fn find_partial(&self, needle: &str) -> Option<&BuiltinSpecies> {
        self.search(needle).next()
    }

    pub fn search<'a>(&'a self, needle: &str) -> impl Iterator<Item = &'a BuiltinSpecies> + 'a {
        let needle = needle.to_lowercase();
        self.species.iter().filter(move |s| {
            s.common_name.to_lowercase().contains(&needle)
                || s.scientific_name.to_lowercase().contains(&needle)
        })
    }

    pub fn by_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a BuiltinSpecies> + 'a {
        self.species
            .iter()
            .filter(move |s| s.category.eq_ignore_ascii_case(category))
    }
}
