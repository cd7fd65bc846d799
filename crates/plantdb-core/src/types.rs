#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: u8 = 1;

pub const PLANT_ID_INVALID: u16 = 0xFFFF;
pub const PACK_ID_BUILTIN: u16 = 0;
pub const PACK_ID_INVALID: u16 = 0xFFFF;

pub const MAX_PLANTS_PER_PACK: usize = 256;

// Fixed on-disk field widths, NUL included.
pub const COMMON_NAME_LEN: usize = 48;
pub const SCIENTIFIC_NAME_LEN: usize = 64;
pub const PACK_NAME_LEN: usize = 32;

pub const BUILTIN_PACK_NAME: &str = "Built-in Database";

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GrowthCycle {
    #[default]
    Annual,
    Perennial,
    Biennial,
    /// Tag values this engine does not name are carried through untouched.
    Other(u8),
}

impl GrowthCycle {
    pub const fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Annual,
            1 => Self::Perennial,
            2 => Self::Biennial,
            other => Self::Other(other),
        }
    }

    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Annual => 0,
            Self::Perennial => 1,
            Self::Biennial => 2,
            Self::Other(v) => v,
        }
    }
}

/// FAO-56 crop coefficients for the four growth stages.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CropCoefficients {
    pub ini: f32,
    pub dev: f32,
    pub mid: f32,
    pub end: f32,
}

/// Growth-stage durations in days.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageDays {
    pub ini: u8,
    pub dev: u8,
    pub mid: u16,
    pub end: u8,
}

impl StageDays {
    pub fn total(self) -> u32 {
        u32::from(self.ini) + u32::from(self.dev) + u32::from(self.mid) + u32::from(self.end)
    }
}

/// A plant definition as held in memory.
///
/// Physical quantities are kept in natural units (metres, fractions, plants per
/// square metre); the record codec owns the fixed-point representation.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct PlantRecord {
    pub plant_id: u16,
    pub pack_id: u16,
    pub version: u16,
    pub common_name: String,
    pub scientific_name: String,
    pub kc: CropCoefficients,
    pub root_depth_min_m: f32,
    pub root_depth_max_m: f32,
    pub stage_days: StageDays,
    pub growth_cycle: GrowthCycle,
    pub depletion_fraction: f32,
    pub spacing_row_m: f32,
    pub spacing_plant_m: f32,
    pub density_plants_m2: f32,
    pub canopy_cover_max: f32,
    pub frost_tolerance_c: i8,
    pub temp_opt_min_c: u8,
    pub temp_opt_max_c: u8,
    pub irrigation_method: u8,
    pub water_need_factor: f32,
    pub irrigation_freq_days: u8,
    pub prefer_area_based: bool,
}

impl Default for PlantRecord {
    fn default() -> Self {
        Self {
            plant_id: 0,
            pack_id: PACK_ID_BUILTIN,
            version: 1,
            common_name: String::new(),
            scientific_name: String::new(),
            kc: CropCoefficients::default(),
            root_depth_min_m: 0.0,
            root_depth_max_m: 0.0,
            stage_days: StageDays::default(),
            growth_cycle: GrowthCycle::default(),
            depletion_fraction: 0.0,
            spacing_row_m: 0.0,
            spacing_plant_m: 0.0,
            density_plants_m2: 0.0,
            canopy_cover_max: 0.0,
            frost_tolerance_c: 0,
            temp_opt_min_c: 0,
            temp_opt_max_c: 0,
            irrigation_method: 0,
            water_need_factor: 1.0,
            irrigation_freq_days: 3,
            prefer_area_based: true,
        }
    }
}

impl PlantRecord {
    pub fn summary(&self) -> PlantSummary {
        PlantSummary {
            plant_id: self.plant_id,
            pack_id: self.pack_id,
            version: self.version,
            name: self.common_name.clone(),
        }
    }
}

/// A named group of plant ids shipped together.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackRecord {
    pub pack_id: u16,
    pub version: u16,
    pub name: String,
    pub plant_ids: Vec<u16>,
}

impl PackRecord {
    /// The virtual pack 0, never stored on disk.
    pub fn builtin(builtin_count: u16) -> Self {
        Self {
            pack_id: PACK_ID_BUILTIN,
            version: 1,
            name: BUILTIN_PACK_NAME.to_string(),
            plant_ids: (1..=builtin_count).collect(),
        }
    }

    pub fn summary(&self) -> PackSummary {
        PackSummary {
            pack_id: self.pack_id,
            version: self.version,
            plant_count: u16::try_from(self.plant_ids.len()).unwrap_or(u16::MAX),
            name: self.name.clone(),
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ManifestKind {
    Plant,
    Pack,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ManifestEntry {
    pub kind: ManifestKind,
    pub id: u16,
    pub version: u16,
}

/// Listing metadata, always taken from a decoded payload.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlantSummary {
    pub plant_id: u16,
    pub pack_id: u16,
    pub version: u16,
    pub name: String,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackSummary {
    pub pack_id: u16,
    pub version: u16,
    pub plant_count: u16,
    pub name: String,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StorageStatus {
    #[default]
    Ok,
    NotReady,
    Error,
}

impl StorageStatus {
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::NotReady => 1,
            Self::Error => 2,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StorageStats {
    pub status: StorageStatus,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub plant_count: u16,
    /// Stored plant files whose id lies above the built-in range.
    pub custom_plant_count: u16,
    /// Stored packs; the virtual built-in pack is not included.
    pub pack_count: u16,
    pub builtin_count: u16,
    pub change_counter: u32,
}
