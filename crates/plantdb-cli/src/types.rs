use plantdb_core::result::InstallOutcome;
use plantdb_core::types::{PackRecord, PlantRecord};
use serde::{Deserialize, Serialize};

/// Input file of `install-pack`.
#[derive(Deserialize)]
pub(crate) struct PackInput {
    pub(crate) pack: PackRecord,
    #[serde(default)]
    pub(crate) plants: Vec<PlantRecord>,
}

#[derive(Serialize)]
pub(crate) struct InstallJson {
    pub(crate) plant_id: u16,
    pub(crate) version: u16,
    pub(crate) outcome: InstallOutcome,
    pub(crate) code: u8,
}

#[derive(Serialize)]
pub(crate) struct DeleteJson {
    pub(crate) plant_id: u16,
    pub(crate) deleted: bool,
    pub(crate) code: u8,
    pub(crate) error: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct ValidateJson<'a> {
    pub(crate) ok: bool,
    pub(crate) path: &'a str,
    pub(crate) kind: Option<&'static str>,
    pub(crate) error: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct HeaderJson {
    pub(crate) magic: u32,
    pub(crate) schema_version: u8,
    pub(crate) crc32: u32,
    pub(crate) payload_size: u32,
}

#[derive(Serialize)]
pub(crate) struct DerivedJson {
    pub(crate) plant_id: u16,
    pub(crate) day: u16,
    pub(crate) value: f32,
    pub(crate) defaulted: bool,
    pub(crate) code: u8,
    pub(crate) reason: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct ManifestWriteJson {
    pub(crate) entries: usize,
}
