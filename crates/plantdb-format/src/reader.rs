use crate::bytes::{read_i8, read_str, read_u16, read_u32, read_u8};
use crate::crc::crc32;
use crate::layout::RecordKind;
use crate::writer::{
    plant_off, HEADER_LEN, MANIFEST_ENTRY_LEN, MANIFEST_FIXED_LEN, PACK_FIXED_LEN,
    PLANT_PAYLOAD_LEN, SCALE_DENSITY, SCALE_FRACTION, SCALE_KC, SCALE_MM, SCALE_WATER_NEED,
};
use plantdb_core::error::FormatError;
use plantdb_core::types::{
    CropCoefficients, GrowthCycle, ManifestEntry, ManifestKind, PackRecord, PlantRecord,
    StageDays, COMMON_NAME_LEN, MAX_PLANTS_PER_PACK, PACK_NAME_LEN, SCHEMA_VERSION,
    SCIENTIFIC_NAME_LEN,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub magic: u32,
    pub schema_version: u8,
    pub crc32: u32,
    pub payload_size: u32,
}

/// Parses the 16-byte header, checking magic and schema version.
pub fn parse_header(bytes: &[u8], kind: RecordKind) -> Result<RecordHeader, FormatError> {
    if bytes.len() < HEADER_LEN {
        return Err(FormatError::Truncated {
            at: bytes.len(),
            needed: HEADER_LEN,
        });
    }
    let magic = read_u32(bytes, 0)?;
    if magic != kind.magic() {
        return Err(FormatError::BadMagic {
            expected: kind.magic(),
            actual: magic,
        });
    }
    let schema_version = read_u8(bytes, 4)?;
    if schema_version == 0 || schema_version > SCHEMA_VERSION {
        return Err(FormatError::UnsupportedVersion {
            found: schema_version,
            supported: SCHEMA_VERSION,
        });
    }
    Ok(RecordHeader {
        magic,
        schema_version,
        crc32: read_u32(bytes, 8)?,
        payload_size: read_u32(bytes, 12)?,
    })
}

/// Validates a whole record file and returns its payload.
///
/// Checks run header first: magic, schema version, payload size (against both
/// the bytes present and what `kind` permits), then the CRC. Nothing in the
/// payload is interpreted here.
pub fn decode_record(bytes: &[u8], kind: RecordKind) -> Result<&[u8], FormatError> {
    let header = parse_header(bytes, kind)?;
    let declared = usize::try_from(header.payload_size).unwrap_or(usize::MAX);
    let actual = bytes.len() - HEADER_LEN;
    if declared != actual {
        return Err(FormatError::SizeMismatch {
            expected: declared,
            actual,
        });
    }
    if let Some(expected) = size_violation(kind, declared) {
        return Err(FormatError::SizeMismatch {
            expected,
            actual: declared,
        });
    }

    let payload = &bytes[HEADER_LEN..];
    let computed = crc32(payload);
    if computed != header.crc32 {
        return Err(FormatError::ChecksumMismatch {
            stored: header.crc32,
            computed,
        });
    }
    Ok(payload)
}

// Returns the nearest acceptable size when `size` is not one `kind` allows.
fn size_violation(kind: RecordKind, size: usize) -> Option<usize> {
    match kind {
        RecordKind::Plant => (size != PLANT_PAYLOAD_LEN).then_some(PLANT_PAYLOAD_LEN),
        RecordKind::Pack => {
            let max = PACK_FIXED_LEN + MAX_PLANTS_PER_PACK * 2;
            if size < PACK_FIXED_LEN {
                Some(PACK_FIXED_LEN)
            } else if size > max {
                Some(max)
            } else if (size - PACK_FIXED_LEN) % 2 != 0 {
                Some(size - 1)
            } else {
                None
            }
        }
        RecordKind::Manifest => {
            if size < MANIFEST_FIXED_LEN {
                Some(MANIFEST_FIXED_LEN)
            } else {
                let extra = (size - MANIFEST_FIXED_LEN) % MANIFEST_ENTRY_LEN;
                (extra != 0).then_some(size - extra)
            }
        }
    }
}

pub fn decode_plant(bytes: &[u8]) -> Result<PlantRecord, FormatError> {
    let payload = decode_record(bytes, RecordKind::Plant)?;
    decode_plant_payload(payload)
}

/// Interprets a 156-byte plant payload (no header).
pub fn decode_plant_payload(payload: &[u8]) -> Result<PlantRecord, FormatError> {
    use plant_off as o;

    if payload.len() != PLANT_PAYLOAD_LEN {
        return Err(FormatError::SizeMismatch {
            expected: PLANT_PAYLOAD_LEN,
            actual: payload.len(),
        });
    }
    let fixed = |off: usize, scale: f32| -> Result<f32, FormatError> {
        Ok(f32::from(read_u16(payload, off)?) / scale)
    };

    Ok(PlantRecord {
        plant_id: read_u16(payload, o::PLANT_ID)?,
        pack_id: read_u16(payload, o::PACK_ID)?,
        version: read_u16(payload, o::VERSION)?,
        common_name: read_str(payload, o::COMMON_NAME, COMMON_NAME_LEN, "common_name")?,
        scientific_name: read_str(
            payload,
            o::SCIENTIFIC_NAME,
            SCIENTIFIC_NAME_LEN,
            "scientific_name",
        )?,
        kc: CropCoefficients {
            ini: fixed(o::KC_INI, SCALE_KC)?,
            dev: fixed(o::KC_DEV, SCALE_KC)?,
            mid: fixed(o::KC_MID, SCALE_KC)?,
            end: fixed(o::KC_END, SCALE_KC)?,
        },
        root_depth_min_m: fixed(o::ROOT_MIN, SCALE_MM)?,
        root_depth_max_m: fixed(o::ROOT_MAX, SCALE_MM)?,
        stage_days: StageDays {
            ini: read_u8(payload, o::STAGE_INI)?,
            dev: read_u8(payload, o::STAGE_DEV)?,
            mid: read_u16(payload, o::STAGE_MID)?,
            end: read_u8(payload, o::STAGE_END)?,
        },
        growth_cycle: GrowthCycle::from_u8(read_u8(payload, o::GROWTH_CYCLE)?),
        depletion_fraction: fixed(o::DEPLETION, SCALE_FRACTION)?,
        spacing_row_m: fixed(o::SPACING_ROW, SCALE_MM)?,
        spacing_plant_m: fixed(o::SPACING_PLANT, SCALE_MM)?,
        density_plants_m2: fixed(o::DENSITY, SCALE_DENSITY)?,
        canopy_cover_max: fixed(o::CANOPY, SCALE_FRACTION)?,
        frost_tolerance_c: read_i8(payload, o::FROST)?,
        temp_opt_min_c: read_u8(payload, o::TEMP_MIN)?,
        temp_opt_max_c: read_u8(payload, o::TEMP_MAX)?,
        irrigation_method: read_u8(payload, o::IRRIGATION_METHOD)?,
        water_need_factor: fixed(o::WATER_NEED, SCALE_WATER_NEED)?,
        irrigation_freq_days: read_u8(payload, o::IRRIGATION_FREQ)?,
        prefer_area_based: read_u8(payload, o::PREFER_AREA)? != 0,
    })
}

pub fn decode_pack(bytes: &[u8]) -> Result<PackRecord, FormatError> {
    let payload = decode_record(bytes, RecordKind::Pack)?;
    let count = usize::from(read_u16(payload, 36)?);
    let expected = PACK_FIXED_LEN + count * 2;
    if expected != payload.len() {
        return Err(FormatError::SizeMismatch {
            expected,
            actual: payload.len(),
        });
    }
    let plant_ids = (0..count)
        .map(|i| read_u16(payload, PACK_FIXED_LEN + i * 2))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PackRecord {
        pack_id: read_u16(payload, 0)?,
        version: read_u16(payload, 2)?,
        name: read_str(payload, 4, PACK_NAME_LEN, "pack.name")?,
        plant_ids,
    })
}

pub fn decode_manifest(bytes: &[u8]) -> Result<Vec<ManifestEntry>, FormatError> {
    let payload = decode_record(bytes, RecordKind::Manifest)?;
    let count = usize::from(read_u16(payload, 0)?);
    let expected = MANIFEST_FIXED_LEN + count * MANIFEST_ENTRY_LEN;
    if expected != payload.len() {
        return Err(FormatError::SizeMismatch {
            expected,
            actual: payload.len(),
        });
    }
    (0..count)
        .map(|i| {
            let off = MANIFEST_FIXED_LEN + i * MANIFEST_ENTRY_LEN;
            let kind = match read_u8(payload, off + 4)? {
                0 => ManifestKind::Plant,
                1 => ManifestKind::Pack,
                _ => {
                    return Err(FormatError::InvalidValue {
                        field: "manifest.kind",
                        reason: "expected 0 (plant) or 1 (pack)",
                    })
                }
            };
            Ok(ManifestEntry {
                kind,
                id: read_u16(payload, off)?,
                version: read_u16(payload, off + 2)?,
            })
        })
        .collect()
}
