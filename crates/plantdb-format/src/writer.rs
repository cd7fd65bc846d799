use crate::bytes::{put_str, put_u16, put_u32, put_u8};
use crate::crc::crc32;
use crate::layout::RecordKind;
use plantdb_core::error::FormatError;
use plantdb_core::types::{
    ManifestEntry, ManifestKind, PackRecord, PlantRecord, COMMON_NAME_LEN, MAX_PLANTS_PER_PACK,
    PACK_NAME_LEN, SCHEMA_VERSION, SCIENTIFIC_NAME_LEN,
};

pub const HEADER_LEN: usize = 16;
pub const PLANT_PAYLOAD_LEN: usize = 156;
pub const PACK_FIXED_LEN: usize = 40;
pub const MANIFEST_FIXED_LEN: usize = 4;
pub const MANIFEST_ENTRY_LEN: usize = 8;

// Plant payload offsets.
pub(crate) mod plant_off {
    pub const PLANT_ID: usize = 0;
    pub const PACK_ID: usize = 2;
    pub const VERSION: usize = 4;
    pub const COMMON_NAME: usize = 8;
    pub const SCIENTIFIC_NAME: usize = 56;
    pub const KC_INI: usize = 120;
    pub const KC_DEV: usize = 122;
    pub const KC_MID: usize = 124;
    pub const KC_END: usize = 126;
    pub const ROOT_MIN: usize = 128;
    pub const ROOT_MAX: usize = 130;
    pub const STAGE_INI: usize = 132;
    pub const STAGE_DEV: usize = 133;
    pub const STAGE_MID: usize = 134;
    pub const STAGE_END: usize = 136;
    pub const GROWTH_CYCLE: usize = 137;
    pub const DEPLETION: usize = 138;
    pub const SPACING_ROW: usize = 140;
    pub const SPACING_PLANT: usize = 142;
    pub const DENSITY: usize = 144;
    pub const CANOPY: usize = 146;
    pub const FROST: usize = 148;
    pub const TEMP_MIN: usize = 149;
    pub const TEMP_MAX: usize = 150;
    pub const IRRIGATION_METHOD: usize = 151;
    pub const WATER_NEED: usize = 152;
    pub const IRRIGATION_FREQ: usize = 154;
    pub const PREFER_AREA: usize = 155;
}

// Fixed-point scales.
pub(crate) const SCALE_KC: f32 = 1000.0;
pub(crate) const SCALE_MM: f32 = 1000.0;
pub(crate) const SCALE_FRACTION: f32 = 1000.0;
pub(crate) const SCALE_DENSITY: f32 = 100.0;
pub(crate) const SCALE_WATER_NEED: f32 = 100.0;

/// Header followed by `payload`, stamped with the payload CRC.
pub fn encode_record(kind: RecordKind, payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; HEADER_LEN + payload.len()];
    put_u32(&mut buf, 0, kind.magic());
    put_u8(&mut buf, 4, SCHEMA_VERSION);
    put_u32(&mut buf, 8, crc32(payload));
    // Payloads are bounded far below u32::MAX by their formats.
    put_u32(
        &mut buf,
        12,
        u32::try_from(payload.len()).unwrap_or(u32::MAX),
    );
    buf[HEADER_LEN..].copy_from_slice(payload);
    buf
}

/// The 156-byte plant payload, as carried in install frames.
pub fn encode_plant_payload(plant: &PlantRecord) -> Result<Vec<u8>, FormatError> {
    use plant_off as o;

    let mut buf = vec![0u8; PLANT_PAYLOAD_LEN];
    put_u16(&mut buf, o::PLANT_ID, plant.plant_id);
    put_u16(&mut buf, o::PACK_ID, plant.pack_id);
    put_u16(&mut buf, o::VERSION, plant.version);
    put_str(&mut buf, o::COMMON_NAME, COMMON_NAME_LEN, &plant.common_name);
    put_str(
        &mut buf,
        o::SCIENTIFIC_NAME,
        SCIENTIFIC_NAME_LEN,
        &plant.scientific_name,
    );

    put_u16(&mut buf, o::KC_INI, to_fixed("kc.ini", plant.kc.ini, SCALE_KC)?);
    put_u16(&mut buf, o::KC_DEV, to_fixed("kc.dev", plant.kc.dev, SCALE_KC)?);
    put_u16(&mut buf, o::KC_MID, to_fixed("kc.mid", plant.kc.mid, SCALE_KC)?);
    put_u16(&mut buf, o::KC_END, to_fixed("kc.end", plant.kc.end, SCALE_KC)?);
    put_u16(
        &mut buf,
        o::ROOT_MIN,
        to_fixed("root_depth_min_m", plant.root_depth_min_m, SCALE_MM)?,
    );
    put_u16(
        &mut buf,
        o::ROOT_MAX,
        to_fixed("root_depth_max_m", plant.root_depth_max_m, SCALE_MM)?,
    );

    put_u8(&mut buf, o::STAGE_INI, plant.stage_days.ini);
    put_u8(&mut buf, o::STAGE_DEV, plant.stage_days.dev);
    put_u16(&mut buf, o::STAGE_MID, plant.stage_days.mid);
    put_u8(&mut buf, o::STAGE_END, plant.stage_days.end);
    put_u8(&mut buf, o::GROWTH_CYCLE, plant.growth_cycle.as_u8());

    put_u16(
        &mut buf,
        o::DEPLETION,
        to_fixed("depletion_fraction", plant.depletion_fraction, SCALE_FRACTION)?,
    );
    put_u16(
        &mut buf,
        o::SPACING_ROW,
        to_fixed("spacing_row_m", plant.spacing_row_m, SCALE_MM)?,
    );
    put_u16(
        &mut buf,
        o::SPACING_PLANT,
        to_fixed("spacing_plant_m", plant.spacing_plant_m, SCALE_MM)?,
    );
    put_u16(
        &mut buf,
        o::DENSITY,
        to_fixed("density_plants_m2", plant.density_plants_m2, SCALE_DENSITY)?,
    );
    put_u16(
        &mut buf,
        o::CANOPY,
        to_fixed("canopy_cover_max", plant.canopy_cover_max, SCALE_FRACTION)?,
    );

    buf[o::FROST] = plant.frost_tolerance_c.to_le_bytes()[0];
    put_u8(&mut buf, o::TEMP_MIN, plant.temp_opt_min_c);
    put_u8(&mut buf, o::TEMP_MAX, plant.temp_opt_max_c);
    put_u8(&mut buf, o::IRRIGATION_METHOD, plant.irrigation_method);

    put_u16(
        &mut buf,
        o::WATER_NEED,
        to_fixed("water_need_factor", plant.water_need_factor, SCALE_WATER_NEED)?,
    );
    put_u8(&mut buf, o::IRRIGATION_FREQ, plant.irrigation_freq_days);
    put_u8(&mut buf, o::PREFER_AREA, u8::from(plant.prefer_area_based));

    Ok(buf)
}

/// Complete plant file: header plus payload.
pub fn encode_plant(plant: &PlantRecord) -> Result<Vec<u8>, FormatError> {
    let payload = encode_plant_payload(plant)?;
    Ok(encode_record(RecordKind::Plant, &payload))
}

/// Complete pack file: header, fixed pack fields, then the member id array.
pub fn encode_pack(pack: &PackRecord) -> Result<Vec<u8>, FormatError> {
    let count = pack.plant_ids.len();
    if count > MAX_PLANTS_PER_PACK {
        return Err(FormatError::TooManyEntries {
            field: "pack.plant_ids",
            count,
            max: MAX_PLANTS_PER_PACK,
        });
    }

    let mut payload = vec![0u8; PACK_FIXED_LEN + count * 2];
    put_u16(&mut payload, 0, pack.pack_id);
    put_u16(&mut payload, 2, pack.version);
    put_str(&mut payload, 4, PACK_NAME_LEN, &pack.name);
    put_u16(&mut payload, 36, u16::try_from(count).unwrap_or(u16::MAX));
    for (i, id) in pack.plant_ids.iter().enumerate() {
        put_u16(&mut payload, PACK_FIXED_LEN + i * 2, *id);
    }
    Ok(encode_record(RecordKind::Pack, &payload))
}

pub fn encode_manifest(entries: &[ManifestEntry]) -> Result<Vec<u8>, FormatError> {
    let count = u16::try_from(entries.len()).map_err(|_| FormatError::TooManyEntries {
        field: "manifest.entries",
        count: entries.len(),
        max: usize::from(u16::MAX),
    })?;

    let mut payload = vec![0u8; MANIFEST_FIXED_LEN + entries.len() * MANIFEST_ENTRY_LEN];
    put_u16(&mut payload, 0, count);
    for (i, entry) in entries.iter().enumerate() {
        let off = MANIFEST_FIXED_LEN + i * MANIFEST_ENTRY_LEN;
        put_u16(&mut payload, off, entry.id);
        put_u16(&mut payload, off + 2, entry.version);
        let kind = match entry.kind {
            ManifestKind::Plant => 0,
            ManifestKind::Pack => 1,
        };
        put_u8(&mut payload, off + 4, kind);
    }
    Ok(encode_record(RecordKind::Manifest, &payload))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_fixed(field: &'static str, value: f32, scale: f32) -> Result<u16, FormatError> {
    if !value.is_finite() || value < 0.0 {
        return Err(FormatError::InvalidValue {
            field,
            reason: "must be finite and non-negative",
        });
    }
    let scaled = (value * scale).round();
    if scaled > f32::from(u16::MAX) {
        return Err(FormatError::InvalidValue {
            field,
            reason: "too large for fixed-point field",
        });
    }
    Ok(scaled as u16)
}
