//! Sanity checks run before anything is written.

use plantdb_core::error::ValidationError;
use plantdb_core::types::{
    PackRecord, PlantRecord, MAX_PLANTS_PER_PACK, PACK_ID_BUILTIN, PACK_ID_INVALID,
    PLANT_ID_INVALID,
};

const KC_CEILING: f32 = 2.0;
const ROOT_DEPTH_CEILING_M: f32 = 5.0;

pub fn validate_plant(plant: &PlantRecord, builtin_count: u16) -> Result<(), ValidationError> {
    if plant.plant_id == 0 || plant.plant_id == PLANT_ID_INVALID {
        return Err(ValidationError::ReservedPlantId(plant.plant_id));
    }
    if plant.pack_id == PACK_ID_BUILTIN && !(1..=builtin_count).contains(&plant.plant_id) {
        return Err(ValidationError::OutsideBuiltinRange {
            plant_id: plant.plant_id,
            builtin_count,
        });
    }
    if plant.common_name.is_empty() {
        return Err(ValidationError::EmptyCommonName);
    }

    let kc = plant.kc;
    for (stage, value) in [
        ("ini", kc.ini),
        ("dev", kc.dev),
        ("mid", kc.mid),
        ("end", kc.end),
    ] {
        if value > KC_CEILING {
            return Err(ValidationError::KcTooHigh { stage, value });
        }
    }

    if plant.root_depth_min_m > plant.root_depth_max_m {
        return Err(ValidationError::RootDepthInverted {
            min: plant.root_depth_min_m,
            max: plant.root_depth_max_m,
        });
    }
    if plant.root_depth_max_m > ROOT_DEPTH_CEILING_M {
        return Err(ValidationError::RootDepthTooDeep(plant.root_depth_max_m));
    }
    Ok(())
}

pub fn validate_pack(pack: &PackRecord) -> Result<(), ValidationError> {
    if pack.pack_id == PACK_ID_BUILTIN || pack.pack_id == PACK_ID_INVALID {
        return Err(ValidationError::ReservedPackId(pack.pack_id));
    }
    if pack.name.is_empty() {
        return Err(ValidationError::EmptyPackName);
    }
    if pack.plant_ids.len() > MAX_PLANTS_PER_PACK {
        return Err(ValidationError::TooManyPlants(pack.plant_ids.len()));
    }
    if let Some(id) = pack.plant_ids.iter().find(|id| **id == PLANT_ID_INVALID) {
        return Err(ValidationError::ReservedMemberId(*id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use plantdb_core::types::CropCoefficients;

    fn custom(plant_id: u16) -> PlantRecord {
        PlantRecord {
            plant_id,
            pack_id: 5,
            common_name: "Chili".to_string(),
            kc: CropCoefficients {
                ini: 0.6,
                dev: 0.8,
                mid: 1.05,
                end: 0.9,
            },
            root_depth_min_m: 0.25,
            root_depth_max_m: 1.0,
            ..PlantRecord::default()
        }
    }

    #[test]
    fn accepts_reasonable_plants() {
        assert_eq!(validate_plant(&custom(1000), 200), Ok(()));

        let builtin = PlantRecord {
            pack_id: PACK_ID_BUILTIN,
            ..custom(200)
        };
        assert_eq!(validate_plant(&builtin, 200), Ok(()));

        let edge = PlantRecord {
            kc: CropCoefficients {
                ini: 2.0,
                dev: 2.0,
                mid: 2.0,
                end: 2.0,
            },
            root_depth_min_m: 5.0,
            root_depth_max_m: 5.0,
            ..custom(7)
        };
        assert_eq!(validate_plant(&edge, 200), Ok(()));
    }

    #[test]
    fn rejects_each_rule() {
        assert_eq!(
            validate_plant(&custom(PLANT_ID_INVALID), 200),
            Err(ValidationError::ReservedPlantId(PLANT_ID_INVALID))
        );

        assert_eq!(
            validate_plant(&custom(0), 200),
            Err(ValidationError::ReservedPlantId(0))
        );

        let claims_builtin = PlantRecord {
            pack_id: PACK_ID_BUILTIN,
            ..custom(201)
        };
        assert_eq!(
            validate_plant(&claims_builtin, 200),
            Err(ValidationError::OutsideBuiltinRange {
                plant_id: 201,
                builtin_count: 200
            })
        );

        let unnamed = PlantRecord {
            common_name: String::new(),
            ..custom(1)
        };
        assert_eq!(
            validate_plant(&unnamed, 200),
            Err(ValidationError::EmptyCommonName)
        );

        let thirsty = PlantRecord {
            kc: CropCoefficients {
                end: 2.5,
                ..custom(1).kc
            },
            ..custom(1)
        };
        assert!(matches!(
            validate_plant(&thirsty, 200),
            Err(ValidationError::KcTooHigh { stage: "end", .. })
        ));

        let inverted = PlantRecord {
            root_depth_min_m: 1.2,
            ..custom(1)
        };
        assert!(matches!(
            validate_plant(&inverted, 200),
            Err(ValidationError::RootDepthInverted { .. })
        ));

        let deep = PlantRecord {
            root_depth_max_m: 5.5,
            ..custom(1)
        };
        assert!(matches!(
            validate_plant(&deep, 200),
            Err(ValidationError::RootDepthTooDeep(_))
        ));
    }

    #[test]
    fn pack_rules() {
        let pack = PackRecord {
            pack_id: 3,
            version: 1,
            name: "Balcony".to_string(),
            plant_ids: vec![400, 401],
        };
        assert_eq!(validate_pack(&pack), Ok(()));

        for pack_id in [PACK_ID_BUILTIN, PACK_ID_INVALID] {
            let reserved = PackRecord {
                pack_id,
                ..pack.clone()
            };
            assert_eq!(
                validate_pack(&reserved),
                Err(ValidationError::ReservedPackId(pack_id))
            );
        }

        let unnamed = PackRecord {
            name: String::new(),
            ..pack.clone()
        };
        assert_eq!(validate_pack(&unnamed), Err(ValidationError::EmptyPackName));

        let bad_member = PackRecord {
            plant_ids: vec![400, PLANT_ID_INVALID],
            ..pack
        };
        assert_eq!(
            validate_pack(&bad_member),
            Err(ValidationError::ReservedMemberId(PLANT_ID_INVALID))
        );
    }
}
