//! FAO-56 crop coefficient and root depth curves over a growing season.

use plantdb_core::types::{PlantRecord, StageDays};

/// Coefficient used when no plant record is available.
pub const DEFAULT_KC: f32 = 1.0;
/// Root depth used when no plant record is available.
pub const DEFAULT_ROOT_DEPTH_MM: f32 = 300.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthStage {
    Initial,
    Development,
    MidSeason,
    LateSeason,
    /// Past the end of the last stage.
    Finished,
}

/// Stage active `day` days after planting, with the day offset inside it.
pub fn growth_stage(stages: StageDays, day: u16) -> (GrowthStage, u32) {
    let day = u32::from(day);
    let ini_end = u32::from(stages.ini);
    let dev_end = ini_end + u32::from(stages.dev);
    let mid_end = dev_end + u32::from(stages.mid);
    let late_end = mid_end + u32::from(stages.end);

    if day < ini_end {
        (GrowthStage::Initial, day)
    } else if day < dev_end {
        (GrowthStage::Development, day - ini_end)
    } else if day < mid_end {
        (GrowthStage::MidSeason, day - dev_end)
    } else if day < late_end {
        (GrowthStage::LateSeason, day - mid_end)
    } else {
        (GrowthStage::Finished, day - late_end)
    }
}

/// Kc for `day` days after planting.
///
/// Initial stage holds `kc.ini`; development ramps `kc.dev` to `kc.mid`;
/// mid-season holds `kc.mid`; late season ramps `kc.mid` to `kc.end`; after
/// the season `kc.end` holds.
pub fn crop_coefficient(plant: &PlantRecord, day: u16) -> f32 {
    let kc = plant.kc;
    let stages = plant.stage_days;
    match growth_stage(stages, day) {
        (GrowthStage::Initial, _) => kc.ini,
        (GrowthStage::Development, d) => interpolate(kc.dev, kc.mid, d, u32::from(stages.dev)),
        (GrowthStage::MidSeason, _) => kc.mid,
        (GrowthStage::LateSeason, d) => interpolate(kc.mid, kc.end, d, u32::from(stages.end)),
        (GrowthStage::Finished, _) => kc.end,
    }
}

/// Root depth in millimetres: one linear ramp from min to max over the
/// whole season, then max.
#[allow(clippy::cast_precision_loss)]
pub fn root_depth_mm(plant: &PlantRecord, day: u16) -> f32 {
    let min_mm = plant.root_depth_min_m * 1000.0;
    let max_mm = plant.root_depth_max_m * 1000.0;
    let season = plant.stage_days.total();
    if season == 0 || u32::from(day) >= season {
        return max_mm;
    }
    let t = f32::from(day) / season as f32;
    min_mm + t * (max_mm - min_mm)
}

#[allow(clippy::cast_precision_loss)]
fn interpolate(start: f32, end: f32, day_in_stage: u32, stage_len: u32) -> f32 {
    if stage_len == 0 {
        return end;
    }
    let t = (day_in_stage as f32 / stage_len as f32).min(1.0);
    start + (end - start) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use plantdb_core::types::CropCoefficients;

    fn reference_plant() -> PlantRecord {
        PlantRecord {
            plant_id: 1,
            common_name: "Reference".to_string(),
            kc: CropCoefficients {
                ini: 0.3,
                dev: 0.3,
                mid: 1.1,
                end: 0.6,
            },
            root_depth_min_m: 0.2,
            root_depth_max_m: 1.0,
            stage_days: StageDays {
                ini: 10,
                dev: 20,
                mid: 30,
                end: 10,
            },
            ..PlantRecord::default()
        }
    }

    #[test]
    fn coefficient_spot_values() {
        let plant = reference_plant();
        assert_eq!(crop_coefficient(&plant, 5), 0.3);
        assert_eq!(crop_coefficient(&plant, 40), 1.1);
        assert!((crop_coefficient(&plant, 65) - 0.85).abs() < 1e-6);
        assert_eq!(crop_coefficient(&plant, 1000), 0.6);
    }

    #[test]
    fn development_ramps_towards_mid() {
        let plant = reference_plant();
        assert_eq!(crop_coefficient(&plant, 10), 0.3);
        assert!((crop_coefficient(&plant, 20) - 0.7).abs() < 1e-6);
        assert_eq!(crop_coefficient(&plant, 30), 1.1);
    }

    #[test]
    fn zero_length_stages_are_skipped() {
        let plant = PlantRecord {
            stage_days: StageDays {
                ini: 0,
                dev: 0,
                mid: 5,
                end: 0,
            },
            ..reference_plant()
        };
        assert_eq!(crop_coefficient(&plant, 0), 1.1);
        assert_eq!(crop_coefficient(&plant, 5), 0.6);
        assert_eq!(
            growth_stage(plant.stage_days, 7),
            (GrowthStage::Finished, 2)
        );
    }

    #[test]
    fn root_depth_ramps_over_the_whole_season() {
        let plant = reference_plant();
        assert!((root_depth_mm(&plant, 0) - 200.0).abs() < 1e-3);
        assert!((root_depth_mm(&plant, 35) - 600.0).abs() < 1e-3);
        assert!((root_depth_mm(&plant, 70) - 1000.0).abs() < 1e-3);
        assert!((root_depth_mm(&plant, 500) - 1000.0).abs() < 1e-3);

        let no_season = PlantRecord {
            stage_days: StageDays::default(),
            ..reference_plant()
        };
        assert!((root_depth_mm(&no_season, 0) - 1000.0).abs() < 1e-3);
    }
}
