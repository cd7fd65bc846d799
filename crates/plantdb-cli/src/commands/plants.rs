use anyhow::Context;
use plantdb_core::types::PlantRecord;
use plantdb_store::{ListQuery, PlantFilter};

use crate::types::{DeleteJson, InstallJson};
use crate::util::{open_store, print_json, print_plant_table};

pub(crate) fn cmd_install(root: &str, path: &str, json: bool) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(path).with_context(|| format!("read {path}"))?;
    let plant: PlantRecord =
        serde_json::from_str(&text).with_context(|| format!("parse plant JSON in {path}"))?;
    let ctx = open_store(root)?;
    let outcome = ctx
        .store
        .install_plant(&plant)
        .with_context(|| format!("install plant {}", plant.plant_id))?;
    if json {
        return print_json(&InstallJson {
            plant_id: plant.plant_id,
            version: plant.version,
            outcome,
            code: outcome.code().as_u8(),
        });
    }
    println!(
        "plant {} v{}: {outcome:?}",
        plant.plant_id, plant.version
    );
    Ok(())
}

pub(crate) fn cmd_get(root: &str, id: u16, json: bool) -> anyhow::Result<()> {
    let ctx = open_store(root)?;
    let plant = ctx
        .store
        .get_plant(id)
        .with_context(|| format!("read plant {id}"))?;
    if json {
        return print_json(&plant);
    }
    println!("Plant {} (pack {}, v{})", plant.plant_id, plant.pack_id, plant.version);
    println!("  common name:     {}", plant.common_name);
    println!("  scientific name: {}", plant.scientific_name);
    println!(
        "  kc:              ini {:.2}  dev {:.2}  mid {:.2}  end {:.2}",
        plant.kc.ini, plant.kc.dev, plant.kc.mid, plant.kc.end
    );
    println!(
        "  stage days:      ini {}  dev {}  mid {}  end {}",
        plant.stage_days.ini, plant.stage_days.dev, plant.stage_days.mid, plant.stage_days.end
    );
    println!(
        "  root depth:      {:.2} - {:.2} m",
        plant.root_depth_min_m, plant.root_depth_max_m
    );
    println!("  depletion:       {:.2}", plant.depletion_fraction);
    Ok(())
}

pub(crate) fn cmd_delete(root: &str, id: u16, json: bool) -> anyhow::Result<()> {
    let ctx = open_store(root)?;
    let result = ctx.store.delete_plant(id);
    if json {
        let (code, error) = match &result {
            Ok(()) => (0, None),
            Err(e) => (e.code().as_u8(), Some(e.to_string())),
        };
        print_json(&DeleteJson {
            plant_id: id,
            deleted: result.is_ok(),
            code,
            error,
        })?;
    }
    result.with_context(|| format!("delete plant {id}"))?;
    if !json {
        println!("Deleted plant {id}");
    }
    Ok(())
}

pub(crate) fn cmd_list(
    root: &str,
    offset: usize,
    limit: Option<usize>,
    pack: Option<u16>,
    custom: bool,
    json: bool,
) -> anyhow::Result<()> {
    let ctx = open_store(root)?;
    let filter = match (pack, custom) {
        (Some(pack_id), _) => PlantFilter::Pack(pack_id),
        (None, true) => PlantFilter::Custom,
        (None, false) => PlantFilter::All,
    };
    let max = limit.unwrap_or(usize::from(ctx.options.max_page));
    let plants = ctx
        .store
        .list_plants(&ListQuery::new(offset, max).with_filter(filter))
        .context("list plants")?;
    if json {
        return print_json(&plants);
    }
    print_plant_table(&plants);
    Ok(())
}
