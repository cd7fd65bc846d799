use anyhow::Context;

use crate::types::PackInput;
use crate::util::{open_store, print_json, print_pack_table};

pub(crate) fn cmd_install_pack(root: &str, path: &str, json: bool) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(path).with_context(|| format!("read {path}"))?;
    let input: PackInput =
        serde_json::from_str(&text).with_context(|| format!("parse pack JSON in {path}"))?;
    let ctx = open_store(root)?;
    let report = ctx
        .store
        .install_pack(&input.pack, &input.plants)
        .with_context(|| format!("install pack {}", input.pack.pack_id))?;
    if json {
        return print_json(&report);
    }
    println!(
        "pack {} v{}: {:?}; plants installed={} updated={} already_current={}",
        input.pack.pack_id,
        input.pack.version,
        report.pack,
        report.installed,
        report.updated,
        report.already_current
    );
    Ok(())
}

pub(crate) fn cmd_packs(
    root: &str,
    offset: usize,
    limit: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let ctx = open_store(root)?;
    let max = limit.unwrap_or(usize::from(ctx.options.max_page));
    let packs = ctx.store.list_packs(offset, max).context("list packs")?;
    if json {
        return print_json(&packs);
    }
    print_pack_table(&packs);
    Ok(())
}

pub(crate) fn cmd_pack(root: &str, id: u16, json: bool) -> anyhow::Result<()> {
    let ctx = open_store(root)?;
    let pack = ctx
        .store
        .get_pack(id)
        .with_context(|| format!("read pack {id}"))?;
    if json {
        return print_json(&pack);
    }
    println!("Pack {} \"{}\" v{}", pack.pack_id, pack.name, pack.version);
    println!("  plants ({}):", pack.plant_ids.len());
    for chunk in pack.plant_ids.chunks(12) {
        let ids: Vec<String> = chunk.iter().map(u16::to_string).collect();
        println!("    {}", ids.join(" "));
    }
    Ok(())
}

pub(crate) fn cmd_delete_pack(
    root: &str,
    id: u16,
    with_plants: bool,
    json: bool,
) -> anyhow::Result<()> {
    let ctx = open_store(root)?;
    let report = ctx
        .store
        .delete_pack(id, with_plants)
        .with_context(|| format!("delete pack {id}"))?;
    if json {
        return print_json(&report);
    }
    println!(
        "pack {id}: record {}, {} plants removed",
        if report.pack_removed { "removed" } else { "absent" },
        report.plants_removed
    );
    Ok(())
}
