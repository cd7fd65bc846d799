use anyhow::Context;
use plantdb_core::types::{PackSummary, PlantSummary};
use plantdb_format::bytes::read_u32;
use plantdb_format::{RecordKind, StoreLayout};
use plantdb_store::{BuiltinCatalog, PackStore, StoreOptions};
use serde::Serialize;

/// An opened store plus the options and catalog it was opened with.
pub(crate) struct StoreContext {
    pub(crate) store: PackStore,
    pub(crate) options: StoreOptions,
    pub(crate) catalog: BuiltinCatalog,
}

pub(crate) fn open_store(root: &str) -> anyhow::Result<StoreContext> {
    let layout = StoreLayout::new(root);
    let options = StoreOptions::load(&layout).context("load store options")?;
    let catalog = options.catalog().context("load built-in catalog")?;
    let store = PackStore::open_dir(root, catalog.len())
        .with_context(|| format!("open store at {root}"))?;
    Ok(StoreContext {
        store,
        options,
        catalog,
    })
}

/// Record kind named by the magic number at the start of `bytes`.
pub(crate) fn detect_kind(bytes: &[u8]) -> Option<RecordKind> {
    let magic = read_u32(bytes, 0).ok()?;
    [RecordKind::Plant, RecordKind::Pack, RecordKind::Manifest]
        .into_iter()
        .find(|kind| kind.magic() == magic)
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn print_plant_table(plants: &[PlantSummary]) {
    if plants.is_empty() {
        println!("No plants.");
        return;
    }
    let name_w = plants
        .iter()
        .map(|p| p.name.len())
        .max()
        .unwrap_or(0)
        .max("Name".len());
    println!("{:>5}  {:>5}  {:>7}  {:<name_w$}", "Id", "Pack", "Version", "Name");
    println!("{:->5}  {:->5}  {:->7}  {:-<name_w$}", "", "", "", "");
    for p in plants {
        println!(
            "{:>5}  {:>5}  {:>7}  {:<name_w$}",
            p.plant_id, p.pack_id, p.version, p.name
        );
    }
}

pub(crate) fn print_pack_table(packs: &[PackSummary]) {
    let name_w = packs
        .iter()
        .map(|p| p.name.len())
        .max()
        .unwrap_or(0)
        .max("Name".len());
    println!("{:>5}  {:>7}  {:>6}  {:<name_w$}", "Id", "Version", "Plants", "Name");
    println!("{:->5}  {:->7}  {:->6}  {:-<name_w$}", "", "", "", "");
    for p in packs {
        println!(
            "{:>5}  {:>7}  {:>6}  {:<name_w$}",
            p.pack_id, p.version, p.plant_count, p.name
        );
    }
}
