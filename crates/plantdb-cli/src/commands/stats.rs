use crate::util::{open_store, print_json};

pub(crate) fn cmd_stats(root: &str, json: bool) -> anyhow::Result<()> {
    let ctx = open_store(root)?;
    let stats = ctx.store.stats();
    if json {
        return print_json(&stats);
    }
    println!("status:         {:?}", stats.status);
    println!(
        "bytes:          {} used / {} free / {} total",
        stats.used_bytes, stats.free_bytes, stats.total_bytes
    );
    println!(
        "plants:         {} ({} custom, {} built-in ids)",
        stats.plant_count, stats.custom_plant_count, stats.builtin_count
    );
    println!("packs:          {} (+ built-in)", stats.pack_count);
    println!("change counter: {}", stats.change_counter);
    Ok(())
}
