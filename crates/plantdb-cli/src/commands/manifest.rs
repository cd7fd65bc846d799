use anyhow::Context;

use crate::types::ManifestWriteJson;
use crate::util::{open_store, print_json};

pub(crate) fn cmd_manifest(root: &str, write: bool, json: bool) -> anyhow::Result<()> {
    let ctx = open_store(root)?;
    if write {
        let entries = ctx.store.write_manifest().context("write manifest")?;
        if json {
            return print_json(&ManifestWriteJson { entries });
        }
        println!("Wrote manifest with {entries} entries");
        return Ok(());
    }

    let report = ctx.store.check_manifest().context("check manifest")?;
    if json {
        print_json(&report)?;
    } else if report.is_consistent() {
        println!("Manifest matches the stored records.");
    } else {
        for entry in &report.missing {
            println!("missing:  {:?} {} v{}", entry.kind, entry.id, entry.version);
        }
        for stale in &report.stale {
            println!(
                "stale:    {:?} {} listed v{} stored v{}",
                stale.listed.kind, stale.listed.id, stale.listed.version, stale.stored_version
            );
        }
        for entry in &report.unlisted {
            println!("unlisted: {:?} {} v{}", entry.kind, entry.id, entry.version);
        }
    }
    if report.is_consistent() {
        Ok(())
    } else {
        anyhow::bail!("manifest drift detected")
    }
}
