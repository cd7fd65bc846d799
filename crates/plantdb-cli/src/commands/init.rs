use anyhow::Context;
use plantdb_format::StoreLayout;
use plantdb_store::options::{ListPatch, ProvisionPatch};
use plantdb_store::{provision_builtin, OptionsRecord, ProvisionOptions, StoreOptions};
use serde::Serialize;

use crate::util::{open_store, print_json};

pub(crate) fn cmd_init(root: &str, write_options: bool, json: bool) -> anyhow::Result<()> {
    let layout = StoreLayout::new(root);
    let wrote_options = write_options && !layout.options_path().exists();
    if wrote_options {
        std::fs::create_dir_all(layout.root())
            .with_context(|| format!("create {}", layout.root().display()))?;
        let defaults = StoreOptions::default();
        let record = OptionsRecord {
            provision: Some(ProvisionPatch {
                yield_every: Some(defaults.yield_every),
            }),
            list: Some(ListPatch {
                max_page: Some(defaults.max_page),
            }),
            catalog_path: None,
        };
        StoreOptions::save(&layout, &record).context("write options.json")?;
    }

    let ctx = open_store(root)?;
    let report = provision_builtin(
        &ctx.store,
        &ctx.catalog,
        &ProvisionOptions::from(&ctx.options),
    )?;

    if json {
        #[derive(Serialize)]
        struct Out<'a> {
            root: &'a str,
            options_written: bool,
            builtin_count: u16,
            provisioned: u16,
            skipped: u16,
            failed: u16,
        }
        return print_json(&Out {
            root,
            options_written: wrote_options,
            builtin_count: ctx.catalog.len(),
            provisioned: report.provisioned,
            skipped: report.skipped,
            failed: report.failed,
        });
    }

    println!("Initialized store at {root}");
    if wrote_options {
        println!("Wrote {}", layout.options_path().display());
    }
    println!(
        "Built-in species: {} provisioned, {} already present, {} failed",
        report.provisioned, report.skipped, report.failed
    );
    if report.failed > 0 {
        anyhow::bail!("{} built-in species could not be provisioned", report.failed);
    }
    Ok(())
}
