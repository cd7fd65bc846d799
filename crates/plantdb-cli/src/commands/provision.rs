use plantdb_store::{defaults_provisioned, provision_builtin, ProvisionOptions};

use crate::util::{open_store, print_json};

pub(crate) fn cmd_provision(root: &str, json: bool) -> anyhow::Result<()> {
    let ctx = open_store(root)?;
    let already = defaults_provisioned(&ctx.store, &ctx.catalog);
    let report = provision_builtin(
        &ctx.store,
        &ctx.catalog,
        &ProvisionOptions::from(&ctx.options),
    )?;
    if json {
        print_json(&report)?;
    } else {
        if already && report.provisioned == 0 {
            println!("Built-in species already provisioned.");
        }
        println!(
            "provisioned={} skipped={} failed={}",
            report.provisioned, report.skipped, report.failed
        );
    }
    if report.failed > 0 {
        anyhow::bail!("{} built-in species could not be provisioned", report.failed);
    }
    Ok(())
}
